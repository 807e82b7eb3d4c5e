use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{GenericImageView, RgbImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const JPEG_QUALITY: u8 = 85;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to encode image {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    /// Width over height; degenerate images count as square.
    pub fn aspect_ratio(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Baseline JPEG ready for a `DCTDecode` XObject.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

impl EncodedImage {
    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            width: self.width,
            height: self.height,
        }
    }
}

/// Decodes any supported file, flattens transparency onto white, shrinks it
/// so neither edge exceeds `max_edge` pixels and re-encodes it as RGB JPEG.
pub fn prepare_for_embedding(path: &Path, max_edge: u32) -> Result<EncodedImage, ImageError> {
    if !path.is_file() {
        return Err(ImageError::NotFound(path.to_path_buf()));
    }
    let mut decoded = image::open(path).map_err(|source| ImageError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let (width, height) = decoded.dimensions();
    if max_edge > 0 && width.max(height) > max_edge {
        decoded = decoded.resize(max_edge, max_edge, FilterType::Triangle);
    }

    let rgb = flatten_on_white(&decoded);
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|source| ImageError::Encode {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(EncodedImage {
        width: rgb.width(),
        height: rgb.height(),
        jpeg,
    })
}

fn flatten_on_white(image: &image::DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |channel: u8| ((u16::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Handle to an image embedded in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub(crate) usize);

/// Each source file is decoded and embedded once, however many pages or
/// rows draw it.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    max_edge: u32,
    images: Vec<EncodedImage>,
    by_path: HashMap<PathBuf, ImageId>,
}

impl ImageRegistry {
    pub fn new(max_edge: u32) -> Self {
        Self {
            max_edge,
            ..Self::default()
        }
    }

    pub fn register(&mut self, path: &Path) -> Result<ImageId, ImageError> {
        self.register_with_info(path).map(|(id, _)| id)
    }

    /// Decodes `path` on first sight and returns its id with the embedded
    /// pixel size.
    pub fn register_with_info(&mut self, path: &Path) -> Result<(ImageId, ImageInfo), ImageError> {
        if let Some(id) = self.by_path.get(path).copied() {
            if let Some(image) = self.images.get(id.0) {
                return Ok((id, image.info()));
            }
        }
        let encoded = prepare_for_embedding(path, self.max_edge)?;
        let info = encoded.info();
        let id = ImageId(self.images.len());
        self.images.push(encoded);
        self.by_path.insert(path.to_path_buf(), id);
        Ok((id, info))
    }

    pub fn get(&self, id: ImageId) -> Option<&EncodedImage> {
        self.images.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ImageId, &EncodedImage)> {
        self.images
            .iter()
            .enumerate()
            .map(|(index, image)| (ImageId(index), image))
    }
}
