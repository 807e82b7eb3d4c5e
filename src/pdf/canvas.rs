//! Paginated drawing surface. Drawing calls append operations to the
//! current page's display list; nothing is serialised until [`Canvas::save`]
//! or [`Canvas::render`], so layout code can be inspected page by page in
//! tests without parsing PDF output.
//!
//! All coordinates are millimetres from the top-left corner of the page.

use super::fonts::{encode_winansi, size_mm, text_width_mm, Font, MM_TO_PT};
use super::images::{ImageError, ImageId, ImageInfo, ImageRegistry};
use super::text_layout::{wrap_text, CELL_PADDING};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Share of the page width taken by the footer banner.
const FOOTER_WIDTH_RATIO: f32 = 0.225;
/// Nominal footer height used to place it above the bottom margin.
const FOOTER_VISUAL_HEIGHT: f32 = 10.0;
const FOOTER_LIFT: f32 = 2.0;
const LINE_WIDTH: f32 = 0.2;

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("{role} image not found: {path}")]
    AssetNotFound { role: &'static str, path: PathBuf },
    #[error("{role} image could not be loaded: {source}")]
    Asset {
        role: &'static str,
        #[source]
        source: ImageError,
    },
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("failed to write PDF to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Page size, margins and the bands reserved for the banners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub header_band: f32,
    pub footer_band: f32,
}

impl PageGeometry {
    /// Oficio (216 x 340 mm) in landscape.
    pub const fn oficio_landscape() -> Self {
        Self {
            width: 340.0,
            height: 216.0,
            margin_left: 14.0,
            margin_right: 14.0,
            margin_top: 2.0,
            margin_bottom: 2.0,
            header_band: 18.0,
            footer_band: 16.0,
        }
    }

    pub fn usable_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn right_edge(&self) -> f32 {
        self.width - self.margin_right
    }

    /// First writable y on every page.
    pub fn content_top(&self) -> f32 {
        self.margin_top + self.header_band
    }

    /// Crossing this y triggers an automatic page break.
    pub fn content_bottom(&self) -> f32 {
        self.height - self.margin_bottom - self.footer_band
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    pub const fn gray(level: u8) -> Rgb {
        Rgb(level, level, level)
    }

    fn components(self) -> (f32, f32, f32) {
        (
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: Font,
    pub size: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub x: f32,
    pub y: f32,
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        baseline: f32,
        text: String,
        style: TextStyle,
        word_spacing: f32,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: Rgb,
    },
    Image {
        image: ImageId,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    ops: Vec<DrawOp>,
    closed: bool,
}

impl Page {
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn image_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Image { .. }))
            .count()
    }

    fn image_ids(&self) -> BTreeSet<usize> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Image { image, .. } => Some(image.0),
                _ => None,
            })
            .collect()
    }
}

/// Options for a single-line [`Canvas::cell`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellOptions {
    pub border: bool,
    pub fill: bool,
    pub align: Align,
    /// Move to the start of the next line instead of to the cell's right.
    pub line_break: bool,
}

impl Default for CellOptions {
    fn default() -> Self {
        Self {
            border: false,
            fill: false,
            align: Align::Left,
            line_break: false,
        }
    }
}

/// Box for [`Canvas::text_block`]; lines that would pass `max_height` are
/// not drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextFrame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub line_height: f32,
    pub max_height: f32,
    pub align: Align,
}

#[derive(Debug, Clone)]
pub struct BrandingAssets {
    pub header: PathBuf,
    pub footer: PathBuf,
}

#[derive(Debug, Clone, Copy)]
struct Banner {
    image: ImageId,
    info: ImageInfo,
}

#[derive(Debug)]
pub struct Canvas {
    geometry: PageGeometry,
    pages: Vec<Page>,
    cursor: Cursor,
    style: TextStyle,
    fill_color: Rgb,
    draw_color: Rgb,
    images: ImageRegistry,
    header: Banner,
    footer: Banner,
}

impl Canvas {
    /// Validates and embeds both banners, then opens the first page. Missing
    /// banners fail before any page exists.
    pub fn begin_document(
        geometry: PageGeometry,
        assets: &BrandingAssets,
        max_image_edge: u32,
    ) -> Result<Self, CanvasError> {
        for (role, path) in [("header", &assets.header), ("footer", &assets.footer)] {
            if !path.is_file() {
                return Err(CanvasError::AssetNotFound {
                    role,
                    path: path.clone(),
                });
            }
        }

        let mut images = ImageRegistry::new(max_image_edge);
        let header = register_banner(&mut images, "header", &assets.header)?;
        let footer = register_banner(&mut images, "footer", &assets.footer)?;

        let mut canvas = Self {
            geometry,
            pages: Vec::new(),
            cursor: Cursor {
                x: geometry.margin_left,
                y: geometry.content_top(),
                page: 0,
            },
            style: TextStyle {
                font: Font::Regular,
                size: 10.0,
                color: Rgb::BLACK,
            },
            fill_color: Rgb::WHITE,
            draw_color: Rgb::BLACK,
            images,
            header,
            footer,
        };
        canvas.add_page();
        Ok(canvas)
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn embedded_image_count(&self) -> usize {
        self.images.len()
    }

    /// Closes the current page with its footer and starts the next one.
    pub fn add_page(&mut self) {
        self.close_page();
        self.pages.push(Page::default());
        self.cursor.page = self.pages.len() - 1;
        self.header();
    }

    fn header(&mut self) {
        let geometry = self.geometry;
        let width = geometry.usable_width();
        let height = width / self.header.info.aspect_ratio();
        self.push(DrawOp::Image {
            image: self.header.image,
            x: geometry.margin_left,
            y: geometry.margin_top,
            width,
            height,
        });
        self.set_y(geometry.content_top());
    }

    fn footer(&mut self) {
        let geometry = self.geometry;
        let width = geometry.width * FOOTER_WIDTH_RATIO;
        let height = width / self.footer.info.aspect_ratio();
        self.push(DrawOp::Image {
            image: self.footer.image,
            x: (geometry.width - width) / 2.0,
            y: geometry.height - geometry.margin_bottom - FOOTER_VISUAL_HEIGHT - FOOTER_LIFT,
            width,
            height,
        });
    }

    fn close_page(&mut self) {
        let needs_footer = self.pages.last().is_some_and(|page| !page.closed);
        if needs_footer {
            self.footer();
            if let Some(page) = self.pages.last_mut() {
                page.closed = true;
            }
        }
    }

    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    pub fn set_font(&mut self, font: Font, size: f32) {
        self.style.font = font;
        self.style.size = size;
    }

    pub fn style(&self) -> TextStyle {
        self.style
    }

    pub fn set_text_color(&mut self, color: Rgb) {
        self.style.color = color;
    }

    pub fn set_fill_color(&mut self, color: Rgb) {
        self.fill_color = color;
    }

    pub fn set_draw_color(&mut self, color: Rgb) {
        self.draw_color = color;
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_xy(&mut self, x: f32, y: f32) {
        self.cursor.x = x;
        self.cursor.y = y;
    }

    /// Moves vertically and returns to the left margin.
    pub fn set_y(&mut self, y: f32) {
        self.cursor.x = self.geometry.margin_left;
        self.cursor.y = y;
    }

    pub fn ln(&mut self, height: f32) {
        self.set_y(self.cursor.y + height);
    }

    /// Space left above the bottom band on the current page.
    pub fn remaining_height(&self) -> f32 {
        self.geometry.content_bottom() - self.cursor.y
    }

    fn overflows(&self, height: f32) -> bool {
        let at_top = self.cursor.y <= self.geometry.content_top();
        !at_top && self.cursor.y + height > self.geometry.content_bottom()
    }

    pub fn text_width(&self, text: &str) -> f32 {
        text_width_mm(text, self.style.font, self.style.size)
    }

    /// Single-line cell at the cursor. `width == 0.0` stretches to the
    /// right margin.
    pub fn cell(&mut self, width: f32, height: f32, text: &str, options: CellOptions) {
        if self.overflows(height) {
            let x = self.cursor.x;
            self.add_page();
            self.cursor.x = x;
        }

        let Cursor { x, y, .. } = self.cursor;
        let width = if width <= 0.0 {
            self.geometry.right_edge() - x
        } else {
            width
        };

        if options.fill || options.border {
            self.push(DrawOp::Rect {
                x,
                y,
                width,
                height,
                fill: options.fill.then_some(self.fill_color),
                stroke: options.border.then_some(self.draw_color),
            });
        }
        if !text.is_empty() {
            let align = match options.align {
                Align::Justify => Align::Left,
                other => other,
            };
            self.place_text(x, y, width, height, text, align, 0.0);
        }

        if options.line_break {
            self.set_y(y + height);
        } else {
            self.cursor.x = x + width;
        }
    }

    /// Wrapped text flowing from the cursor, breaking pages line by line.
    /// Returns the total height consumed; the cursor ends at the left margin
    /// below the text.
    pub fn write_text(&mut self, width: f32, line_height: f32, text: &str, align: Align) -> f32 {
        let x = self.cursor.x;
        let width = if width <= 0.0 {
            self.geometry.right_edge() - x
        } else {
            width
        };

        let mut consumed = 0.0;
        for line in wrap_text(text, self.style.font, self.style.size, width) {
            if self.overflows(line_height) {
                self.add_page();
            }
            let y = self.cursor.y;
            let spacing = self.justify_spacing(&line.text, width, align, line.paragraph_end);
            self.place_text(x, y, width, line_height, &line.text, align, spacing);
            self.set_xy(x, y + line_height);
            consumed += line_height;
        }

        self.set_y(self.cursor.y);
        consumed
    }

    /// Wrapped text inside a fixed frame. Neither the cursor nor the page
    /// changes; returns the height actually drawn.
    pub fn text_block(&mut self, frame: TextFrame, text: &str) -> f32 {
        let mut drawn = 0.0;
        for line in wrap_text(text, self.style.font, self.style.size, frame.width) {
            if drawn + frame.line_height > frame.max_height + f32::EPSILON {
                break;
            }
            let spacing = self.justify_spacing(&line.text, frame.width, frame.align, line.paragraph_end);
            self.place_text(
                frame.x,
                frame.y + drawn,
                frame.width,
                frame.line_height,
                &line.text,
                frame.align,
                spacing,
            );
            drawn += frame.line_height;
        }
        drawn
    }

    fn justify_spacing(&self, line: &str, width: f32, align: Align, paragraph_end: bool) -> f32 {
        if align != Align::Justify || paragraph_end {
            return 0.0;
        }
        let gaps = line.matches(' ').count();
        if gaps == 0 {
            return 0.0;
        }
        let slack = width - 2.0 * CELL_PADDING - self.text_width(line);
        (slack / gaps as f32).max(0.0)
    }

    #[allow(clippy::too_many_arguments)]
    fn place_text(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        text: &str,
        align: Align,
        word_spacing: f32,
    ) {
        if text.is_empty() {
            return;
        }
        let text_width = self.text_width(text);
        let left = match align {
            Align::Left | Align::Justify => x + CELL_PADDING,
            Align::Center => x + (width - text_width) / 2.0,
            Align::Right => x + width - CELL_PADDING - text_width,
        };
        let baseline = y + 0.5 * height + 0.3 * size_mm(self.style.size);
        self.push(DrawOp::Text {
            x: left,
            baseline,
            text: text.to_string(),
            style: self.style,
            word_spacing,
        });
    }

    /// Stroked outline in the draw colour.
    pub fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            fill: None,
            stroke: Some(self.draw_color),
        });
    }

    /// Filled and outlined rectangle.
    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            fill: Some(self.fill_color),
            stroke: Some(self.draw_color),
        });
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.push(DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            color: self.draw_color,
        });
    }

    /// Decodes and embeds `path` without drawing it, so unreadable files can
    /// be dropped before room is reserved for them.
    pub fn register_image(&mut self, path: &Path) -> Result<ImageInfo, CanvasError> {
        let (_, info) = self.images.register_with_info(path)?;
        Ok(info)
    }

    pub fn draw_image(
        &mut self,
        path: &Path,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), CanvasError> {
        let image = self.images.register(path)?;
        self.push(DrawOp::Image {
            image,
            x,
            y,
            width,
            height,
        });
        Ok(())
    }

    pub fn save(&mut self, path: &Path) -> Result<(), CanvasError> {
        let bytes = self.render();
        std::fs::write(path, bytes).map_err(|source| CanvasError::Save {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), pages = self.pages.len(), "PDF written");
        Ok(())
    }

    /// Closes the last page and serialises the whole document.
    pub fn render(&mut self) -> Vec<u8> {
        self.close_page();
        PdfSerializer::new(self.geometry).write(&self.pages, &self.images)
    }
}

fn register_banner(
    images: &mut ImageRegistry,
    role: &'static str,
    path: &Path,
) -> Result<Banner, CanvasError> {
    let (image, info) = images
        .register_with_info(path)
        .map_err(|source| CanvasError::Asset { role, source })?;
    Ok(Banner { image, info })
}

struct RefAllocator(i32);

impl RefAllocator {
    fn next(&mut self) -> Ref {
        let id = Ref::new(self.0);
        self.0 += 1;
        id
    }
}

struct PdfSerializer {
    geometry: PageGeometry,
    refs: RefAllocator,
}

impl PdfSerializer {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            refs: RefAllocator(1),
        }
    }

    fn write(mut self, pages: &[Page], images: &ImageRegistry) -> Vec<u8> {
        let mut pdf = Pdf::new();
        let catalog_id = self.refs.next();
        let page_tree_id = self.refs.next();
        pdf.catalog(catalog_id).pages(page_tree_id);

        let font_refs: Vec<(Font, Ref)> = Font::ordered()
            .into_iter()
            .map(|font| (font, self.refs.next()))
            .collect();
        for (font, font_ref) in &font_refs {
            pdf.type1_font(*font_ref)
                .base_font(font.base_font())
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }

        let mut image_refs = Vec::with_capacity(images.len());
        for (_, image) in images.iter() {
            let image_ref = self.refs.next();
            let mut xobject = pdf.image_xobject(image_ref, &image.jpeg);
            xobject.filter(Filter::DctDecode);
            xobject.width(image.width as i32);
            xobject.height(image.height as i32);
            xobject.color_space().device_rgb();
            xobject.bits_per_component(8);
            xobject.finish();
            image_refs.push(image_ref);
        }

        let mut page_refs = Vec::with_capacity(pages.len());
        for page in pages {
            let page_id = self.refs.next();
            let content_id = self.refs.next();
            page_refs.push(page_id);

            let used_images = page.image_ids();
            let image_names: Vec<(String, Ref)> = used_images
                .iter()
                .filter_map(|index| {
                    image_refs
                        .get(*index)
                        .map(|image_ref| (image_name(*index), *image_ref))
                })
                .collect();

            let mut pdf_page = pdf.page(page_id);
            pdf_page.media_box(Rect::new(
                0.0,
                0.0,
                self.geometry.width * MM_TO_PT,
                self.geometry.height * MM_TO_PT,
            ));
            pdf_page.parent(page_tree_id);
            pdf_page.contents(content_id);
            let mut resources = pdf_page.resources();
            {
                let mut fonts = resources.fonts();
                for (font, font_ref) in &font_refs {
                    fonts.pair(font.resource_name(), *font_ref);
                }
            }
            {
                let mut xobjects = resources.x_objects();
                for (name, image_ref) in &image_names {
                    xobjects.pair(Name(name.as_bytes()), *image_ref);
                }
            }
            resources.finish();
            pdf_page.finish();

            let content = self.page_content(page);
            pdf.stream(content_id, &content);
        }

        let page_count = page_refs.len() as i32;
        pdf.pages(page_tree_id).kids(page_refs).count(page_count);
        pdf.finish()
    }

    fn page_content(&self, page: &Page) -> Vec<u8> {
        let mut content = Content::new();
        content.set_line_width(LINE_WIDTH * MM_TO_PT);

        for op in page.ops() {
            match op {
                DrawOp::Text {
                    x,
                    baseline,
                    text,
                    style,
                    word_spacing,
                } => {
                    let (r, g, b) = style.color.components();
                    content.set_fill_rgb(r, g, b);
                    content.begin_text();
                    content.set_font(style.font.resource_name(), style.size);
                    content.set_word_spacing(word_spacing * MM_TO_PT);
                    content.set_text_matrix([1.0, 0.0, 0.0, 1.0, self.x(*x), self.y(*baseline)]);
                    content.show(Str(&encode_winansi(text)));
                    content.end_text();
                }
                DrawOp::Rect {
                    x,
                    y,
                    width,
                    height,
                    fill,
                    stroke,
                } => {
                    if let Some(color) = fill {
                        let (r, g, b) = color.components();
                        content.set_fill_rgb(r, g, b);
                    }
                    if let Some(color) = stroke {
                        let (r, g, b) = color.components();
                        content.set_stroke_rgb(r, g, b);
                    }
                    content.rect(
                        self.x(*x),
                        self.y(*y + *height),
                        *width * MM_TO_PT,
                        *height * MM_TO_PT,
                    );
                    match (fill.is_some(), stroke.is_some()) {
                        (true, true) => content.fill_nonzero_and_stroke(),
                        (true, false) => content.fill_nonzero(),
                        _ => content.stroke(),
                    };
                }
                DrawOp::Line {
                    x1,
                    y1,
                    x2,
                    y2,
                    color,
                } => {
                    let (r, g, b) = color.components();
                    content.set_stroke_rgb(r, g, b);
                    content.move_to(self.x(*x1), self.y(*y1));
                    content.line_to(self.x(*x2), self.y(*y2));
                    content.stroke();
                }
                DrawOp::Image {
                    image,
                    x,
                    y,
                    width,
                    height,
                } => {
                    let name = image_name(image.0);
                    content.save_state();
                    content.transform([
                        *width * MM_TO_PT,
                        0.0,
                        0.0,
                        *height * MM_TO_PT,
                        self.x(*x),
                        self.y(*y + *height),
                    ]);
                    content.x_object(Name(name.as_bytes()));
                    content.restore_state();
                }
            }
        }

        content.finish()
    }

    fn x(&self, x: f32) -> f32 {
        x * MM_TO_PT
    }

    fn y(&self, y: f32) -> f32 {
        (self.geometry.height - y) * MM_TO_PT
    }
}

fn image_name(index: usize) -> String {
    format!("Im{index}")
}
