use super::table::MAX_PHOTOS_PER_ROW;
use std::path::{Path, PathBuf};

const PHOTO_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Directory tree with one folder of photos per activity identifier.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First photos of `<root>/<activity_id>` by file name. A missing or
    /// unreadable folder yields no photos.
    pub fn photos_for(&self, activity_id: &str) -> Vec<PathBuf> {
        let activity_id = activity_id.trim();
        if activity_id.is_empty() || activity_id.contains(['/', '\\']) || activity_id == ".." {
            return Vec::new();
        }

        let folder = self.root.join(activity_id);
        if !folder.is_dir() {
            return Vec::new();
        }

        let entries = match std::fs::read_dir(&folder) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(path = %folder.display(), error = %err, "cannot list photo folder");
                return Vec::new();
            }
        };

        let mut photos: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_photo(path))
            .collect();
        photos.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        photos.truncate(MAX_PHOTOS_PER_ROW);
        photos
    }
}

fn is_photo(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            PHOTO_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn returns_first_three_images_sorted_by_name() {
        let dir = tempdir().expect("tempdir");
        let folder = dir.path().join("42");
        std::fs::create_dir_all(&folder).expect("folder");
        for name in ["d.jpg", "b.PNG", "a.jpeg", "c.jpg", "notes.txt"] {
            std::fs::write(folder.join(name), b"x").expect("file");
        }
        std::fs::create_dir_all(folder.join("0.jpg")).expect("nested dir");

        let store = PhotoStore::new(dir.path());
        let names: Vec<String> = store
            .photos_for("42")
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.jpeg", "b.PNG", "c.jpg"]);
    }

    #[test]
    fn unknown_or_unsafe_identifiers_have_no_photos() {
        let dir = tempdir().expect("tempdir");
        let store = PhotoStore::new(dir.path());
        assert!(store.photos_for("missing").is_empty());
        assert!(store.photos_for("").is_empty());
        assert!(store.photos_for("../etc").is_empty());
    }
}
