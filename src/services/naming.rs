//! Deterministic naming of derived (thumbnail) objects.
//!
//! A thumbnail lives at `<source prefix>/preview/<basename>`. Only the
//! basename of the source key is kept, so two sources with the same file
//! name in different sub-directories map to the same thumbnail key. The
//! gallery only lists objects directly under the source prefix, which keeps
//! that collision out of the listing path.

const PREVIEW_DIR: &str = "preview";

/// Maps source keys to thumbnail keys. Pure: no I/O, no error cases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyNamer {
    /// Directory holding derived objects, without a trailing slash.
    preview_dir: String,
}

impl KeyNamer {
    /// `source_prefix` is the gallery's source directory (`images`,
    /// `images/`, or empty for the bucket root).
    pub fn new(source_prefix: &str) -> Self {
        let root = source_prefix.trim_matches('/');
        let preview_dir = if root.is_empty() {
            PREVIEW_DIR.to_string()
        } else {
            format!("{}/{}", root, PREVIEW_DIR)
        };
        Self { preview_dir }
    }

    pub fn preview_dir(&self) -> &str {
        &self.preview_dir
    }

    pub fn thumbnail_key_for(&self, source_key: &str) -> String {
        format!("{}/{}", self.preview_dir, basename(source_key))
    }
}

/// Final path segment of a key. A key ending in `/` has an empty basename.
pub fn basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn places_basename_under_preview_dir() {
        let namer = KeyNamer::new("images");
        assert_eq!(namer.thumbnail_key_for("images/cat.jpg"), "images/preview/cat.jpg");
        assert_eq!(namer.thumbnail_key_for("cat.png"), "images/preview/cat.png");
    }

    #[test]
    fn prefix_slashes_are_normalized() {
        assert_eq!(KeyNamer::new("images/"), KeyNamer::new("/images"));
        assert_eq!(KeyNamer::new("").thumbnail_key_for("a.jpg"), "preview/a.jpg");
        assert_eq!(KeyNamer::new("/").preview_dir(), "preview");
    }

    #[test]
    fn naming_is_deterministic_and_idempotent() {
        let namer = KeyNamer::new("photos");
        for key in ["photos/a.jpg", "photos/2024/b.jpeg", "c.gif", ""] {
            let first = namer.thumbnail_key_for(key);
            assert_eq!(first, namer.thumbnail_key_for(key));
            // Naming a thumbnail key again lands on itself.
            assert_eq!(namer.thumbnail_key_for(&first), first);
        }
    }

    #[test]
    fn same_basename_in_different_folders_collides() {
        let namer = KeyNamer::new("photos");
        assert_eq!(
            namer.thumbnail_key_for("photos/2023/a.jpg"),
            namer.thumbnail_key_for("photos/2024/a.jpg")
        );
    }
}
