use std::path::PathBuf;

/// A text buffer loaded into memory together with where it came from,
/// how it was decoded, and whether it has diverged from disk.
///
/// Documents are replaced, never mutated: every transforming operation in
/// the session builds a fresh value from the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub content: String,
    /// Canonical lower-case encoding label, e.g. "utf-8", "utf-8-sig",
    /// "windows-1252". Always a decided value.
    pub encoding: String,
    pub modified: bool,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>, encoding: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            encoding: encoding.into(),
            modified: false,
        }
    }

    /// A document can only be persisted once it knows its destination.
    pub fn has_path(&self) -> bool {
        !self.path.as_os_str().is_empty()
    }

    /// True when the stored encoding is UTF-8 in any spelling, BOM or
    /// not, so a UTF-8 conversion would be a pointless re-save.
    pub fn is_effectively_utf8(&self) -> bool {
        let normalized = self.encoding.replace('-', "").to_ascii_lowercase();
        normalized == "utf8" || normalized == "utf8sig"
    }

    /// File name shown to the user; falls back to the full path text.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}
