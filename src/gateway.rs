use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;

use crate::document::Document;
use crate::encoding;

/// Structured failures the gateway can surface. The session is expected to
/// absorb every variant into a user-facing error event; nothing here
/// reaches the UI layer as an error value.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("file not found")]
    NotFound(PathBuf),
    #[error("permission denied")]
    PermissionDenied(PathBuf),
    #[error("document path is empty")]
    InvalidArgument,
    #[error("{message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: std::io::Error,
    },
}

fn classify(path: &Path, action: &str, err: std::io::Error) -> GatewayError {
    match err.kind() {
        ErrorKind::NotFound => GatewayError::NotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => GatewayError::PermissionDenied(path.to_path_buf()),
        _ => GatewayError::Io {
            path: path.to_path_buf(),
            message: format!("{action} failed: {err}"),
            source: err,
        },
    }
}

/// Read and decode a file into a fresh, unmodified document. The decoded
/// text replaces undecodable byte sequences rather than failing, so
/// mis-detected or binary files are still viewable.
pub fn open(path: &Path) -> Result<Document, GatewayError> {
    let raw = fs::read(path).map_err(|err| classify(path, "read", err))?;
    let (content, detected, _had_errors) = encoding::decode_lossy(&raw);
    Ok(Document {
        path: path.to_path_buf(),
        content,
        encoding: detected.name,
        modified: false,
    })
}

/// Persist a document atomically: encode, write the whole content to a
/// temp file in the destination directory, then rename over the target.
/// The rename is the sole commit point, so the destination is only ever
/// observed with the old complete content or the new complete content.
pub fn save(document: &Document) -> Result<(), GatewayError> {
    if !document.has_path() {
        return Err(GatewayError::InvalidArgument);
    }

    let encoded = encoding::encode_for(&document.content, &document.encoding);
    write_via_temp(&document.path, &encoded)
}

fn write_via_temp(path: &Path, data: &[u8]) -> Result<(), GatewayError> {
    // The temp file must live in the destination directory so the final
    // rename stays on one filesystem and is atomic.
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let temp_path = dir.join(format!(
        ".texttools-tmp-{}-{}",
        std::process::id(),
        OffsetDateTime::now_utc().unix_timestamp_nanos()
    ));

    let write_result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()
    })();
    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(classify(path, "write", err));
    }

    fs::rename(&temp_path, path).map_err(|err| {
        let _ = fs::remove_file(&temp_path);
        classify(path, "replace", err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_decodes_and_starts_unmodified() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("note.txt");
        fs::write(&path, "line1\nline2\nline3").expect("write fixture");

        let doc = open(&path).expect("open");
        assert_eq!(doc.content, "line1\nline2\nline3");
        assert_eq!(doc.encoding, "utf-8");
        assert!(!doc.modified);
        assert_eq!(doc.path, path);
    }

    #[test]
    fn open_missing_file_is_not_found() {
        let err = open(Path::new("/no/such/dir/file.txt")).unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[test]
    fn save_then_open_round_trips() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("round.txt");
        let doc = Document::new(path.clone(), "round trip\ncontent", "utf-8");

        save(&doc).expect("save");
        let loaded = open(&path).expect("reopen");
        assert_eq!(loaded.content, "round trip\ncontent");
    }

    #[test]
    fn save_overwrites_whole_content() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("existing.txt");
        fs::write(&path, "old content that is much longer").expect("write fixture");

        let doc = Document::new(path.clone(), "new", "utf-8");
        save(&doc).expect("save");
        assert_eq!(fs::read_to_string(&path).expect("read back"), "new");
    }

    #[test]
    fn save_rejects_an_empty_path() {
        let doc = Document::new("", "data", "utf-8");
        let err = save(&doc).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument));
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("clean.txt");
        let doc = Document::new(path, "data", "utf-8");
        save(&doc).expect("save");

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .expect("read dir")
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(".texttools-tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn save_honors_the_utf8_sig_label() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("bom.txt");
        let doc = Document::new(path.clone(), "hello", "utf-8-sig");
        save(&doc).expect("save");

        let raw = fs::read(&path).expect("read back");
        assert!(raw.starts_with(&[0xEF, 0xBB, 0xBF]));
        let reopened = open(&path).expect("reopen");
        assert_eq!(reopened.encoding, "utf-8-sig");
        assert_eq!(reopened.content, "hello");
    }
}
