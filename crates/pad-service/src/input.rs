//! Loading plaintext and key files

use std::io;
use std::path::Path;

use pad_cipher::PadKey;
use shared_protocol::AlphaText;
use tracing::debug;

use crate::{ServiceError, ServiceResult};

/// Read the first line of `path` as alphabet text
///
/// Everything from the first newline on is ignored. `label` names the file
/// in validation errors.
pub fn load_text(path: impl AsRef<Path>, label: &str) -> ServiceResult<AlphaText> {
    let path = path.as_ref();
    let raw = std::fs::read(path)
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))?;

    let line = match raw.iter().position(|&b| b == b'\n') {
        Some(end) => &raw[..end],
        None => &raw[..],
    };

    let text = AlphaText::from_bytes(line).map_err(|e| ServiceError::InvalidInput {
        label: label.to_string(),
        reason: e.to_string(),
    })?;

    debug!("Loaded {} symbols from {}", text.len(), path.display());
    Ok(text)
}

/// Read a key file the same way as [`load_text`]
pub fn load_key(path: impl AsRef<Path>, label: &str) -> ServiceResult<PadKey> {
    load_text(path, label).map(PadKey::from_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_protocol::SessionId;
    use std::path::PathBuf;

    struct TempFile(PathBuf);

    impl TempFile {
        fn with_contents(contents: &[u8]) -> Self {
            let path = std::env::temp_dir().join(format!("pad-input-{}", SessionId::new()));
            std::fs::write(&path, contents).unwrap();
            Self(path)
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    #[test]
    fn test_load_stops_at_first_newline() {
        let file = TempFile::with_contents(b"HELLO WORLD\nignored $$$\n");
        let text = load_text(&file.0, "plain1").unwrap();
        assert_eq!(text.as_str(), "HELLO WORLD");
    }

    #[test]
    fn test_load_without_newline() {
        let file = TempFile::with_contents(b"NO NEWLINE");
        assert_eq!(load_text(&file.0, "plain2").unwrap().as_str(), "NO NEWLINE");
    }

    #[test]
    fn test_load_names_file_on_bad_symbols() {
        let file = TempFile::with_contents(b"lower case\n");
        let err = load_text(&file.0, "plain4").unwrap_err();

        assert!(matches!(&err, ServiceError::InvalidInput { label, .. } if label == "plain4"));
        assert!(err.to_string().starts_with("plain4 contains invalid characters"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let path = std::env::temp_dir().join(format!("pad-missing-{}", SessionId::new()));
        let err = load_text(&path, "key").unwrap_err();
        assert!(matches!(err, ServiceError::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }

    #[test]
    fn test_load_key() {
        let file = TempFile::with_contents(b"XMCKL DD\n");
        let key = load_key(&file.0, "mykey").unwrap();
        assert_eq!(key.as_bytes(), b"XMCKL DD");
    }
}
