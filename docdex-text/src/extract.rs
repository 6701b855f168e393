//! Text extraction from files on disk.
//!
//! Extraction is the pipeline's outermost adapter: given a path, produce the
//! file's text or `None` when the format is not supported. The trait keeps
//! richer format handlers (PDF, office documents) pluggable without the
//! indexer caring; the shipped implementation covers plain-text formats.

use anyhow::Result;
use std::path::Path;

/// Extracts text content from a file.
///
/// `Ok(None)` means the file type is not supported and the file should be
/// skipped without counting as an error. `Err` means the file looked
/// supported but could not be read; the pipeline logs and skips it.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<Option<String>>;
}

/// Extensions read as UTF-8 text (lossy decoding for stray bytes).
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "adoc", "csv", "tsv", "log", "json", "yaml", "yml", "toml",
    "xml", "html", "htm",
];

/// Plain-text extractor for common textual formats.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<Option<String>> {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_ascii_lowercase(),
            None => {
                tracing::debug!("no extension, skipping: {}", path.display());
                return Ok(None);
            }
        };

        if !TEXT_EXTENSIONS.contains(&ext.as_str()) {
            tracing::debug!("unsupported file type .{ext}: {}", path.display());
            return Ok(None);
        }

        let bytes = std::fs::read(path)?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn extracts_txt_files() {
        let dir = std::env::temp_dir().join("docdex-extract-txt");
        std::fs::create_dir_all(&dir).unwrap();
        let path = write_temp(&dir, "a.txt", b"hello world");

        let text = PlainTextExtractor.extract(&path).unwrap();
        assert_eq!(text.as_deref(), Some("hello world"));
    }

    #[test]
    fn unsupported_extension_yields_none() {
        let dir = std::env::temp_dir().join("docdex-extract-bin");
        std::fs::create_dir_all(&dir).unwrap();
        let path = write_temp(&dir, "a.bin", &[0u8, 1, 2, 3]);

        assert!(PlainTextExtractor.extract(&path).unwrap().is_none());
    }

    #[test]
    fn missing_extension_yields_none() {
        let path = Path::new("/tmp/no-extension-file");
        assert!(PlainTextExtractor.extract(path).unwrap().is_none());
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let dir = std::env::temp_dir().join("docdex-extract-lossy");
        std::fs::create_dir_all(&dir).unwrap();
        let path = write_temp(&dir, "a.txt", &[b'h', b'i', 0xFF, b'!']);

        let text = PlainTextExtractor.extract(&path).unwrap().unwrap();
        assert!(text.starts_with("hi"));
        assert!(text.ends_with('!'));
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = Path::new("/tmp/docdex-does-not-exist.txt");
        assert!(PlainTextExtractor.extract(path).is_err());
    }
}
