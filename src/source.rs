//! Template file access.

use crate::error::{MapperError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Encoding used when returning file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Contents decoded as UTF-8 text
    #[default]
    Utf8,
    /// Raw bytes, base64 encoded
    Base64,
}

/// Where template documents come from.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Return the contents of the named template.
    async fn read(&self, name: &str) -> Result<String>;

    /// Encoding of the strings returned by `read`.
    fn encoding(&self) -> Encoding {
        Encoding::Utf8
    }
}

/// Reads templates from a directory on disk.
#[derive(Debug, Clone)]
pub struct FsTemplateSource {
    root: PathBuf,
    encoding: Encoding,
}

impl FsTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            encoding: Encoding::Utf8,
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl TemplateSource for FsTemplateSource {
    async fn read(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        debug!(template = %name, path = %path.display(), "Reading template");
        read_file(&path, self.encoding).await
    }

    fn encoding(&self) -> Encoding {
        self.encoding
    }
}

/// Serves templates held in memory, e.g. documents embedded with
/// `include_str!`.
#[derive(Debug, Default)]
pub struct MemoryTemplateSource {
    templates: HashMap<String, String>,
    reads: AtomicU64,
}

impl MemoryTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a template.
    pub fn with_template(mut self, name: impl Into<String>, xml: impl Into<String>) -> Self {
        self.templates.insert(name.into(), xml.into());
        self
    }

    /// Number of reads served so far, including misses.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TemplateSource for MemoryTemplateSource {
    async fn read(&self, name: &str) -> Result<String> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        // Suspend like a file read.
        tokio::task::yield_now().await;
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| MapperError::TemplateNotFound(name.to_string()))
    }
}

/// Decode a string produced by `read_file` with `encoding` back to text.
pub fn decode(content: String, encoding: Encoding) -> Result<String> {
    match encoding {
        Encoding::Utf8 => Ok(content),
        Encoding::Base64 => {
            let bytes = STANDARD
                .decode(content.trim())
                .map_err(|e| MapperError::InvalidTemplate(format!("invalid base64: {e}")))?;
            String::from_utf8(bytes).map_err(|e| {
                MapperError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            })
        }
    }
}

/// Read a file with the given encoding.
///
/// A missing file is reported as `TemplateNotFound`; other IO failures are
/// passed through.
pub async fn read_file(path: impl AsRef<Path>, encoding: Encoding) -> Result<String> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => MapperError::TemplateNotFound(path.display().to_string()),
        _ => MapperError::Io(e),
    })?;

    match encoding {
        Encoding::Utf8 => String::from_utf8(bytes).map_err(|e| {
            MapperError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        }),
        Encoding::Base64 => Ok(STANDARD.encode(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_read_file_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "File content here").unwrap();

        let content = read_file(file.path(), Encoding::default()).await.unwrap();
        assert_eq!(content, "File content here");
    }

    #[tokio::test]
    async fn test_read_file_base64() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "hello").unwrap();

        let content = read_file(file.path(), Encoding::Base64).await.unwrap();
        assert_eq!(content, "aGVsbG8=");
    }

    #[tokio::test]
    async fn test_read_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file(dir.path().join("absent.xml"), Encoding::Utf8)
            .await
            .unwrap_err();
        assert!(matches!(err, MapperError::TemplateNotFound(_)));
    }

    #[tokio::test]
    async fn test_read_file_invalid_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00]).unwrap();

        let err = read_file(file.path(), Encoding::Utf8).await.unwrap_err();
        assert!(matches!(err, MapperError::Io(_)));
    }

    #[tokio::test]
    async fn test_fs_source_joins_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("amend.xml"), "<Envelope/>").unwrap();

        let source = FsTemplateSource::new(dir.path());
        assert_eq!(source.root(), dir.path());
        assert_eq!(source.read("amend.xml").await.unwrap(), "<Envelope/>");
    }

    #[tokio::test]
    async fn test_memory_source_counts_reads() {
        let source = MemoryTemplateSource::new().with_template("a.xml", "<a/>");

        assert_eq!(source.read("a.xml").await.unwrap(), "<a/>");
        let err = source.read("b.xml").await.unwrap_err();
        assert!(matches!(err, MapperError::TemplateNotFound(ref name) if name == "b.xml"));
        assert_eq!(source.reads(), 2);
    }

    #[tokio::test]
    async fn test_decode_reverses_base64_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<Envelope/>").unwrap();

        let encoded = read_file(file.path(), Encoding::Base64).await.unwrap();
        assert_eq!(decode(encoded, Encoding::Base64).unwrap(), "<Envelope/>");
        assert_eq!(decode("<a/>".to_string(), Encoding::Utf8).unwrap(), "<a/>");
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode("not base64!".to_string(), Encoding::Base64).unwrap_err();
        assert!(matches!(err, MapperError::InvalidTemplate(_)));
    }

    #[test]
    fn test_encoding_from_yaml() {
        let encoding: Encoding = serde_yaml::from_str("base64").unwrap();
        assert_eq!(encoding, Encoding::Base64);
        assert_eq!(Encoding::default(), Encoding::Utf8);
    }
}
