use crate::error::ClientError;
use apksure_core::format_bytes;
use bytes::Bytes;
use std::path::Path;

/// A file chosen for analysis. Cloning shares the underlying buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub bytes: Bytes,
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("filename", &self.filename)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl Artifact {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file; the artifact keeps only the file name.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        Ok(Self::new(filename, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Size for display, e.g. `10 MB`
    pub fn size_label(&self) -> String {
        format_bytes(self.bytes.len() as u64, 2)
    }
}
