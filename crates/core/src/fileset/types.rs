//! Types for file intake.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use serde::Serialize;

use crate::object_url::ObjectUrl;

/// A selected file: name, MIME type, and contents.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl RawFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Reads a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(name, mime_type, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// File name without its last extension.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(0) | None => &self.name,
            Some(idx) => &self.name[..idx],
        }
    }

    /// Lowercased last extension, if any.
    pub fn extension(&self) -> Option<String> {
        match self.name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(self.name[idx + 1..].to_ascii_lowercase()),
        }
    }
}

/// A file admitted to a [`FileSet`](super::FileSet).
#[derive(Debug)]
pub struct UploadedItem {
    pub id: String,
    pub file: RawFile,
    pub(super) preview: Option<ObjectUrl>,
}

impl UploadedItem {
    /// Preview URL, present for image files only.
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_ref().map(ObjectUrl::as_str)
    }

    pub(super) fn release(self) {
        if let Some(preview) = self.preview {
            preview.release();
        }
    }
}

/// Result of one `add` call.
#[derive(Debug, Default)]
pub struct IntakeReport {
    /// Ids of admitted items, in insertion order.
    pub accepted: Vec<String>,
    pub rejected: Vec<Rejection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub name: String,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    TooLarge { size_bytes: u64, max_bytes: u64 },
    NotAccepted,
    SetFull { max_files: usize },
}

impl RejectionReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TooLarge { .. } => "too_large",
            Self::NotAccepted => "not_accepted",
            Self::SetFull { .. } => "set_full",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge {
                size_bytes,
                max_bytes,
            } => write!(f, "{} bytes exceeds the {} byte limit", size_bytes, max_bytes),
            Self::NotAccepted => write!(f, "file type not accepted"),
            Self::SetFull { max_files } => write!(f, "set already holds {} files", max_files),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_and_extension() {
        let file = RawFile::new("Report.Final.PDF", "application/pdf", Vec::new());
        assert_eq!(file.stem(), "Report.Final");
        assert_eq!(file.extension().as_deref(), Some("pdf"));

        let bare = RawFile::new("README", "text/plain", Vec::new());
        assert_eq!(bare.stem(), "README");
        assert_eq!(bare.extension(), None);

        let hidden = RawFile::new(".env", "text/plain", Vec::new());
        assert_eq!(hidden.stem(), ".env");
    }

    #[tokio::test]
    async fn test_from_path_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("picture.png");
        tokio::fs::write(&path, b"not really a png").await.unwrap();

        let file = RawFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "picture.png");
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.size(), 16);
        assert!(file.is_image());
    }
}
