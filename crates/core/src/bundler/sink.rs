//! Destinations for saved artifacts.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use super::archive::numbered_name;
use super::DownloadError;

/// A file written by a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedFile {
    /// Name actually used, which may differ from the suggested one.
    pub filename: String,
    /// Where the file ended up (a path for directory sinks).
    pub location: String,
    pub size_bytes: u64,
}

/// Receives named bytes to keep.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn save(&self, filename: &str, data: Bytes) -> Result<SavedFile, DownloadError>;
}

/// Replaces path separators and control characters so a suggested name
/// can't escape the target directory.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "download".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Writes into one directory, never overwriting an existing file.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn free_path(&self, filename: &str) -> Result<(String, PathBuf), DownloadError> {
        let mut name = filename.to_string();
        let mut n = 1;
        loop {
            let path = self.dir.join(&name);
            if !tokio::fs::try_exists(&path).await? {
                return Ok((name, path));
            }
            name = numbered_name(filename, n);
            n += 1;
        }
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn save(&self, filename: &str, data: Bytes) -> Result<SavedFile, DownloadError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let (name, path) = self.free_path(&sanitize_filename(filename)).await?;
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| DownloadError::Sink {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        debug!("Saved {} ({} bytes)", path.display(), data.len());
        Ok(SavedFile {
            filename: name,
            location: path.display().to_string(),
            size_bytes: data.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("  "), "download");
    }

    #[tokio::test]
    async fn test_directory_sink_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let sink = DirectorySink::new(temp.path().join("out"));

        let first = sink.save("a.png", Bytes::from_static(b"1")).await.unwrap();
        let second = sink.save("a.png", Bytes::from_static(b"22")).await.unwrap();

        assert_eq!(first.filename, "a.png");
        assert_eq!(second.filename, "a (1).png");
        assert_eq!(second.size_bytes, 2);
        assert_eq!(
            std::fs::read(temp.path().join("out").join("a.png")).unwrap(),
            b"1"
        );
    }
}
