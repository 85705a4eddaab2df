//! Saving conversion artifacts: one at a time or as a single ZIP archive.

mod archive;
mod download;
mod sink;

pub use archive::{build_zip, numbered_name};
pub use download::ArtifactBundler;
pub use sink::{sanitize_filename, ArtifactSink, DirectorySink, SavedFile};

use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors from saving artifacts.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// A remote artifact could not be retrieved.
    #[error("Could not retrieve {name}: {source}")]
    Fetch {
        name: String,
        #[source]
        source: GatewayError,
    },

    #[error("Failed to build archive: {0}")]
    Archive(String),

    #[error("Failed to save {name}: {reason}")]
    Sink { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for DownloadError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive(e.to_string())
    }
}
