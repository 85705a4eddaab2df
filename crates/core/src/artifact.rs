//! Conversion artifacts.

use std::fmt;

use bytes::Bytes;

use crate::gateway::filename_from_url;
use crate::object_url::{ObjectUrl, ObjectUrlPool};

/// The output of a conversion: bytes held in memory, or a reference to a
/// file held by the remote service.
#[derive(Debug)]
pub enum Artifact {
    Local(LocalArtifact),
    Remote(RemoteArtifact),
}

impl Artifact {
    pub fn local(
        suggested_filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self::Local(LocalArtifact {
            data: data.into(),
            suggested_filename: suggested_filename.into(),
            mime_type: mime_type.into(),
            url: None,
        })
    }

    /// A remote artifact named after the last segment of its URL.
    pub fn remote(url: impl Into<String>) -> Self {
        let url = url.into();
        let suggested_filename = filename_from_url(&url);
        Self::Remote(RemoteArtifact {
            url,
            suggested_filename,
            fetched: None,
        })
    }

    pub fn suggested_filename(&self) -> &str {
        match self {
            Self::Local(local) => &local.suggested_filename,
            Self::Remote(remote) => &remote.suggested_filename,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Local(_) => ArtifactKind::Local,
            Self::Remote(_) => ArtifactKind::Remote,
        }
    }

    /// Bytes available without a network round trip.
    pub fn bytes_in_memory(&self) -> Option<&Bytes> {
        match self {
            Self::Local(local) => Some(&local.data),
            Self::Remote(remote) => remote.fetched.as_ref(),
        }
    }

    /// Object URL of a local artifact, if one is currently allocated.
    pub fn object_url(&self) -> Option<&str> {
        match self {
            Self::Local(local) => local.url.as_ref().map(ObjectUrl::as_str),
            Self::Remote(_) => None,
        }
    }

    /// Allocates an object URL for a local artifact that has none.
    /// Remote artifacts are left alone.
    pub fn ensure_url(&mut self, pool: &ObjectUrlPool) -> Option<&str> {
        match self {
            Self::Local(local) => Some(local.url.get_or_insert_with(|| pool.allocate()).as_str()),
            Self::Remote(_) => None,
        }
    }

    /// Revokes the object URL of a local artifact. Safe to call repeatedly.
    pub fn release_url(&mut self) {
        if let Self::Local(local) = self {
            if let Some(url) = local.url.take() {
                url.release();
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Local,
    Remote,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory output of a local converter.
pub struct LocalArtifact {
    pub data: Bytes,
    pub suggested_filename: String,
    pub mime_type: String,
    url: Option<ObjectUrl>,
}

impl fmt::Debug for LocalArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalArtifact")
            .field("suggested_filename", &self.suggested_filename)
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .field("url", &self.url)
            .finish()
    }
}

/// A file held by the remote service. The URL may be relative to the
/// service base; the server may delete the file at any time after the session.
#[derive(Debug)]
pub struct RemoteArtifact {
    pub url: String,
    pub suggested_filename: String,
    fetched: Option<Bytes>,
}

impl RemoteArtifact {
    pub(crate) fn store_fetched(&mut self, data: Bytes) {
        self.fetched = Some(data);
    }
}
