//! Trait definitions for the converter module.

use async_trait::async_trait;

use super::error::ConverterError;
use crate::artifact::Artifact;
use crate::fileset::RawFile;

/// Converts one file into one or more artifacts.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Whether `target` is produced in-process rather than by the remote service.
    fn is_local(&self, target: &str) -> bool;

    /// Converts `file` to `target`. Fan-out conversions return several
    /// artifacts in the order they were produced.
    async fn convert(&self, file: &RawFile, target: &str) -> Result<Vec<Artifact>, ConverterError>;
}
