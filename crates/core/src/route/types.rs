//! Route types.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::accept::AcceptFilter;
use crate::artifact::Artifact;
use crate::converter::{Converter, ConverterError};
use crate::fileset::RawFile;

/// A target format offered by a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetFormat {
    pub value: String,
    pub label: String,
}

impl TargetFormat {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Maps one source format to its allowed targets and the converter that
/// produces them.
#[derive(Clone)]
pub struct ConversionRoute {
    pub route_id: String,
    pub source_label: String,
    pub accept: AcceptFilter,
    pub target_formats: Vec<TargetFormat>,
    converter: Arc<dyn Converter>,
}

impl ConversionRoute {
    pub fn new(
        route_id: impl Into<String>,
        source_label: impl Into<String>,
        accept: &str,
        converter: Arc<dyn Converter>,
    ) -> Self {
        Self {
            route_id: route_id.into(),
            source_label: source_label.into(),
            accept: AcceptFilter::parse(accept),
            target_formats: Vec::new(),
            converter,
        }
    }

    /// Appends a target format.
    pub fn target(mut self, value: &str, label: &str) -> Self {
        self.target_formats.push(TargetFormat::new(value, label));
        self
    }

    pub fn supports(&self, target: &str) -> bool {
        self.target_formats.iter().any(|t| t.value == target)
    }

    pub fn default_target(&self) -> Option<&TargetFormat> {
        self.target_formats.first()
    }

    /// Whether the default target is produced in-process.
    pub fn is_local(&self) -> bool {
        self.default_target()
            .map_or(false, |t| self.converter.is_local(&t.value))
    }

    /// Whether `target` is produced in-process.
    pub fn is_local_for(&self, target: &str) -> bool {
        self.converter.is_local(target)
    }

    pub fn converter_name(&self) -> &str {
        self.converter.name()
    }

    /// Converts one file. Fan-out converters may return several artifacts.
    pub async fn invoke(&self, file: &RawFile, target: &str) -> Result<Vec<Artifact>, ConverterError> {
        if !self.supports(target) {
            return Err(ConverterError::UnsupportedTarget {
                target: target.to_string(),
            });
        }
        self.converter.convert(file, target).await
    }
}

impl fmt::Debug for ConversionRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRoute")
            .field("route_id", &self.route_id)
            .field("source_label", &self.source_label)
            .field("accept", &self.accept.as_str())
            .field("target_formats", &self.target_formats)
            .field("converter", &self.converter.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConverter;

    #[tokio::test]
    async fn test_invoke_rejects_unlisted_target() {
        let route = ConversionRoute::new("r", "Thing", "*", Arc::new(MockConverter::new()))
            .target("pdf", "PDF");

        let file = RawFile::new("a.txt", "text/plain", vec![1]);
        let err = route.invoke(&file, "docx").await.unwrap_err();
        assert!(matches!(err, ConverterError::UnsupportedTarget { .. }));
        assert!(route.invoke(&file, "pdf").await.is_ok());
    }

    #[test]
    fn test_default_target_is_first() {
        let route = ConversionRoute::new("r", "Thing", "*", Arc::new(MockConverter::new()))
            .target("mp4", "MP4")
            .target("webm", "WebM");
        assert_eq!(route.default_target().unwrap().value, "mp4");
        assert!(route.supports("webm"));
        assert!(!route.supports("avi"));
    }
}
