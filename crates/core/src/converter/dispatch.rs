//! Per-target converter selection.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::ConverterError;
use super::traits::Converter;
use crate::artifact::Artifact;
use crate::fileset::RawFile;

/// Sends specific targets to dedicated converters and everything else to a fallback.
pub struct TargetDispatch {
    name: String,
    routes: Vec<(String, Arc<dyn Converter>)>,
    fallback: Arc<dyn Converter>,
}

impl TargetDispatch {
    pub fn new(name: impl Into<String>, fallback: Arc<dyn Converter>) -> Self {
        Self {
            name: name.into(),
            routes: Vec::new(),
            fallback,
        }
    }

    pub fn on(mut self, target: impl Into<String>, converter: Arc<dyn Converter>) -> Self {
        self.routes.push((target.into(), converter));
        self
    }

    fn select(&self, target: &str) -> &Arc<dyn Converter> {
        self.routes
            .iter()
            .find(|(t, _)| t == target)
            .map(|(_, c)| c)
            .unwrap_or(&self.fallback)
    }
}

#[async_trait]
impl Converter for TargetDispatch {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_local(&self, target: &str) -> bool {
        self.select(target).is_local(target)
    }

    async fn convert(&self, file: &RawFile, target: &str) -> Result<Vec<Artifact>, ConverterError> {
        self.select(target).convert(file, target).await
    }
}
