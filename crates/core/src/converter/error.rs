//! Error types for the converter module.

use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// The remote service failed or rejected the file.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Input could not be decoded.
    #[error("Failed to read {name}: {reason}")]
    Decode { name: String, reason: String },

    /// Output could not be encoded.
    #[error("Failed to encode output: {reason}")]
    Encode { reason: String },

    /// PDF structure could not be processed.
    #[error("PDF processing failed: {reason}")]
    Pdf { reason: String },

    /// Requested page range selects no pages.
    #[error("Invalid page range {start}-{end} for a {total}-page document")]
    InvalidPageRange { start: u32, end: u32, total: u32 },

    /// None of the requested pages exist.
    #[error("None of the requested pages exist in this {total}-page document")]
    NoPagesSelected { total: u32 },

    /// Converter cannot produce this target.
    #[error("Unsupported target format: {target}")]
    UnsupportedTarget { target: String },

    /// Worker task failed.
    #[error("Conversion task failed: {0}")]
    Task(String),
}

impl ConverterError {
    pub fn decode(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn encode(reason: impl ToString) -> Self {
        Self::Encode {
            reason: reason.to_string(),
        }
    }

    pub fn pdf(reason: impl ToString) -> Self {
        Self::Pdf {
            reason: reason.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for ConverterError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}
