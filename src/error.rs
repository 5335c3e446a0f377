//! Error taxonomy for the export pipeline.
//!
//! Nothing in the pipeline catches these internally: every failure aborts the
//! export call and surfaces to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    /// Empty, missing or malformed record name list.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported export format: {0:?}")]
    UnsupportedFormat(String),

    #[error("portfolio not found: {0}")]
    NotFound(String),

    /// Document conversion or serialisation failed.
    #[error("render failed: {0}")]
    Render(String),

    #[error("image fetch failed for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("could not persist file: {0}")]
    Persistence(String),
}

impl ExportError {
    pub fn network(url: &str, reason: impl ToString) -> Self {
        ExportError::Network {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
