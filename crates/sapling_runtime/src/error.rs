//! Error types for sapling_runtime

use sapling_core::RenderError;
use thiserror::Error;

/// Errors that can occur while driving a render loop
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A render or effect failed
    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    /// The element factory failed to produce a root element
    #[error("Element factory failed: {0}")]
    Factory(String),
}

impl From<anyhow::Error> for RuntimeError {
    fn from(err: anyhow::Error) -> Self {
        RuntimeError::Factory(err.to_string())
    }
}

/// Result type for sapling_runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
