//! Error types for Prism.

use thiserror::Error;

/// Main error type for Prism operations.
///
/// Only conditions the presenter cannot recover from surface as errors.
/// A missing drawable or a compositor that is not ready is a normal
/// throttling condition and is logged instead.
#[derive(Error, Debug)]
pub enum PrismError {
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Shader compilation error: {0}")]
    Shader(String),

    #[error("Missing device capability: {0}")]
    Capability(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PrismError {
    /// Whether this error means the view can never show video.
    ///
    /// These are raised while building the device, pipelines or options and
    /// should be reported once at startup.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Gpu(_) | Self::Shader(_) | Self::Capability(_) | Self::Config(_)
        )
    }
}

/// Result type alias for Prism operations.
pub type Result<T> = std::result::Result<T, PrismError>;
