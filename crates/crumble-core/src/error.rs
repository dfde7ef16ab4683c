//! Error types for Crumble

use thiserror::Error;

/// The main error type for Crumble operations
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("No surface provider registered: set one before starting an effect")]
    NoSurfaceProvider,

    #[error("Backend initialization failed: {0}")]
    BackendInit(String),

    #[error("Frame presentation failed: {0}")]
    PresentFailed(String),

    #[error("Invalid capture buffer: expected {expected} bytes, got {got}")]
    InvalidCapture { expected: usize, got: usize },
}

/// Result type alias for Crumble operations
pub type Result<T> = std::result::Result<T, EffectError>;
