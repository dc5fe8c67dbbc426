//! Runtime error types.

use thiserror::Error;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Locale resolution failed.
    #[error(transparent)]
    Overlay(#[from] braid_framework::error::OverlayError),

    /// The ingest channel is closed; the runtime has shut down.
    #[error("ingest channel closed")]
    IngestClosed,

    /// The ingest queue is full (non-blocking send only).
    #[error("ingest queue full")]
    IngestFull,

    /// The runtime was started twice.
    #[error("runtime is already running")]
    AlreadyRunning,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
