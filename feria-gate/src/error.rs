//! Error types for feria-gate
//!
//! Validation rejections are never errors: they are data on a
//! `ValidationOutcome`. Errors here cover setup, devices and the HTTP surface.

use thiserror::Error;

use crate::camera::CameraError;

/// Main error type for feria-gate
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from the shared crate (config files, input parsing)
    #[error(transparent)]
    Common(#[from] feria_common::Error),

    /// Camera acquisition or stream errors
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Session driver is gone
    #[error("Session closed: {0}")]
    SessionClosed(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using feria-gate Error
pub type Result<T> = std::result::Result<T, Error>;
