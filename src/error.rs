//! Error types for IPTV Grid
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Player error: {0}")]
    Player(String),
}

/// Result type alias for IPTV Grid
pub type Result<T> = std::result::Result<T, AppError>;
