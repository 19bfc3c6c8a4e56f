#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("No relays configured: every relay source, including the built-in fallback, is empty")]
    NoRelaysConfigured,

    #[error("Invalid relay URL: {0}")]
    InvalidUrl(String),

    #[error("Relay URL blocked: {url}: {reason}")]
    BlockedUrl { url: String, reason: String },

    #[error("Group credential decode failed: {0}")]
    GroupDecode(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
