//! Crate-wide error type

use std::path::PathBuf;

/// Errors from loading assets, validating configuration and talking to the
/// outside world (window, MQTT broker).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Texture resource missing or not decodable
    #[error("failed to decode texture {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("display error: {0}")]
    Display(String),
    #[error("MQTT error: {0}")]
    Mqtt(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
