//! Unified error types for Verify Core.

use serde::Serialize;
use thiserror::Error;
use verify_types::{ConfigError, GatewayError, StoreError};

/// Main error type for operations outside the polling loop.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Network request failed (HTTP client).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Identity provider rejected the operation.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Profile store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invalid backend endpoint.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for Verify Core operations.
pub type AppResult<T> = Result<T, AppError>;
