//! Typed error definitions for the verification core.
//!
//! Each collaborator gets its own enum so call sites can classify failures
//! locally:
//!
//! - **Serializable** for CLI output via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for retry policy via enum variants

mod config;
mod gateway;
mod store;

pub use config::ConfigError;
pub use gateway::{ErrorClass, GatewayError};
pub use store::StoreError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type that wraps all domain-specific errors.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "domain", content = "error")]
pub enum TypedError {
    /// Wraps an identity provider error
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Wraps a profile store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Wraps a configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Standard Result type using TypedError.
pub type Result<T> = std::result::Result<T, TypedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = TypedError::Store(StoreError::NotFound { subject_id: "uid-123".to_string() });

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("Store"));
        assert!(json.contains("uid-123"));

        let deserialized: TypedError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }

    #[test]
    fn test_error_display() {
        let err = GatewayError::RateLimited { retry_after_secs: Some(30) };

        let msg = format!("{}", TypedError::from(err));
        assert!(msg.starts_with("Gateway error"));
        assert!(msg.contains("30"));
    }
}
