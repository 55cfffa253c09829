//! Identity provider errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Retry classification for gateway failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Likely to succeed on retry (network level)
    Transient,
    /// Cannot succeed without external intervention (re-login)
    Fatal,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::Transient => write!(f, "transient"),
            ErrorClass::Fatal => write!(f, "fatal"),
        }
    }
}

/// Errors reported by an identity provider.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum GatewayError {
    /// Provider could not be reached
    #[error("Network error: {message}")]
    Network {
        /// Transport-level description
        message: String,
    },

    /// Request did not complete in time
    #[error("Request timed out")]
    Timeout,

    /// Provider throttled the request
    #[error("Rate limited by identity provider (retry after {retry_after_secs:?}s)")]
    RateLimited {
        /// Seconds to wait, if the provider said so
        retry_after_secs: Option<u64>,
    },

    /// Provider returned a server-side failure
    #[error("Identity provider unavailable (status {status})")]
    Unavailable {
        /// HTTP status code
        status: u16,
    },

    /// Session token was revoked or has expired
    #[error("Session revoked: {reason}")]
    SessionRevoked {
        /// Provider error code
        reason: String,
    },

    /// Account no longer exists
    #[error("Account not found")]
    AccountNotFound,

    /// Account was disabled by an administrator
    #[error("Account disabled")]
    AccountDisabled,

    /// Any other provider-side rejection
    #[error("Identity provider rejected request: {code}")]
    Provider {
        /// Provider error code
        code: String,
    },
}

impl GatewayError {
    /// Classify this error for retry purposes.
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Network { .. }
            | Self::Timeout
            | Self::RateLimited { .. }
            | Self::Unavailable { .. } => ErrorClass::Transient,
            Self::SessionRevoked { .. }
            | Self::AccountNotFound
            | Self::AccountDisabled
            | Self::Provider { .. } => ErrorClass::Fatal,
        }
    }

    /// Check if this is a temporary error that may resolve on retry.
    pub const fn is_transient(&self) -> bool {
        matches!(self.class(), ErrorClass::Transient)
    }

    /// Check if the user has to sign in again.
    pub const fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::SessionRevoked { .. } | Self::AccountNotFound | Self::AccountDisabled)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient() {
        assert!(GatewayError::network("offline").is_transient());
        assert!(GatewayError::Timeout.is_transient());
        assert!(GatewayError::RateLimited { retry_after_secs: None }.is_transient());
        assert!(GatewayError::Unavailable { status: 503 }.is_transient());

        assert!(!GatewayError::AccountNotFound.is_transient());
        assert!(!GatewayError::Provider { code: "OPERATION_NOT_ALLOWED".to_string() }.is_transient());
    }

    #[test]
    fn test_reauthentication() {
        let revoked = GatewayError::SessionRevoked { reason: "TOKEN_EXPIRED".to_string() };
        assert_eq!(revoked.class(), ErrorClass::Fatal);
        assert!(revoked.requires_reauthentication());
        assert!(!GatewayError::Provider { code: "X".to_string() }.requires_reauthentication());
    }
}
