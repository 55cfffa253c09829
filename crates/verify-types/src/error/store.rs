//! Profile store errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while writing a profile document.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum StoreError {
    /// Store could not be reached (offline, 5xx)
    #[error("Profile store unavailable: {message}")]
    Unavailable {
        /// Description of the failure
        message: String,
    },

    /// Caller is not allowed to write this document
    #[error("Permission denied writing profile {subject_id}")]
    PermissionDenied {
        /// Account uid
        subject_id: String,
    },

    /// Profile document does not exist
    #[error("Profile not found: {subject_id}")]
    NotFound {
        /// Account uid
        subject_id: String,
    },

    /// Store rejected the payload
    #[error("Profile store rejected write: {message}")]
    Rejected {
        /// Backend message
        message: String,
    },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }
}
