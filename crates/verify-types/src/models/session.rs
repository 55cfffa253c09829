//! Verification session state as seen by the UI layer.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorClass, GatewayError};

/// Lifecycle state of a verification session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, not started
    #[default]
    Idle,
    /// Checking the identity provider on a cadence
    Polling,
    /// Email confirmed (terminal)
    Verified,
    /// Attempts exhausted, waiting for acknowledgement
    TimedOut,
    /// Torn down or failed fatally (terminal)
    Stopped,
}

impl SessionState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Stopped)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Polling => write!(f, "polling"),
            SessionState::Verified => write!(f, "verified"),
            SessionState::TimedOut => write!(f, "timed_out"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Point-in-time view of a session, for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub subject_id: String,
    pub state: SessionState,
    pub attempt_count: u32,
    pub resend_cooldown_remaining: u64,
}

/// Notification emitted by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VerificationEvent {
    /// Provider confirmed the address; safe to navigate away
    Verified { subject_id: String },
    /// Attempts exhausted; polling resumes after acknowledgement
    TimedOut { attempts: u32 },
    /// A gateway failure the caller may want to show
    Error { class: ErrorClass, error: GatewayError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Verified.is_terminal());
        assert!(SessionState::Stopped.is_terminal());
        assert!(!SessionState::TimedOut.is_terminal());
        assert!(!SessionState::Idle.is_terminal());
    }

    #[test]
    fn test_event_serialization() {
        let event = VerificationEvent::Error {
            class: ErrorClass::Fatal,
            error: GatewayError::AccountDisabled,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["class"], "fatal");
    }
}
