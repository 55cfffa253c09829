//! Verification policy configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Timing and retry policy for a verification session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Delay between scheduled checks (default: 30000)
    pub poll_interval_ms: u64,
    /// Checks without success before timing out (default: 10)
    pub max_attempts: u32,
    /// Delay before the first check after start (default: 3000)
    pub startup_delay_ms: u64,
    /// Consecutive transient failures before backing off (default: 3)
    pub max_retries: u32,
    /// Pause before polling restarts after a backoff (default: 10000)
    pub retry_backoff_ms: u64,
    /// Delay before polling resumes after a timeout is acknowledged (default: 1000)
    pub resume_delay_ms: u64,
    /// Cooldown between resend requests in seconds (default: 60)
    pub resend_cooldown_secs: u64,
    /// Checks are skipped for this long after a successful resend (default: 10000)
    pub resend_suppress_ms: u64,
}

impl VerificationConfig {
    pub fn new() -> Self {
        Self {
            poll_interval_ms: 30_000,
            max_attempts: 10,
            startup_delay_ms: 3_000,
            max_retries: 3,
            retry_backoff_ms: 10_000,
            resume_delay_ms: 1_000,
            resend_cooldown_secs: 60,
            resend_suppress_ms: 10_000,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("poll_interval_ms", "must be greater than zero"));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts", "must be greater than zero"));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::invalid("max_retries", "must be greater than zero"));
        }
        Ok(())
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub const fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }

    pub const fn resend_cooldown(&self) -> Duration {
        Duration::from_secs(self.resend_cooldown_secs)
    }

    pub const fn resend_suppress(&self) -> Duration {
        Duration::from_millis(self.resend_suppress_ms)
    }

    /// Upper bound on polling time before the timeout notice.
    pub const fn polling_budget(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.saturating_mul(self.max_attempts as u64))
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VerificationConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.polling_budget(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: VerificationConfig =
            serde_json::from_str(r#"{"poll_interval_ms": 3000}"#).unwrap();
        assert_eq!(config.poll_interval_ms, 3000);
        assert_eq!(config.retry_backoff_ms, 10_000);
    }

    #[test]
    fn test_validation() {
        let config = VerificationConfig { max_attempts: 0, ..Default::default() };
        assert_eq!(
            config.validate(),
            Err(ConfigError::invalid("max_attempts", "must be greater than zero"))
        );
    }
}
