//! Session state machine.
//!
//! `SessionMachine::apply` maps (state, input) to (state, effect) with no I/O.
//! The poller feeds it inputs and carries out the returned effect.

use std::time::Duration;
use verify_types::{ErrorClass, SessionState, VerificationConfig};

/// Something that happened to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Start,
    /// A scheduled reload+check finished
    CheckCompleted { verified: bool },
    /// A scheduled reload+check failed
    CheckFailed(ErrorClass),
    /// A manual check saw the address confirmed
    ManualConfirmed,
    /// The caller dismissed the timeout notice
    Acknowledge,
    /// A verification message was re-sent
    ResendIssued,
    Stop,
}

/// What the driver must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Begin the cadence after the delay
    Schedule(Duration),
    /// Keep the current cadence
    Continue,
    /// Write the flag and notify; the cadence ends
    Reconcile,
    /// Emit the timeout notice; the cadence ends
    TimedOut,
    /// Wait this long before the next check
    Backoff(Duration),
    /// Surface the error; the cadence ends
    Fatal,
    /// Tear down timers
    Cancel,
    /// Input does not apply in the current state
    Ignore,
}

#[derive(Debug, Clone)]
pub struct SessionMachine {
    state: SessionState,
    attempt_count: u32,
    retry_count: u32,
    max_attempts: u32,
    max_retries: u32,
    startup_delay: Duration,
    retry_backoff: Duration,
    resume_delay: Duration,
}

impl SessionMachine {
    pub fn new(config: &VerificationConfig) -> Self {
        Self {
            state: SessionState::Idle,
            attempt_count: 0,
            retry_count: 0,
            max_attempts: config.max_attempts.max(1),
            max_retries: config.max_retries.max(1),
            startup_delay: config.startup_delay(),
            retry_backoff: config.retry_backoff(),
            resume_delay: config.resume_delay(),
        }
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn apply(&mut self, input: Input) -> Effect {
        use SessionState::{Idle, Polling, Stopped, TimedOut, Verified};

        match (self.state, input) {
            (_, Input::Stop) => {
                if self.state == Stopped {
                    Effect::Ignore
                } else {
                    self.state = Stopped;
                    Effect::Cancel
                }
            },

            (Idle, Input::Start) => {
                self.state = Polling;
                self.attempt_count = 0;
                self.retry_count = 0;
                Effect::Schedule(self.startup_delay)
            },

            (Polling, Input::CheckCompleted { verified: true }) => {
                self.state = Verified;
                Effect::Reconcile
            },
            (Polling, Input::CheckCompleted { verified: false }) => {
                self.attempt_count += 1;
                self.retry_count = 0;
                if self.attempt_count >= self.max_attempts {
                    self.state = TimedOut;
                    Effect::TimedOut
                } else {
                    Effect::Continue
                }
            },

            (Polling, Input::CheckFailed(ErrorClass::Transient)) => {
                self.retry_count += 1;
                if self.retry_count >= self.max_retries {
                    self.retry_count = 0;
                    Effect::Backoff(self.retry_backoff)
                } else {
                    Effect::Continue
                }
            },
            (Polling, Input::CheckFailed(ErrorClass::Fatal)) => {
                self.state = Stopped;
                Effect::Fatal
            },

            (Idle | Polling | TimedOut, Input::ManualConfirmed) => {
                self.state = Verified;
                Effect::Reconcile
            },

            (TimedOut, Input::Acknowledge) => {
                self.state = Polling;
                self.attempt_count = 0;
                self.retry_count = 0;
                Effect::Schedule(self.resume_delay)
            },

            (Polling, Input::ResendIssued) => {
                self.attempt_count = 0;
                Effect::Continue
            },

            _ => Effect::Ignore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(max_attempts: u32, max_retries: u32) -> SessionMachine {
        SessionMachine::new(&VerificationConfig {
            max_attempts,
            max_retries,
            ..Default::default()
        })
    }

    #[test]
    fn test_start_schedules_startup_delay() {
        let mut m = machine(10, 3);
        assert_eq!(m.apply(Input::Start), Effect::Schedule(Duration::from_secs(3)));
        assert_eq!(m.state(), SessionState::Polling);

        assert_eq!(m.apply(Input::Start), Effect::Ignore);
    }

    #[test]
    fn test_failed_checks_below_limit_stay_polling() {
        let mut m = machine(10, 3);
        m.apply(Input::Start);
        for n in 1..10 {
            assert_eq!(m.apply(Input::CheckCompleted { verified: false }), Effect::Continue);
            assert_eq!(m.state(), SessionState::Polling);
            assert_eq!(m.attempt_count(), n);
        }
    }

    #[test]
    fn test_times_out_exactly_once() {
        let mut m = machine(3, 3);
        m.apply(Input::Start);
        m.apply(Input::CheckCompleted { verified: false });
        m.apply(Input::CheckCompleted { verified: false });
        assert_eq!(m.apply(Input::CheckCompleted { verified: false }), Effect::TimedOut);
        assert_eq!(m.state(), SessionState::TimedOut);
        assert_eq!(m.attempt_count(), 3);

        // Late results do not count while timed out
        assert_eq!(m.apply(Input::CheckCompleted { verified: false }), Effect::Ignore);
        assert_eq!(m.attempt_count(), 3);
    }

    #[test]
    fn test_acknowledge_restarts_with_fresh_attempts() {
        let mut m = machine(1, 3);
        m.apply(Input::Start);
        m.apply(Input::CheckCompleted { verified: false });
        assert_eq!(m.state(), SessionState::TimedOut);

        assert_eq!(m.apply(Input::Acknowledge), Effect::Schedule(Duration::from_secs(1)));
        assert_eq!(m.state(), SessionState::Polling);
        assert_eq!(m.attempt_count(), 0);
        assert_eq!(m.apply(Input::Acknowledge), Effect::Ignore);
    }

    #[test]
    fn test_transient_failures_back_off_and_reset() {
        let mut m = machine(10, 3);
        m.apply(Input::Start);
        assert_eq!(m.apply(Input::CheckFailed(ErrorClass::Transient)), Effect::Continue);
        assert_eq!(m.apply(Input::CheckFailed(ErrorClass::Transient)), Effect::Continue);
        assert_eq!(
            m.apply(Input::CheckFailed(ErrorClass::Transient)),
            Effect::Backoff(Duration::from_secs(10))
        );
        assert_eq!(m.retry_count(), 0);
        assert_eq!(m.attempt_count(), 0);
        assert_eq!(m.state(), SessionState::Polling);
    }

    #[test]
    fn test_successful_check_clears_retry_count() {
        let mut m = machine(10, 3);
        m.apply(Input::Start);
        m.apply(Input::CheckFailed(ErrorClass::Transient));
        m.apply(Input::CheckCompleted { verified: false });
        assert_eq!(m.retry_count(), 0);
    }

    #[test]
    fn test_fatal_failure_stops() {
        let mut m = machine(10, 3);
        m.apply(Input::Start);
        assert_eq!(m.apply(Input::CheckFailed(ErrorClass::Fatal)), Effect::Fatal);
        assert_eq!(m.state(), SessionState::Stopped);
        assert_eq!(m.apply(Input::CheckCompleted { verified: true }), Effect::Ignore);
    }

    #[test]
    fn test_verified_reconciles_once() {
        let mut m = machine(10, 3);
        m.apply(Input::Start);
        assert_eq!(m.apply(Input::CheckCompleted { verified: true }), Effect::Reconcile);
        assert_eq!(m.apply(Input::CheckCompleted { verified: true }), Effect::Ignore);
        assert_eq!(m.apply(Input::ManualConfirmed), Effect::Ignore);
        assert_eq!(m.state(), SessionState::Verified);
    }

    #[test]
    fn test_manual_confirmation_from_timed_out() {
        let mut m = machine(1, 3);
        m.apply(Input::Start);
        m.apply(Input::CheckCompleted { verified: false });
        assert_eq!(m.apply(Input::ManualConfirmed), Effect::Reconcile);
        assert_eq!(m.state(), SessionState::Verified);
    }

    #[test]
    fn test_stop_is_idempotent_from_any_state() {
        let mut m = machine(10, 3);
        assert_eq!(m.apply(Input::Stop), Effect::Cancel);
        assert_eq!(m.apply(Input::Stop), Effect::Ignore);
        assert_eq!(m.state(), SessionState::Stopped);
        assert_eq!(m.apply(Input::Start), Effect::Ignore);

        let mut verified = machine(10, 3);
        verified.apply(Input::Start);
        verified.apply(Input::CheckCompleted { verified: true });
        assert_eq!(verified.apply(Input::Stop), Effect::Cancel);
        assert_eq!(verified.state(), SessionState::Stopped);
    }

    #[test]
    fn test_resend_resets_attempts_only_while_polling() {
        let mut m = machine(10, 3);
        m.apply(Input::Start);
        m.apply(Input::CheckCompleted { verified: false });
        m.apply(Input::CheckCompleted { verified: false });
        assert_eq!(m.apply(Input::ResendIssued), Effect::Continue);
        assert_eq!(m.attempt_count(), 0);

        let mut idle = machine(10, 3);
        assert_eq!(idle.apply(Input::ResendIssued), Effect::Ignore);
    }
}
