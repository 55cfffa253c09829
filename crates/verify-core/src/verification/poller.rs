//! Verification poller: drives a [`SessionMachine`] from tokio timers.
//!
//! One poller per screen visit. The cadence task and every async result carry
//! the generation they were started under; `stop()` bumps the generation, so
//! anything that completes afterwards is dropped without a state change or an
//! event.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use verify_types::{
    ErrorClass, GatewayError, SessionSnapshot, SessionState, VerificationConfig,
    VerificationEvent,
};

use super::machine::{Effect, Input, SessionMachine};
use super::reconciler::ProfileReconciler;
use super::throttle::ResendThrottle;
use crate::backend::{IdentityGateway, ProfileStore};
use crate::modules::logger;

const EVENT_CAPACITY: usize = 16;

/// Result of a manual "I've verified" check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualCheck {
    /// Confirmed; the flag was mirrored and `Verified` emitted
    Verified,
    /// Provider still reports the address unconfirmed
    NotVerified,
    /// Another check is in flight; nothing was sent
    Busy,
    /// Session already verified or stopped
    Inactive,
}

/// Result of a resend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent,
    /// Rejected without contacting the provider
    CoolingDown { remaining_seconds: u64 },
    /// A resend is already in flight
    InFlight,
    /// Session already verified or stopped
    Inactive,
}

/// Resets the flag when dropped, including when the owning future is cancelled.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::SeqCst)).then_some(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct Inner {
    subject_id: String,
    config: VerificationConfig,
    gateway: Arc<dyn IdentityGateway>,
    reconciler: ProfileReconciler,
    throttle: ResendThrottle,
    machine: Mutex<SessionMachine>,
    generation: AtomicU64,
    checking: AtomicBool,
    resending: AtomicBool,
    suppressed_until: Mutex<Option<Instant>>,
    cadence: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<VerificationEvent>,
}

/// Polls the identity provider until the subject's address is confirmed.
///
/// The generation is re-checked right before every `reload()`. On a
/// multi-thread runtime a reload that was already dispatched when `stop()`
/// ran may still reach the provider; its result is discarded.
pub struct VerificationPoller {
    inner: Arc<Inner>,
}

impl VerificationPoller {
    pub fn new(
        subject_id: impl Into<String>,
        config: VerificationConfig,
        gateway: Arc<dyn IdentityGateway>,
        store: Arc<dyn ProfileStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Inner {
            subject_id: subject_id.into(),
            machine: Mutex::new(SessionMachine::new(&config)),
            throttle: ResendThrottle::new(config.resend_cooldown()),
            reconciler: ProfileReconciler::new(store),
            config,
            gateway,
            generation: AtomicU64::new(0),
            checking: AtomicBool::new(false),
            resending: AtomicBool::new(false),
            suppressed_until: Mutex::new(None),
            cadence: Mutex::new(None),
            events,
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn subject_id(&self) -> &str {
        &self.inner.subject_id
    }

    /// Begin polling. Returns false unless the session was idle.
    pub fn start(&self) -> bool {
        let (effect, generation) = self.inner.apply(Input::Start);
        match effect {
            Effect::Schedule(delay) => {
                tracing::info!(
                    "[Verification] Polling {} every {:?} (first check in {:?})",
                    self.inner.subject_id,
                    self.inner.config.poll_interval(),
                    delay
                );
                spawn_cadence(&self.inner, generation, delay);
                true
            },
            _ => false,
        }
    }

    /// Tear down the session. Idempotent; no gateway call or event happens
    /// after this returns.
    pub fn stop(&self) {
        let effect = {
            let mut machine = self.inner.machine.lock();
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            machine.apply(Input::Stop)
        };
        self.inner.cancel_cadence();
        self.inner.throttle.cancel();

        if effect == Effect::Cancel {
            tracing::debug!("[Verification] Session for {} stopped", self.inner.subject_id);
        }
    }

    /// Resume polling after a timeout notice. Returns false unless timed out.
    pub fn acknowledge_timeout(&self) -> bool {
        let (effect, generation) = self.inner.apply(Input::Acknowledge);
        match effect {
            Effect::Schedule(delay) => {
                tracing::info!("[Verification] Timeout acknowledged, resuming in {:?}", delay);
                spawn_cadence(&self.inner, generation, delay);
                true
            },
            _ => false,
        }
    }

    /// One immediate reload+check outside the cadence.
    ///
    /// Leaves attempt and retry counters alone. A failure is returned to the
    /// caller and does not change the session state.
    pub async fn check_now(&self) -> Result<ManualCheck, GatewayError> {
        let inner = &self.inner;
        if inner.machine.lock().state().is_terminal() {
            return Ok(ManualCheck::Inactive);
        }
        let Some(guard) = InFlightGuard::acquire(&inner.checking) else {
            tracing::debug!("[Verification] Check already in flight, ignoring manual check");
            return Ok(ManualCheck::Busy);
        };
        let generation = inner.generation.load(Ordering::SeqCst);

        let verified = match inner.check_gateway(generation).await {
            Ok(Some(verified)) => verified,
            Ok(None) => return Ok(ManualCheck::Inactive),
            Err(e) => {
                tracing::warn!("[Verification] Manual check for {} failed: {}", inner.subject_id, e);
                return Err(e);
            },
        };
        if !verified {
            return Ok(ManualCheck::NotVerified);
        }

        let effect = {
            let mut machine = inner.machine.lock();
            if !inner.is_current(generation) {
                return Ok(ManualCheck::Inactive);
            }
            machine.apply(Input::ManualConfirmed)
        };
        drop(guard);

        if effect != Effect::Reconcile {
            return Ok(ManualCheck::Inactive);
        }
        inner.cancel_cadence();
        inner.finish_verified(generation).await;
        Ok(ManualCheck::Verified)
    }

    /// Re-send the verification message, subject to the cooldown.
    ///
    /// Scheduled checks are skipped while the send is in flight and for the
    /// suppression window after it succeeds.
    pub async fn resend(&self) -> Result<ResendOutcome, GatewayError> {
        let inner = &self.inner;
        if inner.machine.lock().state().is_terminal() {
            return Ok(ResendOutcome::Inactive);
        }
        let remaining_seconds = inner.throttle.remaining_seconds();
        if remaining_seconds > 0 {
            return Ok(ResendOutcome::CoolingDown { remaining_seconds });
        }
        let Some(_guard) = InFlightGuard::acquire(&inner.resending) else {
            return Ok(ResendOutcome::InFlight);
        };
        let generation = inner.generation.load(Ordering::SeqCst);

        inner.suppress_for(inner.config.resend_suppress());
        match inner.gateway.send_verification_email().await {
            Ok(()) => {
                if !inner.is_current(generation) {
                    return Ok(ResendOutcome::Inactive);
                }
                inner.throttle.on_resend_issued();
                inner.suppress_for(inner.config.resend_suppress());
                inner.apply(Input::ResendIssued);
                tracing::info!("[Verification] Verification email re-sent to {}", inner.subject_id);
                Ok(ResendOutcome::Sent)
            },
            Err(e) => {
                *inner.suppressed_until.lock() = None;
                tracing::warn!("[Verification] Resend for {} failed: {}", inner.subject_id, e);
                Err(e)
            },
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.machine.lock().state()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (state, attempt_count) = {
            let machine = self.inner.machine.lock();
            (machine.state(), machine.attempt_count())
        };
        SessionSnapshot {
            subject_id: self.inner.subject_id.clone(),
            state,
            attempt_count,
            resend_cooldown_remaining: self.inner.throttle.remaining_seconds(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VerificationEvent> {
        self.inner.events.subscribe()
    }

    /// Resend countdown, one update per second while cooling down.
    pub fn subscribe_cooldown(&self) -> watch::Receiver<u64> {
        self.inner.throttle.subscribe()
    }
}

impl Drop for VerificationPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Inner {
    fn apply(&self, input: Input) -> (Effect, u64) {
        let mut machine = self.machine.lock();
        let effect = machine.apply(input);
        (effect, self.generation.load(Ordering::SeqCst))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn emit(&self, generation: u64, event: VerificationEvent) {
        if self.is_current(generation) {
            let _ = self.events.send(event);
        }
    }

    fn cancel_cadence(&self) {
        if let Some(handle) = self.cadence.lock().take() {
            handle.abort();
        }
    }

    fn suppress_for(&self, window: Duration) {
        *self.suppressed_until.lock() = Some(Instant::now() + window);
    }

    fn is_suppressed(&self) -> bool {
        self.suppressed_until.lock().is_some_and(|until| Instant::now() < until)
    }

    /// Reload and read the flag. `None` when the session was stopped before
    /// the reload was issued or while it ran.
    async fn check_gateway(&self, generation: u64) -> Result<Option<bool>, GatewayError> {
        if !self.is_current(generation) {
            return Ok(None);
        }
        self.gateway.reload().await?;
        if !self.is_current(generation) {
            return Ok(None);
        }
        Ok(Some(self.gateway.is_verified()))
    }

    async fn finish_verified(&self, generation: u64) {
        tracing::info!("[Verification] Email confirmed for {}", self.subject_id);
        self.throttle.cancel();
        self.reconciler.mark_verified(&self.subject_id).await;
        self.emit(generation, VerificationEvent::Verified { subject_id: self.subject_id.clone() });
    }

    async fn run_cadence(self: Arc<Self>, generation: u64, first_delay: Duration) {
        let mut delay = first_delay;
        loop {
            tokio::time::sleep(delay).await;
            delay = self.config.poll_interval();

            if !self.is_current(generation) {
                return;
            }
            if self.is_suppressed() {
                tracing::debug!("[Verification] Check suppressed after resend");
                continue;
            }
            let Some(guard) = InFlightGuard::acquire(&self.checking) else {
                tracing::debug!("[Verification] Manual check in flight, skipping tick");
                continue;
            };

            let result = match self.check_gateway(generation).await {
                Ok(Some(verified)) => Ok(verified),
                Ok(None) => return,
                Err(e) => Err(e),
            };
            let (effect, attempts) = {
                let mut machine = self.machine.lock();
                if !self.is_current(generation) {
                    return;
                }
                let input = match &result {
                    Ok(verified) => Input::CheckCompleted { verified: *verified },
                    Err(e) => Input::CheckFailed(e.class()),
                };
                (machine.apply(input), machine.attempt_count())
            };
            drop(guard);

            match effect {
                Effect::Continue => {
                    if let Err(e) = &result {
                        tracing::debug!("[Verification] Transient failure, retrying: {}", e);
                    } else {
                        tracing::debug!(
                            "[Verification] {} not verified yet (attempt {}/{})",
                            self.subject_id,
                            attempts,
                            self.config.max_attempts
                        );
                    }
                },
                Effect::Backoff(wait) => {
                    tracing::warn!(
                        "[Verification] Retries exhausted for {}, backing off {:?}",
                        self.subject_id,
                        wait
                    );
                    if let Err(e) = result {
                        self.emit(
                            generation,
                            VerificationEvent::Error { class: ErrorClass::Transient, error: e },
                        );
                    }
                    delay = wait;
                },
                Effect::Reconcile => {
                    self.finish_verified(generation).await;
                    return;
                },
                Effect::TimedOut => {
                    tracing::info!(
                        "[Verification] {} still unverified after {} checks",
                        self.subject_id,
                        attempts
                    );
                    self.emit(generation, VerificationEvent::TimedOut { attempts });
                    return;
                },
                Effect::Fatal => {
                    if let Err(e) = result {
                        logger::log_error(&format!(
                            "[Verification] Polling for {} stopped: {}",
                            self.subject_id, e
                        ));
                        self.throttle.cancel();
                        self.emit(
                            generation,
                            VerificationEvent::Error { class: ErrorClass::Fatal, error: e },
                        );
                    }
                    return;
                },
                Effect::Schedule(_) | Effect::Cancel | Effect::Ignore => return,
            }
        }
    }
}

fn spawn_cadence(inner: &Arc<Inner>, generation: u64, first_delay: Duration) {
    let task = Arc::clone(inner).run_cadence(generation, first_delay);
    let handle = tokio::spawn(task);
    if let Some(previous) = inner.cadence.lock().replace(handle) {
        previous.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryIdentityGateway, MemoryProfileStore};

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_skips_reload() {
        let gateway = MemoryIdentityGateway::verify_after(0);
        let store = MemoryProfileStore::new();
        let poller = VerificationPoller::new(
            "uid-1",
            VerificationConfig::default(),
            gateway.clone(),
            store.clone(),
        );
        assert!(poller.start());
        let generation = poller.inner.generation.load(Ordering::SeqCst);

        poller.stop();
        let result = poller.inner.check_gateway(generation).await.unwrap();

        assert_eq!(result, None);
        assert_eq!(gateway.reload_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_reload_discards_result() {
        let gateway = MemoryIdentityGateway::verify_after(0);
        let hold = gateway.hold_reloads();
        let store = MemoryProfileStore::new();
        let poller =
            VerificationPoller::new("uid-1", VerificationConfig::default(), gateway.clone(), store);
        let generation = poller.inner.generation.load(Ordering::SeqCst);

        let check = {
            let inner = Arc::clone(&poller.inner);
            tokio::spawn(async move { inner.check_gateway(generation).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(gateway.reload_calls(), 1);

        poller.stop();
        hold.notify_waiters();

        assert_eq!(check.await.unwrap().unwrap(), None);
        assert!(gateway.is_verified());
    }
}
