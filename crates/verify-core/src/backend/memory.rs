//! In-process backends with scripted behavior.
//!
//! Used by the test suite and by `verify simulate`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use verify_types::{GatewayError, ProfileFields, StoreError, UserProfile};

use super::{IdentityGateway, ProfileStore};

/// Outcome of one scripted `reload()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadStep {
    /// Reload succeeds, address still unconfirmed
    Pending,
    /// Reload succeeds, address confirmed
    Confirmed,
    /// Reload fails
    Fail(GatewayError),
}

/// Identity gateway driven by a queue of [`ReloadStep`]s.
///
/// Once the queue is drained every reload succeeds and reports the last
/// confirmed state.
#[derive(Debug, Default)]
pub struct MemoryIdentityGateway {
    steps: Mutex<VecDeque<ReloadStep>>,
    send_results: Mutex<VecDeque<Result<(), GatewayError>>>,
    verified: AtomicBool,
    hold: Mutex<Option<Arc<Notify>>>,
    reload_calls: AtomicU32,
    send_calls: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl MemoryIdentityGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_steps(steps: impl IntoIterator<Item = ReloadStep>) -> Arc<Self> {
        let gateway = Self::default();
        gateway.steps.lock().extend(steps);
        Arc::new(gateway)
    }

    /// Script `pending` unconfirmed reloads followed by a confirmed one.
    pub fn verify_after(pending: u32) -> Arc<Self> {
        Self::with_steps(
            std::iter::repeat(ReloadStep::Pending)
                .take(pending as usize)
                .chain(std::iter::once(ReloadStep::Confirmed)),
        )
    }

    pub fn push(&self, step: ReloadStep) {
        self.steps.lock().push_back(step);
    }

    /// Flip the provider-side flag, as if the user clicked the link.
    pub fn confirm(&self) {
        self.steps.lock().clear();
        self.verified.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_send(&self, error: GatewayError) {
        self.send_results.lock().push_back(Err(error));
    }

    /// Make every following reload wait until the returned handle is notified.
    pub fn hold_reloads(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold.lock() = Some(Arc::clone(&notify));
        notify
    }

    pub fn release_reloads(&self) {
        if let Some(notify) = self.hold.lock().take() {
            notify.notify_waiters();
        }
    }

    pub fn reload_calls(&self) -> u32 {
        self.reload_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> u32 {
        self.send_calls.load(Ordering::SeqCst)
    }

    /// Highest number of reloads observed running at the same time.
    pub fn max_concurrent_reloads(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityGateway for MemoryIdentityGateway {
    async fn reload(&self) -> Result<(), GatewayError> {
        self.reload_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let hold = self.hold.lock().clone();
        if let Some(notify) = hold {
            notify.notified().await;
        }

        let step = self.steps.lock().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match step {
            Some(ReloadStep::Pending) => {
                self.verified.store(false, Ordering::SeqCst);
                Ok(())
            },
            Some(ReloadStep::Confirmed) => {
                self.verified.store(true, Ordering::SeqCst);
                Ok(())
            },
            Some(ReloadStep::Fail(e)) => Err(e),
            None => Ok(()),
        }
    }

    fn is_verified(&self) -> bool {
        self.verified.load(Ordering::SeqCst)
    }

    async fn send_verification_email(&self) -> Result<(), GatewayError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        self.send_results.lock().pop_front().unwrap_or(Ok(()))
    }
}

/// Profile store that records every write.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<String, UserProfile>>,
    writes: Mutex<Vec<(String, ProfileFields)>>,
    failure: Mutex<Option<StoreError>>,
}

impl MemoryProfileStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, profile: UserProfile) {
        self.profiles.lock().insert(profile.uid.clone(), profile);
    }

    pub fn get(&self, subject_id: &str) -> Option<UserProfile> {
        self.profiles.lock().get(subject_id).cloned()
    }

    /// Fail every following write with `error`.
    pub fn fail_writes(&self, error: StoreError) {
        *self.failure.lock() = Some(error);
    }

    pub fn writes(&self) -> Vec<(String, ProfileFields)> {
        self.writes.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn update(&self, subject_id: &str, fields: &ProfileFields) -> Result<(), StoreError> {
        self.writes.lock().push((subject_id.to_string(), *fields));

        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        if let Some(profile) = self.profiles.lock().get_mut(subject_id) {
            profile.apply(fields);
        }
        Ok(())
    }
}
