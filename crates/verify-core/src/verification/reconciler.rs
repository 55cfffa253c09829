//! Mirrors a confirmed verification into the profile store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use verify_types::ProfileFields;

use crate::backend::ProfileStore;
use crate::modules::logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Flag written
    Written,
    /// Write failed; logged and swallowed
    WriteFailed,
    /// Another call already handled this session
    AlreadyDone,
}

/// Sole writer of `emailVerified`. One instance per session.
///
/// The write is a best-effort mirror: the identity provider stays the source
/// of truth, so a failed write never blocks the caller.
pub struct ProfileReconciler {
    store: Arc<dyn ProfileStore>,
    claimed: AtomicBool,
}

impl ProfileReconciler {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store, claimed: AtomicBool::new(false) }
    }

    pub async fn mark_verified(&self, subject_id: &str) -> ReconcileOutcome {
        if self.claimed.swap(true, Ordering::SeqCst) {
            tracing::debug!("[Reconciler] {} already reconciled, skipping write", subject_id);
            return ReconcileOutcome::AlreadyDone;
        }

        match self.store.update(subject_id, &ProfileFields::VERIFIED).await {
            Ok(()) => {
                logger::log_info(&format!("[Reconciler] Profile {} marked verified", subject_id));
                ReconcileOutcome::Written
            },
            Err(e) => {
                logger::log_warn(&format!(
                    "[Reconciler] Failed to mirror verification for {}: {}",
                    subject_id, e
                ));
                ReconcileOutcome::WriteFailed
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryProfileStore;
    use verify_types::{StoreError, UserProfile, UserType};

    #[tokio::test]
    async fn test_writes_flag_once() {
        let store = MemoryProfileStore::new();
        store.insert(UserProfile::new("uid-1", "a@example.com", UserType::User, None));
        let reconciler = ProfileReconciler::new(store.clone());

        assert_eq!(reconciler.mark_verified("uid-1").await, ReconcileOutcome::Written);
        assert_eq!(reconciler.mark_verified("uid-1").await, ReconcileOutcome::AlreadyDone);

        assert_eq!(store.writes(), vec![("uid-1".to_string(), ProfileFields::VERIFIED)]);
        assert!(store.get("uid-1").unwrap().email_verified);
    }

    #[tokio::test]
    async fn test_concurrent_calls_write_once() {
        let store = MemoryProfileStore::new();
        let reconciler = ProfileReconciler::new(store.clone());

        let (a, b) = tokio::join!(reconciler.mark_verified("uid-1"), reconciler.mark_verified("uid-1"));

        assert_eq!(store.write_count(), 1);
        assert!(
            matches!((a, b), (ReconcileOutcome::Written, ReconcileOutcome::AlreadyDone))
                || matches!((a, b), (ReconcileOutcome::AlreadyDone, ReconcileOutcome::Written))
        );
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let store = MemoryProfileStore::new();
        store.fail_writes(StoreError::unavailable("offline"));
        let reconciler = ProfileReconciler::new(store.clone());

        assert_eq!(reconciler.mark_verified("uid-1").await, ReconcileOutcome::WriteFailed);
        assert_eq!(reconciler.mark_verified("uid-1").await, ReconcileOutcome::AlreadyDone);
        assert_eq!(store.write_count(), 1);
    }
}
