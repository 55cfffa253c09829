//! # Verify Core
//!
//! Confirms an account's email address with an identity provider and mirrors
//! the result into the profile store.
//!
//! ## Architecture
//!
//! ```text
//! verify-core/src/
//! ├── verification/     # machine, poller, reconciler, resend throttle
//! ├── backend/          # IdentityGateway / ProfileStore traits + impls
//! │   ├── firebase/     # Identity Toolkit + Firestore REST
//! │   └── memory.rs     # scripted in-process backends
//! └── modules/          # logging and config file handling
//! ```
//!
//! The UI layer owns one [`VerificationPoller`] per screen visit and calls
//! [`VerificationPoller::stop`] on teardown.

#![allow(
    clippy::significant_drop_tightening,
    reason = "Mutex guards are scoped explicitly and never held across await points"
)]
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used))]

pub mod backend;
pub mod error;
pub mod modules;
pub mod verification;

// Re-export commonly used types
pub use backend::{IdentityGateway, ProfileStore};
pub use error::{AppError, AppResult};
pub use verification::{
    ManualCheck, ProfileReconciler, ReconcileOutcome, ResendOutcome, ResendThrottle,
    SessionMachine, VerificationPoller,
};
