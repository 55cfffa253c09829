//! Email verification session.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  VerificationPoller                                       │
//! │  ├── machine: SessionMachine   (pure transitions)         │
//! │  ├── cadence: JoinHandle       (one timer task)           │
//! │  ├── reconciler: ProfileReconciler (sole flag writer)     │
//! │  └── throttle: ResendThrottle  (resend cooldown)          │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod machine;
mod poller;
mod reconciler;
mod throttle;


pub use machine::{Effect, Input, SessionMachine};
pub use poller::{ManualCheck, ResendOutcome, VerificationPoller};
pub use reconciler::{ProfileReconciler, ReconcileOutcome};
pub use throttle::ResendThrottle;
