//! Domain models.

pub mod config;
pub mod profile;
pub mod session;

pub use config::VerificationConfig;
pub use profile::{ProfileFields, UserProfile, UserType};
pub use session::{SessionSnapshot, SessionState, VerificationEvent};
