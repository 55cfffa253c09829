//! # Verify Types
//!
//! Core types, models, and error definitions for the email verification core.
//!
//! - **`error`** - Typed error hierarchy for the identity gateway, profile store, and configuration
//! - **`models`** - Domain models (session state, snapshot, events, profile, config)
//!
//! ## Architecture Role
//!
//! `verify-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!        verify-types (this crate)
//!               │
//!               ▼
//!          verify-core
//!               │
//!               ▼
//!          verify-cli
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for logs and CLI output
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ConfigError, ErrorClass, GatewayError, Result, StoreError, TypedError};

// Re-export core model types
pub use models::{
    ProfileFields, SessionSnapshot, SessionState, UserProfile, UserType, VerificationConfig,
    VerificationEvent,
};
