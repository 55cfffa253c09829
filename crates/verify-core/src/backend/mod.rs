//! Collaborator seams: the identity provider and the profile store.
//!
//! Any concrete backend (Firebase, Supabase, a custom REST API) implements
//! these two traits and is injected into the poller at construction.

pub mod firebase;
pub mod memory;

use async_trait::async_trait;
use verify_types::{GatewayError, ProfileFields, StoreError};

pub use firebase::{FirebaseIdentityGateway, FirestoreProfileStore};
pub use memory::{MemoryIdentityGateway, MemoryProfileStore, ReloadStep};

/// Identity provider capability for the signed-in account.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Refresh the cached verification status from the provider.
    async fn reload(&self) -> Result<(), GatewayError>;

    /// Read the status cached by the last successful `reload`.
    fn is_verified(&self) -> bool;

    /// Ask the provider to send a new verification message.
    async fn send_verification_email(&self) -> Result<(), GatewayError>;
}

/// Persisted profile capability.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn update(&self, subject_id: &str, fields: &ProfileFields) -> Result<(), StoreError>;
}
