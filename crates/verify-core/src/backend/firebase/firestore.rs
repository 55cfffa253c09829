//! Firestore profile mirror.

use async_trait::async_trait;
use parking_lot::RwLock;
use verify_types::{ProfileFields, StoreError};

use super::{build_client, normalize_base};
use crate::backend::ProfileStore;
use crate::error::AppResult;

const PROFILE_COLLECTION: &str = "users";

/// Writes profile patches into `users/{uid}` documents.
pub struct FirestoreProfileStore {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    id_token: RwLock<String>,
}

impl FirestoreProfileStore {
    pub fn new(project_id: impl Into<String>, id_token: impl Into<String>) -> AppResult<Self> {
        Self::with_base_url(super::FIRESTORE_URL, project_id, id_token)
    }

    pub fn with_base_url(
        base_url: &str,
        project_id: impl Into<String>,
        id_token: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: normalize_base(base_url)?,
            project_id: project_id.into(),
            id_token: RwLock::new(id_token.into()),
        })
    }

    pub fn set_id_token(&self, id_token: impl Into<String>) {
        *self.id_token.write() = id_token.into();
    }

    fn document_url(&self, subject_id: &str) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}/{}",
            self.base_url, self.project_id, PROFILE_COLLECTION, subject_id
        )
    }
}

#[async_trait]
impl ProfileStore for FirestoreProfileStore {
    async fn update(&self, subject_id: &str, fields: &ProfileFields) -> Result<(), StoreError> {
        let body = serde_json::json!({
            "fields": {
                "emailVerified": { "booleanValue": fields.email_verified }
            }
        });
        let id_token = self.id_token.read().clone();

        let resp = self
            .client
            .patch(self.document_url(subject_id))
            .query(&[
                ("updateMask.fieldPaths", "emailVerified"),
                ("currentDocument.exists", "true"),
            ])
            .bearer_auth(id_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let message = resp.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 | 403 => StoreError::PermissionDenied { subject_id: subject_id.to_string() },
            404 => StoreError::NotFound { subject_id: subject_id.to_string() },
            429 | 500..=599 => StoreError::unavailable(format!("HTTP {}: {}", status, message)),
            _ => StoreError::Rejected { message: format!("HTTP {}: {}", status, message) },
        })
    }
}
