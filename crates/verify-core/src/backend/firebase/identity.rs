//! Identity Toolkit gateway.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use verify_types::GatewayError;

use super::{build_client, identity_error, normalize_base, retry_after, transport_error};
use crate::backend::IdentityGateway;
use crate::error::AppResult;

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email_verified: bool,
}

/// Gateway for a signed-in Firebase account, addressed by its ID token.
pub struct FirebaseIdentityGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    id_token: RwLock<String>,
    verified: AtomicBool,
}

impl FirebaseIdentityGateway {
    pub fn new(api_key: impl Into<String>, id_token: impl Into<String>) -> AppResult<Self> {
        Self::with_base_url(super::IDENTITY_TOOLKIT_URL, api_key, id_token)
    }

    /// Point at a different host (emulator, test server).
    pub fn with_base_url(
        base_url: &str,
        api_key: impl Into<String>,
        id_token: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: normalize_base(base_url)?,
            api_key: api_key.into(),
            id_token: RwLock::new(id_token.into()),
            verified: AtomicBool::new(false),
        })
    }

    /// Swap in a refreshed ID token.
    pub fn set_id_token(&self, id_token: impl Into<String>) {
        *self.id_token.write() = id_token.into();
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> Result<String, GatewayError> {
        let url = format!("{}/v1/accounts:{}", self.base_url, method);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = resp.status();
        let retry_after_secs = retry_after(resp.headers());
        let text = resp.text().await.map_err(|e| transport_error(&e))?;

        if status.is_success() {
            Ok(text)
        } else {
            let error = identity_error(status.as_u16(), retry_after_secs, &text);
            tracing::debug!("[Firebase] accounts:{} failed ({}): {}", method, status, error);
            Err(error)
        }
    }
}

#[async_trait]
impl IdentityGateway for FirebaseIdentityGateway {
    async fn reload(&self) -> Result<(), GatewayError> {
        let id_token = self.id_token.read().clone();
        let text = self.call("lookup", serde_json::json!({ "idToken": id_token })).await?;

        let lookup: LookupResponse = serde_json::from_str(&text)
            .map_err(|e| GatewayError::Provider { code: format!("MALFORMED_LOOKUP: {}", e) })?;
        let user = lookup.users.into_iter().next().ok_or(GatewayError::AccountNotFound)?;

        tracing::trace!("[Firebase] lookup {} emailVerified={}", user.local_id, user.email_verified);
        self.verified.store(user.email_verified, Ordering::SeqCst);
        Ok(())
    }

    fn is_verified(&self) -> bool {
        self.verified.load(Ordering::SeqCst)
    }

    async fn send_verification_email(&self) -> Result<(), GatewayError> {
        let id_token = self.id_token.read().clone();
        self.call(
            "sendOobCode",
            serde_json::json!({ "requestType": "VERIFY_EMAIL", "idToken": id_token }),
        )
        .await
        .map(|_| ())
    }
}
