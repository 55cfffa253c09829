//! Firebase REST backends.
//!
//! - `identity` - Identity Toolkit (`accounts:lookup`, `accounts:sendOobCode`)
//! - `firestore` - Firestore document PATCH for the profile mirror

mod firestore;
mod identity;

pub use firestore::FirestoreProfileStore;
pub use identity::FirebaseIdentityGateway;

use serde::Deserialize;
use std::time::Duration;
use verify_types::GatewayError;

use crate::error::AppResult;

pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";
pub const FIRESTORE_URL: &str = "https://firestore.googleapis.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

pub(crate) fn build_client() -> AppResult<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Validate a base URL and strip the trailing slash.
pub(crate) fn normalize_base(base_url: &str) -> AppResult<String> {
    let parsed = url::Url::parse(base_url)?;
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

pub(crate) fn transport_error(e: &reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::network(e.to_string())
    }
}

/// Leading error code of an Identity Toolkit message, e.g.
/// `"TOO_MANY_ATTEMPTS_TRY_LATER : Try again later."`.
fn error_code(body: &str) -> String {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_default();
    message.split([' ', ':']).next().unwrap_or_default().trim().to_string()
}

/// Map a non-success Identity Toolkit response onto the gateway taxonomy.
pub(crate) fn identity_error(status: u16, retry_after_secs: Option<u64>, body: &str) -> GatewayError {
    if status == 429 {
        return GatewayError::RateLimited { retry_after_secs };
    }
    if status >= 500 {
        return GatewayError::Unavailable { status };
    }

    let code = error_code(body);
    match code.as_str() {
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => {
            GatewayError::SessionRevoked { reason: code }
        },
        "USER_NOT_FOUND" => GatewayError::AccountNotFound,
        "USER_DISABLED" => GatewayError::AccountDisabled,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => GatewayError::RateLimited { retry_after_secs },
        "" => GatewayError::Provider { code: format!("HTTP_{}", status) },
        _ => GatewayError::Provider { code },
    }
}

pub(crate) fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(message: &str) -> String {
        serde_json::json!({"error": {"code": 400, "message": message}}).to_string()
    }

    #[test]
    fn test_identity_error_mapping() {
        assert_eq!(
            identity_error(400, None, &body("TOKEN_EXPIRED")),
            GatewayError::SessionRevoked { reason: "TOKEN_EXPIRED".to_string() }
        );
        assert_eq!(identity_error(400, None, &body("USER_NOT_FOUND")), GatewayError::AccountNotFound);
        assert_eq!(identity_error(400, None, &body("USER_DISABLED")), GatewayError::AccountDisabled);
        assert_eq!(
            identity_error(400, Some(5), &body("TOO_MANY_ATTEMPTS_TRY_LATER : Try again later.")),
            GatewayError::RateLimited { retry_after_secs: Some(5) }
        );
        assert_eq!(
            identity_error(503, None, "upstream down"),
            GatewayError::Unavailable { status: 503 }
        );
        assert_eq!(
            identity_error(403, None, "<html>"),
            GatewayError::Provider { code: "HTTP_403".to_string() }
        );
    }

    #[test]
    fn test_normalize_base() {
        assert_eq!(normalize_base("http://127.0.0.1:9099/").unwrap(), "http://127.0.0.1:9099");
        assert!(normalize_base("not a url").is_err());
    }
}
