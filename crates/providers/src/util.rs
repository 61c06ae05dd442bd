//! Shared utility functions for provider adapters.

use bt_domain::config::AuthConfig;
use bt_domain::error::{CredentialFailure, Error, Result};
use serde_json::Value;

/// Longest provider error message carried into an [`Error`].
const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`]. The request URL is stripped first since Gemini carries
/// the key in its query string.
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    let e = e.without_url();
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Classify a non-success response from its status and error body.
///
/// Both provider families wrap failures as `{"error": {...}}`: Gemini sets
/// `status` (e.g. `RESOURCE_EXHAUSTED`) and a `reason` detail, OpenAI sets a
/// string `code` (e.g. `invalid_api_key`). Anything that points at the key
/// becomes [`Error::Credential`]; the rest is [`Error::Provider`].
pub(crate) fn classify_http_failure(provider: &str, status: u16, body: &str) -> Error {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let err = parsed.as_ref().and_then(|v| v.get("error"));

    let message = err
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or(body);
    let message: String = message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
    let status_text = err
        .and_then(|e| e.get("status"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let code = err
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let lower = message.to_lowercase();

    let reason = if status == 429
        || status_text == "RESOURCE_EXHAUSTED"
        || matches!(code, "insufficient_quota" | "rate_limit_exceeded")
    {
        Some(CredentialFailure::QuotaExceeded)
    } else if lower.contains("expired") && (lower.contains("key") || lower.contains("token")) {
        Some(CredentialFailure::Expired)
    } else if status == 401
        || status_text == "UNAUTHENTICATED"
        || code == "invalid_api_key"
        || body.contains("API_KEY_INVALID")
        || lower.contains("api key not valid")
    {
        Some(CredentialFailure::Invalid)
    } else if status == 403 || status_text == "PERMISSION_DENIED" {
        Some(CredentialFailure::PermissionDenied)
    } else {
        None
    };

    match reason {
        Some(reason) => Error::Credential {
            provider: provider.to_string(),
            reason,
            status: Some(status),
            message,
        },
        None => Error::Provider {
            provider: provider.to_string(),
            status,
            message,
        },
    }
}

/// Classify an `{"error": {...}}` object that arrived inside a stream.
pub(crate) fn classify_stream_error(provider: &str, data: &str, error: &Value) -> Error {
    let status = error
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|c| u16::try_from(c).ok())
        .unwrap_or(500);
    classify_http_failure(provider, status, data)
}

/// Redact API key from URL for safe logging.
pub(crate) fn redact_url_key(url: &str) -> String {
    if let Some(idx) = url.find("key=") {
        let prefix = &url[..idx + 4];
        let rest = &url[idx + 4..];
        let end = rest.find('&').unwrap_or(rest.len());
        format!("{prefix}[REDACTED]{}", &rest[end..])
    } else {
        url.to_string()
    }
}

/// Resolve the API key from an [`AuthConfig`].
///
/// Precedence:
/// 1. `key` field (plaintext, warns)
/// 2. `service` + `account` → OS keychain via `keyring`
/// 3. `env` field (reads environment variable)
/// 4. Fallback for keychain mode: env var `{SERVICE}_{ACCOUNT}` uppercased
/// 5. Error
pub fn resolve_api_key(auth: &AuthConfig) -> Result<String> {
    if let Some(ref key) = auth.key {
        tracing::warn!(
            "API key loaded from plaintext config field 'key'; \
             prefer 'env', 'keys' or the keychain instead"
        );
        return Ok(key.clone());
    }

    if let (Some(ref service), Some(ref account)) = (&auth.service, &auth.account) {
        match resolve_from_keychain(service, account) {
            Ok(secret) => return Ok(secret),
            Err(e) => {
                tracing::warn!(
                    service = %service,
                    account = %account,
                    error = %e,
                    "keychain lookup failed, falling through to env"
                );
            }
        }
    }

    if let Some(ref env_var) = auth.env {
        return std::env::var(env_var).map_err(|_| {
            Error::Auth(format!(
                "environment variable '{}' not set or not valid UTF-8",
                env_var
            ))
        });
    }

    // Headless fallback: {SERVICE}_{ACCOUNT} uppercased
    if let (Some(ref service), Some(ref account)) = (&auth.service, &auth.account) {
        let fallback_var = keychain_fallback_env_name(service, account);
        if let Ok(val) = std::env::var(&fallback_var) {
            tracing::info!(
                env_var = %fallback_var,
                "API key resolved from keychain headless fallback env var"
            );
            return Ok(val);
        }
    }

    Err(Error::Auth(
        "no API key configured: set 'keys', 'key', 'env', or keychain \
         'service'+'account' in the provider auth section"
            .into(),
    ))
}

/// Try to read a secret from the OS keychain.
///
/// Returns an error on headless systems where no keychain daemon is available.
pub fn resolve_from_keychain(service: &str, account: &str) -> Result<String> {
    let entry = keyring::Entry::new(service, account)
        .map_err(|e| Error::Auth(format!("keyring entry creation failed: {e}")))?;
    entry
        .get_password()
        .map_err(|e| Error::Auth(format!("keyring get_password failed: {e}")))
}

/// Build the headless fallback env var name for a keychain service/account.
///
/// Example: `("banter", "gemini-api-key")` → `"BANTER_GEMINI_API_KEY"`.
pub fn keychain_fallback_env_name(service: &str, account: &str) -> String {
    format!(
        "{}_{}",
        service.to_uppercase().replace('-', "_"),
        account.to_uppercase().replace('-', "_"),
    )
}
