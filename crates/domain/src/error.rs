use serde::{Deserialize, Serialize};
use std::fmt;

/// Shared error type used across all Banter crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider rejected the API key itself.
    #[error("provider {provider} rejected credential ({reason}): {message}")]
    Credential {
        provider: String,
        reason: CredentialFailure,
        status: Option<u16>,
        message: String,
    },

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// Non-success HTTP status that is not attributable to the credential.
    #[error("provider {provider}: HTTP {status} - {message}")]
    Provider {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("content blocked by {provider}: {block}")]
    ContentPolicy {
        provider: String,
        block: PolicyBlock,
    },

    #[error("protocol: {0}")]
    Protocol(String),

    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a provider refused an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialFailure {
    Invalid,
    Expired,
    QuotaExceeded,
    PermissionDenied,
}

impl fmt::Display for CredentialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CredentialFailure::Invalid => "invalid key",
            CredentialFailure::Expired => "expired key",
            CredentialFailure::QuotaExceeded => "quota exceeded",
            CredentialFailure::PermissionDenied => "permission denied",
        };
        f.write_str(s)
    }
}

/// Why the provider refused to produce (or finish) content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyBlock {
    Safety,
    Recitation,
    ContentFilter,
    MaxTokens,
}

impl fmt::Display for PolicyBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PolicyBlock::Safety => "safety",
            PolicyBlock::Recitation => "recitation",
            PolicyBlock::ContentFilter => "content filter",
            PolicyBlock::MaxTokens => "max tokens",
        };
        f.write_str(s)
    }
}

/// Coarse error taxonomy used for user-facing rendering and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Credential,
    Transport,
    ContentPolicy,
    Protocol,
    Unknown,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Credential { .. } | Error::Auth(_) => ErrorKind::Credential,
            Error::Http(_) | Error::Timeout(_) | Error::Provider { .. } => ErrorKind::Transport,
            Error::ContentPolicy { .. } => ErrorKind::ContentPolicy,
            Error::Json(_) | Error::Protocol(_) => ErrorKind::Protocol,
            Error::Io(_)
            | Error::PayloadTooLarge { .. }
            | Error::Config(_)
            | Error::Other(_) => ErrorKind::Unknown,
        }
    }

    /// HTTP status attached to the error, if the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Credential { status, .. } => *status,
            Error::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }
}
