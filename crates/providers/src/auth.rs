//! Credential pool and rotation cursor.
//!
//! [`CredentialPool`] holds the resolved API keys for one provider in a
//! fixed order. [`RotationCursor`] remembers which key last succeeded; it is
//! owned by the caller and passed by `&mut` to the executor, so it can be
//! persisted between invocations.

use bt_domain::config::AuthConfig;
use bt_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Ordered, non-empty list of API keys.
#[derive(Clone)]
pub struct CredentialPool {
    keys: Vec<String>,
}

impl CredentialPool {
    /// Build a pool from raw keys. Blank entries and duplicates are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable key remains.
    pub fn new(keys: Vec<String>) -> Result<Self> {
        let mut unique: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.trim().to_string();
            if !key.is_empty() && !unique.contains(&key) {
                unique.push(key);
            }
        }
        if unique.is_empty() {
            return Err(Error::Auth(
                "credential pool requires at least one API key".into(),
            ));
        }
        Ok(Self { keys: unique })
    }

    /// Build a pool from an [`AuthConfig`].
    ///
    /// Resolution order:
    /// 1. If `auth.keys` is non-empty, read each named env var; every value
    ///    may hold several keys separated by commas or newlines.
    /// 2. Else resolve the single `key` / keychain / `env` source, which may
    ///    itself be a separated list.
    pub fn from_auth_config(auth: &AuthConfig) -> Result<Self> {
        let raw = if !auth.keys.is_empty() {
            let mut collected = Vec::new();
            for env_name in &auth.keys {
                match std::env::var(env_name) {
                    Ok(val) if !val.trim().is_empty() => collected.extend(split_key_list(&val)),
                    _ => {
                        return Err(Error::Auth(format!(
                            "environment variable '{}' not set or empty \
                             (from auth.keys list)",
                            env_name
                        )));
                    }
                }
            }
            collected
        } else {
            split_key_list(&crate::util::resolve_api_key(auth)?)
        };

        Self::new(raw)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false for a constructed pool.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The credential at `index`, wrapped into range.
    pub fn credential(&self, index: usize) -> Credential {
        let index = index % self.keys.len();
        Credential {
            index,
            key: self.keys[index].clone(),
        }
    }

    /// Loggable suffix of the key at `index`.
    pub fn suffix(&self, index: usize) -> String {
        key_suffix(&self.keys[index % self.keys.len()])
    }
}

// Manual Debug impl to avoid leaking key values.
impl std::fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let suffixes: Vec<String> = self.keys.iter().map(|k| key_suffix(k)).collect();
        f.debug_struct("CredentialPool")
            .field("key_count", &self.keys.len())
            .field("suffixes", &suffixes)
            .finish()
    }
}

/// A key handed to one attempt, with its position in the pool.
#[derive(Clone)]
pub struct Credential {
    pub index: usize,
    pub key: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("index", &self.index)
            .field("key", &key_suffix(&self.key))
            .finish()
    }
}

/// Index of the key to try first. Updated to the succeeding key after
/// every successful call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationCursor {
    pub index: usize,
}

impl RotationCursor {
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    /// First index to try in a pool of `len` keys.
    pub fn start(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            self.index % len
        }
    }
}

/// Split a raw value holding one or more keys separated by commas or
/// newlines.
pub fn split_key_list(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == '\n' || c == '\r')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// Last four characters of a key, for logs (`…abcd`). Keys too short to
/// keep anything hidden are fully masked.
pub fn key_suffix(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "…****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("…{tail}")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
