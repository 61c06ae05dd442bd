use crate::locale::Locale;
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Global chat settings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Id of the entry in `[[providers]]` used for chat.
    #[serde(default = "d_provider")]
    pub provider: String,
    /// Model override. When `None`, the provider's default model is used.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Only the newest `context_length` messages are considered for a request.
    #[serde(default)]
    pub context_length: Option<usize>,
    /// Replaces the provider's configured base URL (e.g. a relay or proxy).
    #[serde(default)]
    pub base_url_override: Option<String>,
    /// Language for user-facing error messages.
    #[serde(default)]
    pub locale: Locale,
    #[serde(default)]
    pub search: SearchSettings,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            provider: d_provider(),
            model: None,
            temperature: d_temperature(),
            max_tokens: None,
            context_length: None,
            base_url_override: None,
            locale: Locale::default(),
            search: SearchSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchSettings {
    /// Attach the web-search tool to every request.
    #[serde(default)]
    pub enabled_by_default: bool,
    /// Add the search-optimizer directive when search is on by default.
    #[serde(default)]
    pub optimizer: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Persona
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A persona: custom system prompt, optional parameter overrides, memories.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Persona {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub system_prompt: String,
    /// Takes precedence over `ChatSettings::temperature` when set.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Takes precedence over `ChatSettings::max_tokens` when set.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub memory_enabled: bool,
    #[serde(default)]
    pub memories: Vec<String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_provider() -> String {
    "gemini".into()
}
fn d_temperature() -> f32 {
    0.7
}
