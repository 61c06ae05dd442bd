mod budget;
mod chat;
mod llm;

pub use budget::*;
pub use chat::*;
pub use llm::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub persona: Persona,
    #[serde(default)]
    pub title: TitleConfig,
    /// Registered LLM providers (adding a provider = adding config).
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Config {
    pub fn provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// The provider selected by `chat.provider`.
    pub fn chat_provider(&self) -> Option<&ProviderConfig> {
        self.provider(&self.chat.provider)
    }

    /// Apply `BANTER_*` environment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_with(|name| std::env::var(name).ok());
    }

    /// Apply environment overrides using an arbitrary lookup.
    ///
    /// - `BANTER_<ID>_BASE_URL` replaces a provider's base URL
    /// - `BANTER_<ID>_MODELS` replaces its model allow-list (comma-separated)
    /// - `BANTER_TITLE_API_URL`, `BANTER_TITLE_API_KEY`, `BANTER_TITLE_MODEL`
    ///   configure the dedicated title endpoint
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for provider in &mut self.providers {
            let prefix = env_prefix(&provider.id);
            if let Some(url) = lookup(&format!("{prefix}_BASE_URL")).filter(|v| !v.is_empty()) {
                tracing::debug!(provider_id = %provider.id, "base_url overridden from env");
                provider.base_url = url;
            }
            if let Some(models) = lookup(&format!("{prefix}_MODELS")) {
                provider.models = models
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect();
            }
        }

        if let Some(v) = lookup("BANTER_TITLE_API_URL") {
            self.title.api_url = Some(v);
        }
        if let Some(v) = lookup("BANTER_TITLE_API_KEY") {
            self.title.api_key = Some(v);
        }
        if let Some(v) = lookup("BANTER_TITLE_MODEL") {
            self.title.model = Some(v);
        }
    }
}

/// `BANTER_` + provider id uppercased with `-` mapped to `_`.
fn env_prefix(provider_id: &str) -> String {
    format!("BANTER_{}", provider_id.to_uppercase().replace('-', "_"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.providers.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "providers".into(),
                message: "no LLM providers configured".into(),
            });
        } else if self.chat_provider().is_none() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "chat.provider".into(),
                message: format!("no provider with id '{}'", self.chat.provider),
            });
        }

        for (i, provider) in self.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("providers[{i}].id"),
                    message: "provider id must not be empty".into(),
                });
            }
            if provider.base_url.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("providers[{i}].base_url"),
                    message: "provider base_url must not be empty".into(),
                });
            }
            if let Some(model) = &provider.default_model {
                if !provider.allows_model(model) {
                    errors.push(ConfigError {
                        severity: ConfigSeverity::Warning,
                        field: format!("providers[{i}].default_model"),
                        message: format!("'{model}' is not in the provider's model allow-list"),
                    });
                }
            }
        }

        if !(0.0..=2.0).contains(&self.chat.temperature) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "chat.temperature".into(),
                message: "temperature outside 0.0 – 2.0 may be rejected by providers".into(),
            });
        }

        if self.budget.inflation_factor < 1.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "budget.inflation_factor".into(),
                message: "inflation factor must be at least 1.0".into(),
            });
        }

        if self.budget.max_payload_bytes == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "budget.max_payload_bytes".into(),
                message: "max_payload_bytes must be greater than 0".into(),
            });
        }

        let title_fields = [&self.title.api_url, &self.title.api_key, &self.title.model];
        if title_fields.iter().any(|f| f.is_some()) && !self.title.is_configured() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "title".into(),
                message: "title endpoint is partially configured and will be ignored".into(),
            });
        }

        errors
    }
}
