use bt_domain::config::{Config, ConfigSeverity, ProviderKind};
use bt_domain::locale::Locale;
use std::collections::HashMap;

#[test]
fn budget_defaults_match_documented_heuristics() {
    let config = Config::default();
    assert_eq!(config.budget.max_payload_bytes, 200 * 1024 * 1024);
    assert!((config.budget.inflation_factor - 1.8).abs() < f64::EPSILON);
    assert_eq!(config.budget.truncation_threshold_bytes, 500 * 1024);
    assert_eq!(config.budget.truncate_keep_chars, 2_000);
}

#[test]
fn chat_defaults() {
    let config = Config::default();
    assert_eq!(config.chat.provider, "gemini");
    assert!((config.chat.temperature - 0.7).abs() < f32::EPSILON);
    assert_eq!(config.chat.locale, Locale::En);
    assert!(!config.chat.search.enabled_by_default);
    assert!(config.chat.max_tokens.is_none());
}

#[test]
fn budget_constants_are_overridable() {
    let toml_str = r#"
[budget]
inflation_factor = 2.0
truncate_keep_chars = 500
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert!((config.budget.inflation_factor - 2.0).abs() < f64::EPSILON);
    assert_eq!(config.budget.truncate_keep_chars, 500);
    // Untouched fields keep their defaults.
    assert_eq!(config.budget.max_payload_bytes, 200 * 1024 * 1024);
}

#[test]
fn full_config_parses() {
    let toml_str = r#"
[chat]
provider = "openai"
model = "gpt-4o-mini"
temperature = 0.3
max_tokens = 1024
context_length = 20
locale = "zh-CN"

[chat.search]
enabled_by_default = true
optimizer = true

[persona]
name = "Tutor"
system_prompt = "You are a patient tutor."
temperature = 0.2
memory_enabled = true
memories = ["Prefers short answers"]

[title]
api_url = "https://titles.test/v1"
api_key = "tk"
model = "tiny"

[[providers]]
id = "gemini"
kind = "google"
base_url = "https://generativelanguage.googleapis.com"
default_model = "gemini-2.5-flash"

[providers.auth]
keys = ["GEMINI_KEYS"]

[[providers]]
id = "openai"
kind = "openai_compat"
base_url = "https://api.openai.com/v1"
models = ["gpt-4o", "gpt-4o-mini"]

[providers.auth]
env = "OPENAI_API_KEY"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.providers.len(), 2);
    assert_eq!(config.providers[0].kind, ProviderKind::Google);
    assert_eq!(config.providers[0].auth.keys, vec!["GEMINI_KEYS"]);
    assert_eq!(config.chat_provider().unwrap().id, "openai");
    assert_eq!(config.chat.context_length, Some(20));
    assert_eq!(config.chat.locale, Locale::ZhCn);
    assert!(config.chat.search.optimizer);
    assert_eq!(config.persona.temperature, Some(0.2));
    assert_eq!(config.persona.memories.len(), 1);
    assert!(config.title.is_configured());
    assert!(config.validate().is_empty());
}

#[test]
fn unknown_chat_provider_is_an_error() {
    let toml_str = r#"
[chat]
provider = "missing"

[[providers]]
id = "gemini"
kind = "google"
base_url = "https://generativelanguage.googleapis.com"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|e| e.field == "chat.provider" && e.severity == ConfigSeverity::Error));
}

#[test]
fn empty_config_only_warns() {
    let issues = Config::default().validate();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, ConfigSeverity::Warning);
    assert_eq!(issues[0].field, "providers");
}

#[test]
fn env_overrides_apply_per_provider() {
    let toml_str = r#"
[[providers]]
id = "my-relay"
kind = "openai_compat"
base_url = "https://api.openai.com/v1"
"#;
    let mut config: Config = toml::from_str(toml_str).unwrap();
    let env: HashMap<&str, &str> = [
        ("BANTER_MY_RELAY_BASE_URL", "https://relay.test/v1"),
        ("BANTER_MY_RELAY_MODELS", "a, b,,c"),
        ("BANTER_TITLE_API_URL", "https://titles.test"),
    ]
    .into_iter()
    .collect();

    config.apply_env_overrides_with(|k| env.get(k).map(|v| v.to_string()));

    assert_eq!(config.providers[0].base_url, "https://relay.test/v1");
    assert_eq!(config.providers[0].models, vec!["a", "b", "c"]);
    assert_eq!(config.title.api_url.as_deref(), Some("https://titles.test"));
    assert!(!config.title.is_configured());
}
