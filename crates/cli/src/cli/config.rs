use bt_domain::config::{Config, ConfigSeverity};

/// Validate the config and print any issues. Returns `false` when at least
/// one issue is an error.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let errors = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    for issue in &issues {
        println!("{issue}");
    }
    println!(
        "\n{} error(s), {} warning(s) in {config_path}",
        errors,
        issues.len() - errors,
    );

    errors == 0
}

/// Dump the resolved config (defaults and env overrides applied) as TOML.
/// Inline API keys are masked.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let mut redacted = config.clone();
    for p in &mut redacted.providers {
        if p.auth.key.is_some() {
            p.auth.key = Some("********".into());
        }
    }
    if redacted.title.api_key.is_some() {
        redacted.title.api_key = Some("********".into());
    }
    print!("{}", toml::to_string_pretty(&redacted)?);
    Ok(())
}
