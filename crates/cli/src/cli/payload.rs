//! `banter payload`: dry-run request building.

use std::path::Path;

use bt_domain::config::{Config, Persona};
use bt_domain::message::Message;
use bt_payload::{BuiltPayload, PayloadBuilder, TurnFlags, WireRequest};
use bt_providers::build_provider;
use serde_json::json;

use crate::history::load_history;

pub fn payload(config: &Config, history: &Path, persona: Option<&Path>, with_body: bool) -> anyhow::Result<()> {
    let history = load_history(history)?;
    let persona = super::resolve_persona(config, persona)?;
    let built = dry_run(config, &history, &persona)?;
    println!("{}", serde_json::to_string_pretty(&render(&built, with_body)?)?);
    Ok(())
}

/// Build against the chat provider's body shape. No keys are needed; with
/// no matching provider the Gemini shape is measured.
fn dry_run(config: &Config, history: &[Message], persona: &Persona) -> anyhow::Result<BuiltPayload> {
    let provider = config
        .chat_provider()
        .map(|cfg| build_provider(cfg, config.chat.base_url_override.as_deref()))
        .transpose()?;
    let model = config
        .chat
        .model
        .clone()
        .or_else(|| provider.as_ref().map(|p| p.default_model().to_string()))
        .unwrap_or_default();

    let body_len = |req: &WireRequest| match &provider {
        Some(p) => p.body_len(&model, req),
        None => req.serialized_len(),
    };
    let built = PayloadBuilder::new(config.budget.clone()).build_measured(
        history,
        &config.chat,
        persona,
        TurnFlags::default(),
        body_len,
    )?;
    Ok(built)
}

fn render(built: &BuiltPayload, with_body: bool) -> anyhow::Result<serde_json::Value> {
    let mut out = json!({ "report": built.report });
    if with_body {
        out["body"] = serde_json::to_value(&built.request)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bt_domain::config::{AuthConfig, ProviderConfig, ProviderKind};
    use bt_domain::message::Attachment;

    #[test]
    fn body_is_only_included_on_request() {
        let config = Config::default();
        let history = vec![Message::user("hi"), Message::model("hello"), Message::user("bye")];
        let built = dry_run(&config, &history, &config.persona).unwrap();

        let plain = render(&built, false).unwrap();
        assert!(plain.get("body").is_none());
        assert_eq!(plain["report"]["messages"].as_array().unwrap().len(), 3);

        let full = render(&built, true).unwrap();
        assert_eq!(full["body"]["contents"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn dry_run_measures_the_chat_provider_body() {
        let mut config = Config::default();
        config.budget.max_payload_bytes = 4_000;
        config.chat.provider = "relay".into();
        config.providers.push(ProviderConfig {
            id: "relay".into(),
            kind: ProviderKind::OpenaiCompat,
            base_url: "https://relay.example.test/v1".into(),
            auth: AuthConfig::default(),
            default_model: Some("gpt-4o-mini".into()),
            models: vec![],
        });
        let history: Vec<Message> = (0..200)
            .map(|_| Message::user("").with_attachment(Attachment::new("image/png", "QUJD")))
            .collect();

        let built = dry_run(&config, &history, &config.persona).unwrap();
        assert!(built.report.serialized_bytes <= 4_000);
        assert!(built.report.serialized_bytes > built.request.serialized_len());
    }
}
