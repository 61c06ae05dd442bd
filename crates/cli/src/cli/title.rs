use bt_domain::config::Config;
use bt_providers::{ChatClient, RotationCursor, TitleGenerator};

use crate::state::CursorStore;

/// Print a title for `prompt`. Never fails; without a usable endpoint the
/// title is derived locally.
pub async fn title(config: &Config, prompt: &str) -> anyhow::Result<()> {
    println!("{}", resolve_title(config, prompt).await);
    Ok(())
}

pub async fn resolve_title(config: &Config, prompt: &str) -> String {
    let client = match ChatClient::from_config(config) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::debug!(error = %e, "chat provider unavailable for titles");
            None
        }
    };
    let generator = TitleGenerator::new(client.as_ref(), &config.title, config.chat.locale);

    // The chat cursor only matters when the chat provider does the work.
    let persisted = match &client {
        Some(client) if !generator.uses_dedicated_endpoint() => {
            match CursorStore::default_location()
                .and_then(|store| store.load(client.provider_id()).map(|c| (store, c)))
            {
                Ok(found) => Some(found),
                Err(e) => {
                    tracing::warn!(error = %e, "cursor store unavailable");
                    None
                }
            }
        }
        _ => None,
    };

    let mut cursor = persisted.as_ref().map(|(_, c)| *c).unwrap_or_default();
    let title = generator.generate(&mut cursor, prompt).await;

    if let (Some((store, _)), Some(client)) = (&persisted, &client) {
        if let Err(e) = store.save(client.provider_id(), cursor) {
            tracing::warn!(error = %e, "saving rotation cursor failed");
        }
    }
    title
}
