use bt_domain::config::Config;
use bt_providers::ChatClient;

use crate::state::CursorStore;

/// List the models of `provider` (or the chat provider), filtered by its
/// allow-list.
pub async fn models(config: &Config, provider: Option<&str>) -> anyhow::Result<()> {
    let locale = config.chat.locale;
    let provider_id = provider.unwrap_or(&config.chat.provider);
    let provider_cfg = config
        .provider(provider_id)
        .ok_or_else(|| anyhow::anyhow!("unknown provider '{provider_id}'"))?;
    let model = if provider_cfg.id == config.chat.provider {
        config.chat.model.as_deref()
    } else {
        None
    };
    let client = ChatClient::for_provider(config, provider_cfg, model)
        .unwrap_or_else(|e| super::exit_with(&e, locale));

    let store = CursorStore::default_location()?;
    let mut cursor = store.load(client.provider_id())?;
    let result = client.list_models(&mut cursor).await;
    if let Err(e) = store.save(client.provider_id(), cursor) {
        tracing::warn!(error = %e, "saving rotation cursor failed");
    }

    match result {
        Ok(models) => {
            for m in models {
                match m.display_name {
                    Some(name) => println!("{}\t{}", m.id, name),
                    None => println!("{}", m.id),
                }
            }
            Ok(())
        }
        Err(e) => super::exit_with(&e, locale),
    }
}
