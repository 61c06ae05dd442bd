//! Provider factory.
//!
//! Selects the adapter for a configured provider once per call, so provider
//! differences stay inside the adapters.

use crate::google::GoogleProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::ChatProvider;
use bt_domain::config::{ProviderConfig, ProviderKind};
use bt_domain::error::Result;
use std::sync::Arc;

/// Instantiate the adapter for `cfg`. A non-empty `base_url_override`
/// replaces the configured base URL.
pub fn build_provider(
    cfg: &ProviderConfig,
    base_url_override: Option<&str>,
) -> Result<Arc<dyn ChatProvider>> {
    let base_url = base_url_override
        .map(str::trim)
        .filter(|url| !url.is_empty());

    let provider: Arc<dyn ChatProvider> = match cfg.kind {
        ProviderKind::Google => Arc::new(GoogleProvider::from_config(cfg, base_url)?),
        ProviderKind::OpenaiCompat => Arc::new(OpenAiCompatProvider::from_config(cfg, base_url)?),
    };

    tracing::debug!(
        provider_id = %cfg.id,
        kind = ?cfg.kind,
        base_url_override = base_url.is_some(),
        "built chat provider"
    );
    Ok(provider)
}
