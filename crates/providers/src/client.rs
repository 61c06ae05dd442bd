//! Chat client: one provider, its credential pool and the rotation
//! executor, bound to a model.

use crate::auth::{CredentialPool, RotationCursor};
use crate::executor::KeyRotationExecutor;
use crate::registry::build_provider;
use crate::traits::{ChatProvider, ChatResponse, ModelInfo};
use bt_domain::config::{Config, ProviderConfig};
use bt_domain::error::{Error, Result};
use bt_domain::locale::Locale;
use bt_domain::stream::ChunkStream;
use bt_domain::trace::TraceEvent;
use bt_payload::WireRequest;
use std::sync::Arc;
use std::time::Instant;

pub struct ChatClient {
    provider: Arc<dyn ChatProvider>,
    executor: KeyRotationExecutor,
    model: String,
    /// Empty means every listed model is allowed.
    allow_list: Vec<String>,
}

impl ChatClient {
    pub fn new(provider: Arc<dyn ChatProvider>, pool: CredentialPool, model: impl Into<String>) -> Self {
        let executor = KeyRotationExecutor::new(pool, provider.provider_id());
        Self {
            provider,
            executor,
            model: model.into(),
            allow_list: Vec::new(),
        }
    }

    pub fn with_allow_list(mut self, models: Vec<String>) -> Self {
        self.allow_list = models;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.executor = self.executor.with_locale(locale);
        self
    }

    /// Client for the configured chat provider and model.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider_cfg = config.chat_provider().ok_or_else(|| {
            Error::Config(format!(
                "chat.provider '{}' does not match any [[providers]] entry",
                config.chat.provider
            ))
        })?;
        Self::for_provider(config, provider_cfg, config.chat.model.as_deref())
    }

    /// Client for any configured provider. The settings' base-URL override
    /// only applies to the chat provider.
    pub fn for_provider(
        config: &Config,
        provider_cfg: &ProviderConfig,
        model: Option<&str>,
    ) -> Result<Self> {
        let base_url_override = if provider_cfg.id == config.chat.provider {
            config.chat.base_url_override.as_deref()
        } else {
            None
        };
        let provider = build_provider(provider_cfg, base_url_override)?;
        let pool = CredentialPool::from_auth_config(&provider_cfg.auth)?;

        let model = model
            .map(String::from)
            .unwrap_or_else(|| provider.default_model().to_string());
        if !provider_cfg.allows_model(&model) {
            return Err(Error::Config(format!(
                "model '{}' is not in the allow-list of provider '{}'",
                model, provider_cfg.id
            )));
        }

        Ok(Self::new(provider, pool, model)
            .with_allow_list(provider_cfg.models.clone())
            .with_locale(config.chat.locale))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_id(&self) -> &str {
        self.provider.provider_id()
    }

    /// Size of the body the provider would send for `req` with this model.
    pub fn body_len(&self, req: &WireRequest) -> usize {
        self.provider.body_len(&self.model, req)
    }

    /// Stream a completion. Never fails as a whole; see
    /// [`KeyRotationExecutor::execute_stream`].
    pub async fn stream_chat(&self, cursor: &mut RotationCursor, req: &WireRequest) -> ChunkStream {
        let provider = &self.provider;
        let model = self.model.as_str();
        self.executor
            .execute_stream(cursor, |cred| async move {
                let started = Instant::now();
                let stream = provider.stream_chat(&cred.key, model, req).await?;
                record_request(provider.provider_id(), model, true, cred.index, started);
                Ok(stream)
            })
            .await
    }

    pub async fn generate(&self, cursor: &mut RotationCursor, req: &WireRequest) -> Result<ChatResponse> {
        let provider = &self.provider;
        let model = self.model.as_str();
        self.executor
            .execute(cursor, |cred| async move {
                let started = Instant::now();
                let response = provider.generate(&cred.key, model, req).await?;
                record_request(provider.provider_id(), model, false, cred.index, started);
                Ok(response)
            })
            .await
    }

    /// Models offered by the provider, filtered by the allow-list.
    pub async fn list_models(&self, cursor: &mut RotationCursor) -> Result<Vec<ModelInfo>> {
        let provider = &self.provider;
        let models = self
            .executor
            .execute(cursor, |cred| async move { provider.list_models(&cred.key).await })
            .await?;

        if self.allow_list.is_empty() {
            return Ok(models);
        }
        Ok(models
            .into_iter()
            .filter(|m| self.allow_list.iter().any(|allowed| *allowed == m.id))
            .collect())
    }
}

fn record_request(provider: &str, model: &str, streaming: bool, key_index: usize, started: Instant) {
    TraceEvent::LlmRequest {
        provider: provider.to_string(),
        model: model.to_string(),
        streaming,
        key_index,
        duration_ms: started.elapsed().as_millis() as u64,
    }
    .emit();
}
