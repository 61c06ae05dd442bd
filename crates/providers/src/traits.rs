use bt_domain::config::ProviderKind;
use bt_domain::error::Result;
use bt_domain::stream::{BoxStream, Chunk, Usage};
use bt_payload::WireRequest;
use serde::Serialize;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic one-shot completion.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// Answer text. Reasoning parts are not included.
    pub text: String,
    /// The model that produced the response.
    pub model: String,
    /// Why the model stopped (e.g. "stop", "length").
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// One entry of a provider's model listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait that every chat adapter implements.
///
/// Adapters are stateless with respect to credentials: the key is passed in
/// on every call so the key-rotation executor decides which one is used.
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    /// List the models the key can use.
    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>>;

    /// Open a streaming completion. Returns once the HTTP status has been
    /// checked; errors after that arrive as stream items.
    async fn stream_chat(
        &self,
        api_key: &str,
        model: &str,
        req: &WireRequest,
    ) -> Result<BoxStream<'static, Result<Chunk>>>;

    /// Send a completion request and wait for the full response.
    async fn generate(&self, api_key: &str, model: &str, req: &WireRequest)
        -> Result<ChatResponse>;

    fn kind(&self) -> ProviderKind;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;

    /// Model used when neither settings nor the caller name one.
    fn default_model(&self) -> &str;

    /// Byte length of the body this adapter sends for `req`. The payload
    /// ceiling is enforced against this number.
    fn body_len(&self, _model: &str, req: &WireRequest) -> usize {
        req.serialized_len()
    }
}
