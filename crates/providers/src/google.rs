//! Google Gemini adapter.
//!
//! Implements the Gemini `generateContent`, `streamGenerateContent` and
//! model-listing APIs. Auth is via an API key passed as a query parameter
//! (`key={api_key}`); URLs are redacted before they are logged.

use crate::traits::{ChatProvider, ChatResponse, ModelInfo};
use crate::util::{classify_http_failure, classify_stream_error, from_reqwest, redact_url_key};
use bt_domain::config::{ProviderConfig, ProviderKind};
use bt_domain::error::{Error, PolicyBlock, Result};
use bt_domain::stream::{BoxStream, Chunk, Usage};
use bt_payload::WireRequest;
use serde_json::Value;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A chat adapter for the Google Gemini API.
pub struct GoogleProvider {
    id: String,
    base_url: String,
    default_model: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    /// Create a new provider from the deserialized provider config.
    /// `base_url` replaces the configured one when given.
    pub fn from_config(cfg: &ProviderConfig, base_url: Option<&str>) -> Result<Self> {
        let default_model = cfg
            .default_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.into());

        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: base_url
                .unwrap_or(&cfg.base_url)
                .trim_end_matches('/')
                .to_string(),
            default_model,
            client,
        })
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn generate_url(&self, model: &str, api_key: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, api_key
        )
    }

    fn stream_url(&self, model: &str, api_key: &str) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, model, api_key
        )
    }

    fn models_url(&self, api_key: &str) -> String {
        format!(
            "{}/v1beta/models?key={}&pageSize=1000",
            self.base_url, api_key
        )
    }

    async fn post(&self, url: &str, req: &WireRequest) -> Result<reqwest::Response> {
        let resp = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(req)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.map_err(from_reqwest)?;
            return Err(classify_http_failure(&self.id, status.as_u16(), &body));
        }
        Ok(resp)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What a `finishReason` means for the caller.
enum Finish {
    Done(String),
    Blocked(PolicyBlock),
}

fn map_finish_reason(reason: &str) -> Finish {
    match reason {
        "STOP" => Finish::Done("stop".into()),
        "MAX_TOKENS" => Finish::Done("length".into()),
        "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "SPII" | "IMAGE_SAFETY" => {
            Finish::Blocked(PolicyBlock::Safety)
        }
        "RECITATION" => Finish::Blocked(PolicyBlock::Recitation),
        other => Finish::Done(other.to_lowercase()),
    }
}

/// `promptFeedback.blockReason`: the prompt itself was refused.
fn prompt_block(body: &Value) -> Option<PolicyBlock> {
    let reason = body
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(Value::as_str)?;
    tracing::debug!(block_reason = reason, "gemini refused the prompt");
    Some(PolicyBlock::Safety)
}

fn first_candidate(body: &Value) -> Option<&Value> {
    body.get("candidates")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
}

fn candidate_parts(candidate: &Value) -> &[Value] {
    candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn is_thought(part: &Value) -> bool {
    part.get("thought").and_then(Value::as_bool).unwrap_or(false)
}

fn parse_gemini_usage(v: &Value) -> Option<Usage> {
    let prompt = v.get("promptTokenCount")?.as_u64()? as u32;
    let completion = v
        .get("candidatesTokenCount")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    let total = v
        .get("totalTokenCount")
        .and_then(Value::as_u64)
        .unwrap_or((prompt + completion) as u64) as u32;
    Some(Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: total,
    })
}

fn parse_gemini_response(provider: &str, body: &Value, model: &str) -> Result<ChatResponse> {
    if let Some(block) = prompt_block(body) {
        return Err(Error::ContentPolicy {
            provider: provider.into(),
            block,
        });
    }

    let candidate = first_candidate(body)
        .ok_or_else(|| Error::Protocol("gemini response has no candidates".into()))?;

    let text: String = candidate_parts(candidate)
        .iter()
        .filter(|p| !is_thought(p))
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    let finish_reason = match candidate.get("finishReason").and_then(Value::as_str) {
        Some(reason) => match map_finish_reason(reason) {
            Finish::Blocked(block) => {
                return Err(Error::ContentPolicy {
                    provider: provider.into(),
                    block,
                })
            }
            Finish::Done(reason) => Some(reason),
        },
        None => None,
    };

    if text.is_empty() && finish_reason.as_deref() == Some("length") {
        return Err(Error::ContentPolicy {
            provider: provider.into(),
            block: PolicyBlock::MaxTokens,
        });
    }

    Ok(ChatResponse {
        text,
        model: model.to_string(),
        finish_reason,
        usage: body.get("usageMetadata").and_then(parse_gemini_usage),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse a single Gemini streaming SSE data payload.
fn parse_gemini_sse_data(provider: &str, data: &str) -> Vec<Result<Chunk>> {
    let mut chunks = Vec::new();

    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            chunks.push(Err(Error::Json(e)));
            return chunks;
        }
    };

    if let Some(err) = v.get("error") {
        chunks.push(Err(classify_stream_error(provider, data, err)));
        return chunks;
    }

    if let Some(block) = prompt_block(&v) {
        chunks.push(Err(Error::ContentPolicy {
            provider: provider.into(),
            block,
        }));
        return chunks;
    }

    let Some(candidate) = first_candidate(&v) else {
        return chunks;
    };

    for part in candidate_parts(candidate) {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            if text.is_empty() {
                continue;
            }
            chunks.push(Ok(if is_thought(part) {
                Chunk::thought(text)
            } else {
                Chunk::content(text)
            }));
        }
    }

    if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str) {
        match map_finish_reason(reason) {
            Finish::Blocked(block) => chunks.push(Err(Error::ContentPolicy {
                provider: provider.into(),
                block,
            })),
            Finish::Done(finish_reason) => chunks.push(Ok(Chunk::End {
                finish_reason: Some(finish_reason),
                usage: v.get("usageMetadata").and_then(parse_gemini_usage),
            })),
        }
    }

    chunks
}

fn parse_model_list(body: &Value) -> Vec<ModelInfo> {
    body.get("models")
        .and_then(Value::as_array)
        .map(|models| {
            models
                .iter()
                .filter(|m| {
                    m.get("supportedGenerationMethods")
                        .and_then(Value::as_array)
                        .map_or(true, |methods| {
                            methods.iter().any(|x| x.as_str() == Some("generateContent"))
                        })
                })
                .filter_map(|m| {
                    let name = m.get("name").and_then(Value::as_str)?;
                    Some(ModelInfo {
                        id: name.strip_prefix("models/").unwrap_or(name).to_string(),
                        display_name: m
                            .get("displayName")
                            .and_then(Value::as_str)
                            .map(String::from),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl ChatProvider for GoogleProvider {
    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>> {
        let url = self.models_url(api_key);
        tracing::debug!(provider = %self.id, url = %redact_url_key(&url), "google list models");

        let resp = self.client.get(&url).send().await.map_err(from_reqwest)?;
        let status = resp.status();
        let text = resp.text().await.map_err(from_reqwest)?;
        if !status.is_success() {
            return Err(classify_http_failure(&self.id, status.as_u16(), &text));
        }

        let body: Value = serde_json::from_str(&text)?;
        Ok(parse_model_list(&body))
    }

    async fn stream_chat(
        &self,
        api_key: &str,
        model: &str,
        req: &WireRequest,
    ) -> Result<BoxStream<'static, Result<Chunk>>> {
        let url = self.stream_url(model, api_key);
        tracing::debug!(provider = %self.id, url = %redact_url_key(&url), "google stream request");

        let resp = self.post(&url, req).await?;
        let provider_id = self.id.clone();
        Ok(crate::sse::sse_response_stream(resp, move |data| {
            parse_gemini_sse_data(&provider_id, data)
        }))
    }

    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        req: &WireRequest,
    ) -> Result<ChatResponse> {
        let url = self.generate_url(model, api_key);
        tracing::debug!(provider = %self.id, url = %redact_url_key(&url), "google generate request");

        let resp = self.post(&url, req).await?;
        let text = resp.text().await.map_err(from_reqwest)?;
        let body: Value = serde_json::from_str(&text)?;
        parse_gemini_response(&self.id, &body, model)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn provider_id(&self) -> &str {
        &self.id
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
