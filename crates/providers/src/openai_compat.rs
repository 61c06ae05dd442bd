//! OpenAI-compatible adapter.
//!
//! Works with OpenAI, OpenRouter, DeepSeek, Ollama, vLLM, LM Studio and any
//! other endpoint that follows the OpenAI chat completions contract. The
//! Gemini-shaped [`WireRequest`] is re-shaped into `messages` here.

use crate::traits::{ChatProvider, ChatResponse, ModelInfo};
use crate::util::{classify_http_failure, classify_stream_error, from_reqwest};
use bt_domain::config::{ProviderConfig, ProviderKind};
use bt_domain::error::{Error, PolicyBlock, Result};
use bt_domain::message::Role;
use bt_domain::stream::{BoxStream, Chunk, Usage};
use bt_payload::wire::{WireContent, WirePart};
use bt_payload::WireRequest;
use serde_json::Value;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A chat adapter for any OpenAI-compatible API endpoint.
pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    auth_header: String,
    auth_prefix: String,
    default_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider from the deserialized provider config.
    /// `base_url` replaces the configured one when given.
    pub fn from_config(cfg: &ProviderConfig, base_url: Option<&str>) -> Result<Self> {
        let auth_header = cfg
            .auth
            .header
            .clone()
            .unwrap_or_else(|| "Authorization".into());
        let auth_prefix = cfg.auth.prefix.clone().unwrap_or_else(|| "Bearer ".into());
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
            auth_header,
            auth_prefix,
            default_model,
            client,
        })
    }

    // ── Internal: build authenticated requests ────────────────────

    fn authed(&self, builder: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
        builder.header(&self.auth_header, format!("{}{}", self.auth_prefix, api_key))
    }

    async fn post_chat(&self, api_key: &str, body: &Value) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(provider = %self.id, url = %url, "openai-compat chat request");

        let resp = self
            .authed(self.client.post(&url), api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.map_err(from_reqwest)?;
            return Err(classify_http_failure(&self.id, status.as_u16(), &text));
        }
        Ok(resp)
    }

    fn build_chat_body(&self, model: &str, req: &WireRequest, stream: bool) -> Value {
        build_chat_body(&self.id, model, req, stream)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message serialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn build_chat_body(provider: &str, model: &str, req: &WireRequest, stream: bool) -> Value {
    let mut messages: Vec<Value> = Vec::with_capacity(req.contents.len() + 1);
    if let Some(ref system) = req.system_instruction {
        messages.push(serde_json::json!({"role": "system", "content": system}));
    }
    messages.extend(req.contents.iter().map(content_to_openai));

    let mut body = serde_json::json!({
        "model": model,
        "messages": messages,
        "stream": stream,
        "temperature": req.generation_config.temperature,
    });

    if let Some(max) = req.generation_config.max_output_tokens {
        body["max_tokens"] = serde_json::json!(max);
    }
    if stream {
        body["stream_options"] = serde_json::json!({"include_usage": true});
    }
    if !req.tools.is_empty() {
        tracing::debug!(provider, "web search tool is not sent to openai-compatible endpoints");
    }
    body
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "assistant",
    }
}

fn content_to_openai(content: &WireContent) -> Value {
    let text_only = content
        .parts
        .iter()
        .all(|p| matches!(p, WirePart::Text(_)));

    if text_only {
        return serde_json::json!({
            "role": role_to_str(content.role),
            "content": content.text(),
        });
    }

    let parts: Vec<Value> = content.parts.iter().map(part_to_openai).collect();
    serde_json::json!({
        "role": role_to_str(content.role),
        "content": parts,
    })
}

fn part_to_openai(part: &WirePart) -> Value {
    match part {
        WirePart::Text(text) => serde_json::json!({"type": "text", "text": text}),
        WirePart::InlineData {
            mime_type,
            data,
            name,
        } => {
            let url = format!("data:{mime_type};base64,{data}");
            if mime_type.starts_with("image/") {
                serde_json::json!({"type": "image_url", "image_url": {"url": url}})
            } else {
                serde_json::json!({
                    "type": "file",
                    "file": {
                        "filename": name.as_deref().unwrap_or("attachment"),
                        "file_data": url,
                    }
                })
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_chat_response(provider: &str, body: &Value, model: &str) -> Result<ChatResponse> {
    let choice = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
        .ok_or_else(|| Error::Protocol("no choices in chat completion".into()))?;

    let message = choice
        .get("message")
        .ok_or_else(|| Error::Protocol("no message in chat completion choice".into()))?;

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let finish_reason = choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .map(String::from);

    match finish_reason.as_deref() {
        Some("content_filter") => {
            return Err(Error::ContentPolicy {
                provider: provider.into(),
                block: PolicyBlock::ContentFilter,
            })
        }
        Some("length") if text.is_empty() => {
            return Err(Error::ContentPolicy {
                provider: provider.into(),
                block: PolicyBlock::MaxTokens,
            })
        }
        _ => {}
    }

    Ok(ChatResponse {
        text,
        model: body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(model)
            .to_string(),
        finish_reason,
        usage: body.get("usage").and_then(parse_openai_usage),
    })
}

fn parse_openai_usage(v: &Value) -> Option<Usage> {
    Some(Usage {
        prompt_tokens: v.get("prompt_tokens")?.as_u64()? as u32,
        completion_tokens: v.get("completion_tokens")?.as_u64()? as u32,
        total_tokens: v.get("total_tokens")?.as_u64()? as u32,
    })
}

fn parse_model_list(body: &Value) -> Vec<ModelInfo> {
    body.get("data")
        .and_then(Value::as_array)
        .map(|models| {
            models
                .iter()
                .filter_map(|m| {
                    Some(ModelInfo {
                        id: m.get("id")?.as_str()?.to_string(),
                        display_name: m.get("name").and_then(Value::as_str).map(String::from),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SSE streaming helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse one `data:` payload. `[DONE]` becomes a bare `End`.
fn parse_sse_data(provider: &str, data: &str, include_thoughts: bool) -> Vec<Result<Chunk>> {
    let mut chunks = Vec::new();

    if data.trim() == "[DONE]" {
        chunks.push(Ok(Chunk::end(None)));
        return chunks;
    }

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

    let usage = v.get("usage").and_then(parse_openai_usage);
    let choice = v
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|a| a.first());

    // Usage-only chunk (stream_options.include_usage).
    let Some(choice) = choice else {
        if usage.is_some() {
            chunks.push(Ok(Chunk::End {
                finish_reason: None,
                usage,
            }));
        }
        return chunks;
    };

    let delta = choice.get("delta").unwrap_or(&Value::Null);

    // Reasoning content (DeepSeek, OpenRouter, etc.)
    if include_thoughts {
        let reasoning = delta
            .get("reasoning_content")
            .or_else(|| delta.get("reasoning"))
            .and_then(Value::as_str);
        if let Some(text) = reasoning.filter(|t| !t.is_empty()) {
            chunks.push(Ok(Chunk::thought(text)));
        }
    }

    if let Some(text) = delta
        .get("content")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
    {
        chunks.push(Ok(Chunk::content(text)));
    }

    match choice.get("finish_reason").and_then(Value::as_str) {
        Some("content_filter") => chunks.push(Err(Error::ContentPolicy {
            provider: provider.into(),
            block: PolicyBlock::ContentFilter,
        })),
        Some(reason) => chunks.push(Ok(Chunk::End {
            finish_reason: Some(reason.to_string()),
            usage,
        })),
        None => {}
    }

    chunks
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl ChatProvider for OpenAiCompatProvider {
    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/models", self.base_url);
        tracing::debug!(provider = %self.id, url = %url, "openai-compat list models");

        let resp = self
            .authed(self.client.get(&url), api_key)
            .send()
            .await
            .map_err(from_reqwest)?;
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
        let body = self.build_chat_body(model, req, true);
        let resp = self.post_chat(api_key, &body).await?;

        let provider_id = self.id.clone();
        let include_thoughts = req.generation_config.include_thoughts();
        Ok(crate::sse::sse_response_stream(resp, move |data| {
            parse_sse_data(&provider_id, data, include_thoughts)
        }))
    }

    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        req: &WireRequest,
    ) -> Result<ChatResponse> {
        let body = self.build_chat_body(model, req, false);
        let resp = self.post_chat(api_key, &body).await?;
        let text = resp.text().await.map_err(from_reqwest)?;
        let json: Value = serde_json::from_str(&text)?;
        parse_chat_response(&self.id, &json, model)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenaiCompat
    }

    fn provider_id(&self) -> &str {
        &self.id
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Measured on the streaming body, the larger of the two shapes.
    fn body_len(&self, model: &str, req: &WireRequest) -> usize {
        serde_json::to_vec(&self.build_chat_body(model, req, true))
            .map(|v| v.len())
            .unwrap_or(usize::MAX)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use bt_domain::error::ErrorKind;
    use bt_domain::message::{Attachment, Message};
    use bt_payload::wire::{GenerationConfig, WireTool};
    use serde_json::json;

    fn request(contents: Vec<WireContent>, system: Option<&str>) -> WireRequest {
        WireRequest {
            contents,
            system_instruction: system.map(String::from),
            generation_config: GenerationConfig {
                temperature: 0.5,
                max_output_tokens: Some(64),
                thinking_config: None,
            },
            tools: vec![WireTool::GoogleSearch {}],
        }
    }

    fn content(msg: Message) -> WireContent {
        WireContent::from_message(&msg).unwrap()
    }

    #[test]
    fn system_message_first_and_roles_mapped() {
        let req = request(
            vec![content(Message::user("hi")), content(Message::model("hello"))],
            Some("be brief"),
        );
        let body = build_chat_body("openai", "gpt-4o", &req, true);
        assert_eq!(
            body,
            json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"}
                ],
                "stream": true,
                "temperature": 0.5,
                "max_tokens": 64,
                "stream_options": {"include_usage": true}
            })
        );
    }

    #[test]
    fn attachments_become_content_parts() {
        let msg = Message::user("look")
            .with_attachment(Attachment::new("image/png", "UE5H"))
            .with_attachment(Attachment::new("application/pdf", "JVBE").named("doc.pdf"));
        let body = build_chat_body("openai", "m", &request(vec![content(msg)], None), false);
        assert_eq!(
            body["messages"][0]["content"],
            json!([
                {"type": "text", "text": "look"},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,UE5H"}},
                {"type": "file", "file": {"filename": "doc.pdf", "file_data": "data:application/pdf;base64,JVBE"}}
            ])
        );
        assert!(body.get("stream_options").is_none());
    }

    #[test]
    fn sse_content_then_finish() {
        let data = json!({"choices": [{"delta": {"content": "Hi"}, "finish_reason": "stop"}]})
            .to_string();
        let chunks: Vec<Chunk> = parse_sse_data("openai", &data, false)
            .into_iter()
            .map(|c| c.unwrap())
            .collect();
        assert_eq!(
            chunks,
            vec![Chunk::content("Hi"), Chunk::end(Some("stop".into()))]
        );
    }

    #[test]
    fn sse_reasoning_only_when_enabled() {
        let data = json!({"choices": [{"delta": {"reasoning_content": "thinking"}}]}).to_string();
        assert!(parse_sse_data("deepseek", &data, false).is_empty());
        let chunks = parse_sse_data("deepseek", &data, true);
        assert_eq!(*chunks[0].as_ref().unwrap(), Chunk::thought("thinking"));
    }

    #[test]
    fn sse_done_and_usage_chunks() {
        assert_eq!(
            *parse_sse_data("openai", "[DONE]", false)[0].as_ref().unwrap(),
            Chunk::end(None)
        );

        let data = json!({"choices": [], "usage": {"prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12}})
            .to_string();
        match parse_sse_data("openai", &data, false)[0].as_ref().unwrap() {
            Chunk::End { usage, .. } => assert_eq!(usage.unwrap().completion_tokens, 7),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn sse_content_filter_is_policy_error() {
        let data = json!({"choices": [{"delta": {}, "finish_reason": "content_filter"}]}).to_string();
        let chunks = parse_sse_data("openai", &data, false);
        assert_eq!(
            chunks[0].as_ref().unwrap_err().kind(),
            ErrorKind::ContentPolicy
        );
    }

    #[test]
    fn sse_garbage_is_protocol_error() {
        let chunks = parse_sse_data("openai", "{{{", false);
        assert_eq!(chunks[0].as_ref().unwrap_err().kind(), ErrorKind::Protocol);
    }

    #[test]
    fn one_shot_response_parsing() {
        let body = json!({
            "model": "gpt-4o-2024-08-06",
            "choices": [{"message": {"role": "assistant", "content": "Trip Ideas"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3}
        });
        let resp = parse_chat_response("openai", &body, "gpt-4o").unwrap();
        assert_eq!(resp.text, "Trip Ideas");
        assert_eq!(resp.model, "gpt-4o-2024-08-06");
        assert_eq!(resp.usage.unwrap().total_tokens, 3);

        let filtered = json!({"choices": [{"message": {"content": null}, "finish_reason": "content_filter"}]});
        assert!(matches!(
            parse_chat_response("openai", &filtered, "m"),
            Err(Error::ContentPolicy {
                block: PolicyBlock::ContentFilter,
                ..
            })
        ));
    }

    #[test]
    fn model_list_reads_data_ids() {
        let body = json!({"object": "list", "data": [{"id": "gpt-4o"}, {"id": "o3-mini"}, {"object": "model"}]});
        let ids: Vec<String> = parse_model_list(&body).into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["gpt-4o", "o3-mini"]);
    }
}
