//! Conversation titles.
//!
//! A dedicated OpenAI-compatible title endpoint is preferred when fully
//! configured; otherwise the chat provider is asked. Any failure falls back
//! to a title derived locally from the prompt, so this never errors.

use crate::auth::{split_key_list, CredentialPool, RotationCursor};
use crate::client::ChatClient;
use crate::openai_compat::OpenAiCompatProvider;
use bt_domain::config::{AuthConfig, ProviderConfig, ProviderKind, TitleConfig};
use bt_domain::error::{Error, Result};
use bt_domain::locale::Locale;
use bt_domain::message::Message;
use bt_domain::trace::TraceEvent;
use bt_payload::wire::{GenerationConfig, WireContent};
use bt_payload::WireRequest;
use std::sync::Arc;

/// Longest locally derived title, in characters.
pub const FALLBACK_TITLE_CHARS: usize = 30;

/// Prompt characters sent to the model.
const TITLE_PROMPT_CHARS: usize = 2_000;

const TITLE_INSTRUCTION: &str = "\
Write a short title (at most six words) for a conversation that starts with \
the user's message below. Use the language of the message. Reply with the \
title only, without quotes or trailing punctuation.";

pub struct TitleGenerator<'a> {
    /// `None` when the chat provider could not be set up.
    chat: Option<&'a ChatClient>,
    dedicated: Option<ChatClient>,
    locale: Locale,
}

impl<'a> TitleGenerator<'a> {
    /// A dedicated endpoint that cannot be set up is logged and skipped.
    pub fn new(chat: Option<&'a ChatClient>, title: &TitleConfig, locale: Locale) -> Self {
        let dedicated = if title.is_configured() {
            match dedicated_client(title, locale) {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::warn!(error = %e, "title endpoint unusable, using chat provider");
                    None
                }
            }
        } else {
            None
        };
        Self {
            chat,
            dedicated,
            locale,
        }
    }

    pub fn uses_dedicated_endpoint(&self) -> bool {
        self.dedicated.is_some()
    }

    /// Generate a title for `prompt`. The cursor is the chat provider's;
    /// the dedicated endpoint rotates its own keys from the start.
    pub async fn generate(&self, cursor: &mut RotationCursor, prompt: &str) -> String {
        let request = title_request(prompt);
        let result = match (&self.dedicated, self.chat) {
            (Some(client), _) => {
                let mut own_cursor = RotationCursor::default();
                client.generate(&mut own_cursor, &request).await
            }
            (None, Some(chat)) => chat.generate(cursor, &request).await,
            (None, None) => Err(Error::Config("no title endpoint or chat provider".into())),
        };

        let reason = match result {
            Ok(response) => match clean_title(&response.text) {
                Some(title) => return title,
                None => "model returned an empty title".to_string(),
            },
            Err(e) => e.to_string(),
        };

        tracing::warn!(reason = %reason, "title generation failed, deriving locally");
        TraceEvent::TitleFallback { reason }.emit();
        fallback_title(prompt, self.locale)
    }
}

fn dedicated_client(title: &TitleConfig, locale: Locale) -> Result<ChatClient> {
    let api_url = title.api_url.clone().unwrap_or_default();
    let model = title.model.clone().unwrap_or_default();
    let keys = split_key_list(title.api_key.as_deref().unwrap_or_default());

    let cfg = ProviderConfig {
        id: "title".into(),
        kind: ProviderKind::OpenaiCompat,
        base_url: api_url,
        auth: AuthConfig::default(),
        default_model: Some(model.clone()),
        models: Vec::new(),
    };
    let provider = Arc::new(OpenAiCompatProvider::from_config(&cfg, None)?);
    let pool = CredentialPool::new(keys)?;
    Ok(ChatClient::new(provider, pool, model).with_locale(locale))
}

fn title_request(prompt: &str) -> WireRequest {
    let excerpt: String = prompt.chars().take(TITLE_PROMPT_CHARS).collect();
    WireRequest {
        contents: WireContent::from_message(&Message::user(excerpt))
            .into_iter()
            .collect(),
        system_instruction: Some(TITLE_INSTRUCTION.into()),
        generation_config: GenerationConfig {
            temperature: 0.3,
            max_output_tokens: None,
            thinking_config: None,
        },
        tools: Vec::new(),
    }
}

const QUOTES: &[char] = &['"', '\'', '`', '“', '”', '‘', '’', '«', '»', '「', '」', '《', '》', '*'];
const TRAILING: &[char] = &['.', '。', '!', '！', '?', '？', ',', '，', ':', '：', ';', '；', '…'];

/// First non-empty line, unquoted, without trailing punctuation.
fn clean_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line.strip_prefix("Title:").unwrap_or(line);
    let title = line
        .trim()
        .trim_matches(QUOTES)
        .trim_end_matches(TRAILING)
        .trim_matches(QUOTES)
        .trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// First line of the prompt, whitespace collapsed, cut to
/// [`FALLBACK_TITLE_CHARS`] with `…` when shortened.
pub fn fallback_title(prompt: &str, locale: Locale) -> String {
    let first_line = prompt.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return match locale {
            Locale::En => "New chat".into(),
            Locale::ZhCn => "新对话".into(),
        };
    }
    if collapsed.chars().count() > FALLBACK_TITLE_CHARS {
        let cut: String = collapsed.chars().take(FALLBACK_TITLE_CHARS).collect();
        let mut cut = cut.trim_end().to_string();
        cut.push('…');
        cut
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_uses_first_line_collapsed() {
        assert_eq!(
            fallback_title("  how   do\tI\n\nsecond line", Locale::En),
            "how do I"
        );
    }

    #[test]
    fn fallback_cuts_long_prompts() {
        let title = fallback_title(&"abcd".repeat(20), Locale::En);
        assert_eq!(title.chars().count(), FALLBACK_TITLE_CHARS + 1);
        assert!(title.ends_with('…'));

        let exact = "a".repeat(FALLBACK_TITLE_CHARS);
        assert_eq!(fallback_title(&exact, Locale::En), exact);
    }

    #[test]
    fn fallback_cut_drops_space_before_ellipsis() {
        let title = fallback_title(&"word ".repeat(20), Locale::En);
        assert_eq!(title, "word word word word word word…");
    }

    #[test]
    fn fallback_counts_characters_not_bytes() {
        let prompt = "如何".repeat(20);
        let title = fallback_title(&prompt, Locale::ZhCn);
        assert_eq!(title.chars().count(), FALLBACK_TITLE_CHARS + 1);
    }

    #[test]
    fn fallback_for_empty_prompt_is_localized() {
        assert_eq!(fallback_title(" \n ", Locale::En), "New chat");
        assert_eq!(fallback_title("", Locale::ZhCn), "新对话");
    }

    #[test]
    fn clean_title_strips_quotes_and_punctuation() {
        assert_eq!(clean_title("\"Rust Borrowing Basics.\"\n").as_deref(), Some("Rust Borrowing Basics"));
        assert_eq!(clean_title("Title: Trip to Lisbon!").as_deref(), Some("Trip to Lisbon"));
        assert_eq!(clean_title("「旅行计划」。").as_deref(), Some("旅行计划"));
        assert_eq!(clean_title("\n\n  \"\" ").as_deref(), None);
    }

    #[test]
    fn title_request_is_small_and_plain() {
        let req = title_request(&"x".repeat(10_000));
        assert_eq!(req.contents.len(), 1);
        assert_eq!(req.contents[0].text().len(), TITLE_PROMPT_CHARS);
        assert!(req.tools.is_empty());
        assert!(!req.generation_config.include_thoughts());
    }

    #[tokio::test]
    async fn without_any_endpoint_title_is_derived_locally() {
        let generator = TitleGenerator::new(None, &TitleConfig::default(), Locale::ZhCn);
        assert!(!generator.uses_dedicated_endpoint());
        let mut cursor = RotationCursor::default();
        assert_eq!(generator.generate(&mut cursor, "").await, "新对话");
        assert_eq!(
            generator.generate(&mut cursor, "plan a trip").await,
            "plan a trip"
        );
        assert_eq!(cursor, RotationCursor::default());
    }

    #[test]
    fn empty_prompt_builds_request_without_contents() {
        assert!(title_request("").contents.is_empty());
    }
}
