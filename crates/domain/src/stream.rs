use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A boxed async stream, used for LLM streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// A caller-facing stream: never fails as a whole, always ends with
/// [`Chunk::End`].
pub type ChunkStream = BoxStream<'static, Chunk>;

/// One unit of a streamed response (provider-agnostic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Chunk {
    /// A text delta of the answer.
    Content { text: String },

    /// A reasoning delta. Only produced when thoughts are enabled.
    Thought { text: String },

    /// Terminal failure. `message` is already rendered for the end user.
    Error { kind: ErrorKind, message: String },

    /// Stream is finished. Always the last chunk, emitted exactly once.
    End {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
}

impl Chunk {
    pub fn content(text: impl Into<String>) -> Self {
        Chunk::Content { text: text.into() }
    }

    pub fn thought(text: impl Into<String>) -> Self {
        Chunk::Thought { text: text.into() }
    }

    pub fn end(finish_reason: Option<String>) -> Self {
        Chunk::End {
            finish_reason,
            usage: None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Chunk::End { .. })
    }
}

/// Token usage for a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_serialize_with_type_tag() {
        let json = serde_json::to_value(Chunk::content("hi")).unwrap();
        assert_eq!(json["type"], "content");
        assert_eq!(json["text"], "hi");

        let json = serde_json::to_value(Chunk::end(None)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "end"}));

        let json = serde_json::to_value(Chunk::Error {
            kind: ErrorKind::Credential,
            message: "bad key".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "credential");
    }
}
