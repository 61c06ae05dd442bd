//! Provider-neutral request body.
//!
//! Serializes in the Gemini `generateContent` shape. The OpenAI-compatible
//! adapter re-shapes it, so the payload ceiling is checked against whatever
//! body measure the caller passes to the builder.

use bt_domain::message::{Attachment, Message, Role};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireRequest {
    pub contents: Vec<WireContent>,
    #[serde(
        rename = "systemInstruction",
        skip_serializing_if = "Option::is_none",
        serialize_with = "instruction_parts"
    )]
    pub system_instruction: Option<String>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
}

impl WireRequest {
    /// Byte length of the serialized body.
    pub fn serialized_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireContent {
    pub role: Role,
    pub parts: Vec<WirePart>,
}

impl WireContent {
    /// Map a message to its parts: text first, then every attachment that
    /// carries a payload. `None` when nothing is left to send.
    pub fn from_message(message: &Message) -> Option<Self> {
        let mut parts = Vec::with_capacity(1 + message.attachments.len());

        if !message.text().is_empty() {
            parts.push(WirePart::Text(message.text().to_string()));
        }

        for attachment in &message.attachments {
            if attachment.is_valid() {
                parts.push(WirePart::from_attachment(attachment));
            } else {
                tracing::debug!(
                    mime_type = %attachment.mime_type,
                    name = attachment.name.as_deref().unwrap_or(""),
                    "dropping attachment without payload"
                );
            }
        }

        if parts.is_empty() {
            None
        } else {
            Some(Self {
                role: message.role,
                parts,
            })
        }
    }

    /// All text parts concatenated.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                WirePart::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WirePart {
    Text(String),
    InlineData {
        #[serde(rename = "mimeType")]
        mime_type: String,
        data: String,
        /// Kept for adapters that can pass a file name along.
        #[serde(skip)]
        name: Option<String>,
    },
}

impl WirePart {
    fn from_attachment(attachment: &Attachment) -> Self {
        WirePart::InlineData {
            mime_type: attachment.mime_type.clone(),
            data: attachment.data.clone().unwrap_or_default(),
            name: attachment.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

impl GenerationConfig {
    pub fn include_thoughts(&self) -> bool {
        self.thinking_config
            .as_ref()
            .is_some_and(|t| t.include_thoughts)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub include_thoughts: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WireTool {
    GoogleSearch {},
}

fn instruction_parts<S>(instruction: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serde_json::json!({ "parts": [{ "text": instruction }] }).serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_precedes_attachments() {
        let msg = Message::user("caption").with_attachment(Attachment::new("image/png", "QUJD"));
        let content = WireContent::from_message(&msg).unwrap();
        let v = serde_json::to_value(&content).unwrap();
        assert_eq!(
            v,
            json!({
                "role": "user",
                "parts": [
                    {"text": "caption"},
                    {"inlineData": {"mimeType": "image/png", "data": "QUJD"}}
                ]
            })
        );
    }

    #[test]
    fn missing_payload_keeps_text() {
        let msg = Message::model("still here").with_attachment(Attachment {
            mime_type: "image/png".into(),
            name: Some("broken.png".into()),
            data: None,
        });
        let content = WireContent::from_message(&msg).unwrap();
        assert_eq!(content.parts, vec![WirePart::Text("still here".into())]);
        assert_eq!(content.role, Role::Model);
    }

    #[test]
    fn nothing_to_send_is_none() {
        let msg = Message {
            role: Role::User,
            text: Some(String::new()),
            attachments: vec![Attachment {
                mime_type: "image/png".into(),
                name: None,
                data: None,
            }],
        };
        assert!(WireContent::from_message(&msg).is_none());
    }

    #[test]
    fn request_serializes_in_gemini_shape() {
        let req = WireRequest {
            contents: vec![WireContent::from_message(&Message::user("hi")).unwrap()],
            system_instruction: Some("be nice".into()),
            generation_config: GenerationConfig {
                temperature: 0.5,
                max_output_tokens: Some(256),
                thinking_config: Some(ThinkingConfig {
                    include_thoughts: true,
                }),
            },
            tools: vec![WireTool::GoogleSearch {}],
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
                "systemInstruction": {"parts": [{"text": "be nice"}]},
                "generationConfig": {
                    "temperature": 0.5,
                    "maxOutputTokens": 256,
                    "thinkingConfig": {"includeThoughts": true}
                },
                "tools": [{"googleSearch": {}}]
            })
        );
        assert_eq!(req.serialized_len(), serde_json::to_vec(&req).unwrap().len());
    }

    #[test]
    fn optional_sections_are_omitted() {
        let req = WireRequest {
            contents: vec![],
            system_instruction: None,
            generation_config: GenerationConfig {
                temperature: 1.0,
                max_output_tokens: None,
                thinking_config: None,
            },
            tools: vec![],
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"contents": [], "generationConfig": {"temperature": 1.0}})
        );
        assert!(!req.generation_config.include_thoughts());
    }
}
