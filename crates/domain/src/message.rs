use serde::{Deserialize, Deserializer, Serialize};

/// Who authored a message. The two roles are distinguished upstream; adapters
/// map them onto provider vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "assistant")]
    Model,
}

/// An inline file attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(alias = "mimeType")]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Base64 payload. Anything that is not a JSON string is read as `None`.
    #[serde(
        default,
        deserialize_with = "lenient_payload",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<String>,
}

impl Attachment {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            name: None,
            data: Some(data.into()),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Only attachments that carry a payload are sent to providers.
    pub fn is_valid(&self) -> bool {
        self.data.is_some()
    }

    /// Transient size proxy: length of the base64 string.
    pub fn payload_len(&self) -> usize {
        self.data.as_ref().map(|d| d.len()).unwrap_or(0)
    }
}

fn lenient_payload<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => Some(s),
        None | Some(serde_json::Value::Null) => None,
        Some(other) => {
            tracing::warn!(
                payload_type = json_type_name(&other),
                "attachment payload is not a string, ignoring it"
            );
            None
        }
    })
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// A message in the conversation history.
///
/// Callers own their history; budgeting only ever produces derived copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

// ── Convenience constructors ───────────────────────────────────────

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: Some(text.into()),
            attachments: Vec::new(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: Some(text.into()),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// The text content, or `""` when absent.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_role_is_an_alias_for_model() {
        let msg: Message = serde_json::from_str(r#"{"role":"assistant","text":"hi"}"#).unwrap();
        assert_eq!(msg.role, Role::Model);
        let out = serde_json::to_value(&msg).unwrap();
        assert_eq!(out["role"], "model");
    }

    #[test]
    fn non_string_payload_becomes_absent() {
        let msg: Message = serde_json::from_str(
            r#"{
                "role": "user",
                "text": "look",
                "attachments": [
                    {"mimeType": "image/png", "data": 42},
                    {"mime_type": "image/png"},
                    {"mime_type": "image/png", "data": null},
                    {"mime_type": "image/png", "name": "a.png", "data": "QUJD"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(msg.attachments.len(), 4);
        assert!(!msg.attachments[0].is_valid());
        assert!(!msg.attachments[1].is_valid());
        assert!(!msg.attachments[2].is_valid());
        assert!(msg.attachments[3].is_valid());
        assert_eq!(msg.attachments[3].payload_len(), 4);
        assert_eq!(msg.attachments[3].name.as_deref(), Some("a.png"));
    }

    #[test]
    fn missing_text_reads_as_empty() {
        let msg: Message = serde_json::from_str(r#"{"role":"user"}"#).unwrap();
        assert_eq!(msg.text(), "");
        assert!(!msg.has_attachments());
    }
}
