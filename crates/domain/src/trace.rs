use serde::Serialize;

/// Structured trace events emitted across all Banter crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    PayloadBuilt {
        history_messages: usize,
        kept: usize,
        stripped: usize,
        truncated: usize,
        dropped: usize,
        budget_bytes: usize,
        committed_bytes: usize,
        serialized_bytes: usize,
    },
    KeyAttemptFailed {
        provider: String,
        key_index: usize,
        key_suffix: String,
        status: Option<u16>,
        error: String,
    },
    KeysExhausted {
        provider: String,
        attempts: usize,
    },
    LlmRequest {
        provider: String,
        model: String,
        streaming: bool,
        key_index: usize,
        duration_ms: u64,
    },
    TitleFallback {
        reason: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "bt_event");
    }
}
