use crate::budget::Outcome;
use bt_domain::message::Role;
use bt_domain::trace::TraceEvent;
use serde::{Deserialize, Serialize};

/// Per-message report within a payload build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReport {
    /// Index in the caller's history.
    pub index: usize,
    pub role: Role,
    pub raw_bytes: usize,
    pub attachments: usize,
    pub outcome: Outcome,
}

/// Machine-readable account of how a request was budgeted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetReport {
    pub max_payload_bytes: usize,
    pub system_instruction_bytes: usize,
    /// Generation config, tools and envelope scaffolding.
    pub config_overhead_bytes: usize,
    /// Bytes left for history after instruction and scaffolding.
    pub budget_bytes: usize,
    pub committed_bytes: usize,
    pub serialized_bytes: usize,
    /// Messages cut by the context-length cap before byte budgeting.
    pub capped_messages: usize,
    pub messages: Vec<MessageReport>,
}

impl BudgetReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.messages.iter().filter(|m| m.outcome == outcome).count()
    }

    pub fn emit(&self) {
        TraceEvent::PayloadBuilt {
            history_messages: self.messages.len(),
            kept: self.count(Outcome::Kept),
            stripped: self.count(Outcome::Stripped),
            truncated: self.count(Outcome::Truncated),
            dropped: self.count(Outcome::Dropped),
            budget_bytes: self.budget_bytes,
            committed_bytes: self.committed_bytes,
            serialized_bytes: self.serialized_bytes,
        }
        .emit();
    }
}
