//! History budgeting.
//!
//! Walks the history newest-first and greedily commits messages while they
//! fit, degrading each one (full → text-only → tail-truncated text) before
//! giving up. The first message that cannot fit stops the walk: everything
//! older is dropped so the selected history stays contiguous.

use crate::degrade::{strip_attachments, truncate_text};
use crate::size::{estimate, estimate_formatted};
use bt_domain::config::BudgetConfig;
use bt_domain::message::Message;
use serde::{Deserialize, Serialize};

/// What happened to one history message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Kept,
    Stripped,
    Truncated,
    Dropped,
}

/// Result of [`select`].
#[derive(Debug, Clone)]
pub struct Selection {
    /// Accepted messages, oldest first.
    pub messages: Vec<Message>,
    /// Formatted bytes committed by the accepted messages.
    pub committed_bytes: usize,
    /// One entry per input message, in input order.
    pub outcomes: Vec<Outcome>,
}

/// Per-call accumulator. Created fresh for every selection.
struct BudgetState {
    committed: usize,
    /// Newest first while walking.
    accepted: Vec<Message>,
    outcomes: Vec<Outcome>,
}

impl BudgetState {
    fn new(len: usize) -> Self {
        Self {
            committed: 0,
            accepted: Vec::new(),
            outcomes: vec![Outcome::Dropped; len],
        }
    }

    fn accept(&mut self, index: usize, candidate: Candidate) {
        self.committed += candidate.size;
        self.outcomes[index] = candidate.outcome;
        self.accepted.push(candidate.message);
    }

    fn finish(mut self) -> Selection {
        self.accepted.reverse();
        Selection {
            messages: self.accepted,
            committed_bytes: self.committed,
            outcomes: self.outcomes,
        }
    }
}

struct Candidate {
    message: Message,
    size: usize,
    outcome: Outcome,
}

/// Select the newest contiguous run of `history` that fits in `budget` bytes.
pub fn select(history: &[Message], budget: usize, config: &BudgetConfig) -> Selection {
    let mut state = BudgetState::new(history.len());

    for (index, message) in history.iter().enumerate().rev() {
        let remaining = budget.saturating_sub(state.committed);
        match fit(message, remaining, config) {
            Some(candidate) => {
                if candidate.outcome != Outcome::Kept {
                    tracing::debug!(
                        index,
                        outcome = ?candidate.outcome,
                        size = candidate.size,
                        "history message degraded to fit budget"
                    );
                }
                state.accept(index, candidate);
            }
            None => {
                tracing::debug!(
                    index,
                    older_dropped = index,
                    remaining,
                    "history message does not fit, stopping"
                );
                break;
            }
        }
    }

    state.finish()
}

/// Try the message at decreasing fidelity; `None` when nothing fits.
fn fit(message: &Message, remaining: usize, config: &BudgetConfig) -> Option<Candidate> {
    let factor = config.inflation_factor;

    let size = estimate_formatted(message, factor);
    if size <= remaining {
        return Some(Candidate {
            message: message.clone(),
            size,
            outcome: Outcome::Kept,
        });
    }

    let stripped = if message.has_attachments() {
        let stripped = strip_attachments(message);
        let size = estimate_formatted(&stripped, factor);
        if size <= remaining {
            return Some(Candidate {
                message: stripped,
                size,
                outcome: Outcome::Stripped,
            });
        }
        stripped
    } else {
        message.clone()
    };

    if estimate(&stripped) > config.truncation_threshold_bytes {
        let truncated = truncate_text(&stripped, config.truncate_keep_chars);
        let size = estimate_formatted(&truncated, factor);
        if size <= remaining {
            return Some(Candidate {
                message: truncated,
                size,
                outcome: Outcome::Truncated,
            });
        }
    }

    None
}
