use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Payload budget heuristics
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Size limits and heuristics used when fitting history into a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Hard ceiling on the serialized request body.
    #[serde(default = "d_200mib")]
    pub max_payload_bytes: usize,
    /// Raw message bytes are multiplied by this to approximate the wire
    /// form (role tags, array structure, provider envelope). An upper bound,
    /// not a measurement.
    #[serde(default = "d_1_8")]
    pub inflation_factor: f64,
    /// Text-only messages larger than this may be tail-truncated.
    #[serde(default = "d_500kb")]
    pub truncation_threshold_bytes: usize,
    /// Number of trailing characters kept when a message is truncated.
    #[serde(default = "d_2000")]
    pub truncate_keep_chars: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: d_200mib(),
            inflation_factor: d_1_8(),
            truncation_threshold_bytes: d_500kb(),
            truncate_keep_chars: d_2000(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_200mib() -> usize {
    200 * 1024 * 1024
}
fn d_1_8() -> f64 {
    1.8
}
fn d_500kb() -> usize {
    500 * 1024
}
fn d_2000() -> usize {
    2_000
}
