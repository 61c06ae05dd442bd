use crate::budget::{self, Outcome};
use crate::instruction;
use crate::report::{BudgetReport, MessageReport};
use crate::size;
use crate::wire::{GenerationConfig, ThinkingConfig, WireContent, WireRequest, WireTool};
use bt_domain::config::{BudgetConfig, ChatSettings, Persona};
use bt_domain::error::{Error, Result};
use bt_domain::message::Message;

/// Per-turn switches supplied by the caller alongside settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnFlags {
    pub study_mode: bool,
    pub show_thoughts: bool,
    /// The user explicitly asked for a web search this turn.
    pub search_requested: bool,
}

/// Output of [`PayloadBuilder::build`].
#[derive(Debug, Clone)]
pub struct BuiltPayload {
    pub request: WireRequest,
    pub report: BudgetReport,
}

/// Deterministic request builder.
///
/// Pure function of its inputs: history, settings, persona and flags in,
/// size-bounded wire request plus report out. No I/O.
pub struct PayloadBuilder {
    budget: BudgetConfig,
}

impl PayloadBuilder {
    pub fn new(budget: BudgetConfig) -> Self {
        Self { budget }
    }

    /// Build with the size measured on the Gemini-shaped body.
    pub fn build(
        &self,
        history: &[Message],
        settings: &ChatSettings,
        persona: &Persona,
        flags: TurnFlags,
    ) -> Result<BuiltPayload> {
        self.build_measured(history, settings, persona, flags, WireRequest::serialized_len)
    }

    /// Build with `body_len` giving the size of the body that is actually
    /// sent. The scaffold, the trim loop and the final ceiling check all use
    /// it; the per-message estimates only pick the candidates.
    pub fn build_measured<M>(
        &self,
        history: &[Message],
        settings: &ChatSettings,
        persona: &Persona,
        flags: TurnFlags,
        body_len: M,
    ) -> Result<BuiltPayload>
    where
        M: Fn(&WireRequest) -> usize,
    {
        let system_instruction = instruction::assemble(
            persona,
            flags.study_mode,
            flags.search_requested,
            &settings.search,
        );
        let generation_config = resolve_generation_config(settings, persona, flags);
        let tools = if flags.search_requested || settings.search.enabled_by_default {
            vec![WireTool::GoogleSearch {}]
        } else {
            Vec::new()
        };

        // Everything but the history, serialized once up front.
        let mut request = WireRequest {
            contents: Vec::new(),
            system_instruction,
            generation_config,
            tools,
        };
        let scaffold_bytes = body_len(&request);
        let system_instruction_bytes = request
            .system_instruction
            .as_ref()
            .map(|s| serde_json::json!({ "parts": [{ "text": s }] }).to_string().len())
            .unwrap_or(0);
        let config_overhead_bytes = scaffold_bytes.saturating_sub(system_instruction_bytes);
        let budget_bytes = self.budget.max_payload_bytes.saturating_sub(scaffold_bytes);

        // Context-length cap: only the newest N messages are candidates.
        let capped = settings
            .context_length
            .map(|n| history.len().saturating_sub(n))
            .unwrap_or(0);
        let window = &history[capped..];

        let selection = budget::select(window, budget_bytes, &self.budget);

        let mut outcomes: Vec<Outcome> = vec![Outcome::Dropped; capped];
        outcomes.extend_from_slice(&selection.outcomes);

        // History index of every accepted message, oldest first.
        let accepted = outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| **o != Outcome::Dropped)
            .map(|(i, _)| i);
        let mut content_indices: Vec<usize> = Vec::new();
        for (index, message) in accepted.zip(selection.messages.iter()) {
            if let Some(content) = WireContent::from_message(message) {
                content_indices.push(index);
                request.contents.push(content);
            }
        }
        let mut serialized_bytes = body_len(&request);

        // The inflation factor is an estimate; per-part envelopes of many
        // tiny messages can outgrow it. Drop from the old end until it fits.
        while serialized_bytes > self.budget.max_payload_bytes && !content_indices.is_empty() {
            let oldest = content_indices.remove(0);
            for outcome in &mut outcomes[..=oldest] {
                *outcome = Outcome::Dropped;
            }
            request.contents.remove(0);
            serialized_bytes = body_len(&request);
            tracing::warn!(
                index = oldest,
                serialized_bytes,
                "wire size exceeded estimate, dropped oldest message"
            );
        }

        let messages = history
            .iter()
            .zip(outcomes)
            .enumerate()
            .map(|(index, (msg, outcome))| MessageReport {
                index,
                role: msg.role,
                raw_bytes: size::estimate(msg),
                attachments: msg.attachments.len(),
                outcome,
            })
            .collect();

        let report = BudgetReport {
            max_payload_bytes: self.budget.max_payload_bytes,
            system_instruction_bytes,
            config_overhead_bytes,
            budget_bytes,
            committed_bytes: selection.committed_bytes,
            serialized_bytes,
            capped_messages: capped,
            messages,
        };
        report.emit();

        if serialized_bytes > self.budget.max_payload_bytes {
            return Err(Error::PayloadTooLarge {
                size: serialized_bytes,
                max: self.budget.max_payload_bytes,
            });
        }

        Ok(BuiltPayload { request, report })
    }
}

/// Persona overrides win; global settings are the fallback.
pub fn resolve_generation_config(
    settings: &ChatSettings,
    persona: &Persona,
    flags: TurnFlags,
) -> GenerationConfig {
    GenerationConfig {
        temperature: persona.temperature.unwrap_or(settings.temperature),
        max_output_tokens: persona.max_tokens.or(settings.max_tokens),
        thinking_config: flags.show_thoughts.then_some(ThinkingConfig {
            include_thoughts: true,
        }),
    }
}
