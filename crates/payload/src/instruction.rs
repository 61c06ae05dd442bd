//! System-instruction assembly.
//!
//! Pieces are concatenated in a fixed order (memory, mode directive, persona
//! prompt, search directive), empty pieces skipped, joined by a blank line.

use bt_domain::config::{Persona, SearchSettings};

const SEPARATOR: &str = "\n\n";

/// Directive added in study mode.
pub const STUDY_MODE_DIRECTIVE: &str = "\
You are in study mode. Act as a patient tutor: guide the user toward the \
answer with questions and hints instead of giving it away, check their \
understanding step by step, and keep explanations short and concrete.";

/// Directive added when the user explicitly asked for a web search this turn.
pub const SEARCH_REQUESTED_DIRECTIVE: &str = "\
The user explicitly asked you to search the web. Use the search tool before \
answering, rely on the retrieved results, and cite the sources you used.";

/// Directive added when search is on by default and the optimizer is enabled.
pub const SEARCH_OPTIMIZER_DIRECTIVE: &str = "\
A web search tool is available. Only search when the question depends on \
recent events or facts you are unsure about; otherwise answer directly. \
When you do search, cite the sources you used.";

/// Format the persona memory block.
pub fn format_memory(memories: &[String]) -> String {
    let mut block = String::from("=== MEMORY ===\n");
    block.push_str("Things you remember about the user:\n");
    for memory in memories {
        block.push_str("- ");
        block.push_str(memory.trim());
        block.push('\n');
    }
    block.push_str("=== END_MEMORY ===");
    block
}

/// Pick the search directive. An explicit request this turn wins over the
/// default-search optimizer.
pub fn search_directive(search_requested: bool, search: &SearchSettings) -> Option<&'static str> {
    if search_requested {
        Some(SEARCH_REQUESTED_DIRECTIVE)
    } else if search.enabled_by_default && search.optimizer {
        Some(SEARCH_OPTIMIZER_DIRECTIVE)
    } else {
        None
    }
}

/// Assemble the full system instruction. `None` when every piece is empty.
pub fn assemble(
    persona: &Persona,
    study_mode: bool,
    search_requested: bool,
    search: &SearchSettings,
) -> Option<String> {
    let mut pieces: Vec<String> = Vec::new();

    let memories: Vec<String> = persona
        .memories
        .iter()
        .filter(|m| !m.trim().is_empty())
        .cloned()
        .collect();
    if persona.memory_enabled && !memories.is_empty() {
        pieces.push(format_memory(&memories));
    }

    if study_mode {
        pieces.push(STUDY_MODE_DIRECTIVE.to_string());
    }

    if !persona.system_prompt.trim().is_empty() {
        pieces.push(persona.system_prompt.clone());
    }

    if let Some(directive) = search_directive(search_requested, search) {
        pieces.push(directive.to_string());
    }

    let joined = pieces.join(SEPARATOR);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
