pub mod chat;
pub mod config;
pub mod models;
pub mod payload;
pub mod title;

use anyhow::Context;
use bt_domain::config::{Config, Persona};
use bt_domain::error::Error;
use bt_domain::locale::Locale;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Banter, a size-budgeted chat client with API-key failover.
#[derive(Debug, Parser)]
#[command(name = "banter", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send a message and stream the reply.
    Chat {
        /// The message to send.
        message: String,
        /// Conversation history (JSON). Updated with the new turn on success.
        #[arg(long)]
        history: Option<PathBuf>,
        /// Persona file (TOML); defaults to the `[persona]` section.
        #[arg(long)]
        persona: Option<PathBuf>,
        /// Model override for this turn.
        #[arg(long)]
        model: Option<String>,
        /// Tutor-style answers.
        #[arg(long)]
        study: bool,
        /// Ask the model for its reasoning and print it dimmed to stderr.
        #[arg(long)]
        thoughts: bool,
        /// Enable web search for this turn.
        #[arg(long)]
        search: bool,
        /// Print chunks as JSON lines instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Build the request for a history without sending it.
    Payload {
        /// Conversation history (JSON).
        history: PathBuf,
        /// Persona file (TOML); defaults to the `[persona]` section.
        #[arg(long)]
        persona: Option<PathBuf>,
        /// Also print the request body.
        #[arg(long)]
        body: bool,
    },
    /// List the models a provider offers.
    Models {
        /// Provider ID from the config (defaults to the chat provider).
        #[arg(long)]
        provider: Option<String>,
    },
    /// Generate a conversation title for a prompt.
    Title {
        /// First user message of the conversation.
        prompt: String,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from `BANTER_CONFIG` (or `banter.toml`), with
/// environment overrides applied. A missing file yields the defaults.
/// Returns the config and the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("BANTER_CONFIG").unwrap_or_else(|_| "banter.toml".into());
    let mut config = read_config(Path::new(&config_path))?;
    config.apply_env_overrides();
    Ok((config, config_path))
}

pub fn read_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn resolve_persona(config: &Config, path: Option<&Path>) -> anyhow::Result<Persona> {
    match path {
        Some(p) => crate::history::load_persona(p),
        None => Ok(config.persona.clone()),
    }
}

// ── User-facing failures ──────────────────────────────────────────────

/// Log the raw error and return the localized sentence shown to the user.
pub fn user_facing(e: &Error, locale: Locale) -> String {
    tracing::debug!(kind = ?e.kind(), status = ?e.status(), error = %e, "command failed");
    e.user_message(locale)
}

fn exit_with(e: &Error, locale: Locale) -> ! {
    eprintln!("error: {}", user_facing(e, locale));
    std::process::exit(1);
}
