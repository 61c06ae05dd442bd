use bt_cli::cli::chat::ChatArgs;
use bt_cli::cli::{Cli, Command, ConfigCommand};
use bt_payload::TurnFlags;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing();

    let (config, config_path) = bt_cli::cli::load_config()?;

    match cli.command {
        Command::Chat {
            message,
            history,
            persona,
            model,
            study,
            thoughts,
            search,
            json,
        } => {
            let args = ChatArgs {
                message,
                history,
                persona,
                model,
                flags: TurnFlags {
                    study_mode: study,
                    show_thoughts: thoughts,
                    search_requested: search,
                },
                json,
            };
            bt_cli::cli::chat::chat(config, args).await
        }
        Command::Payload {
            history,
            persona,
            body,
        } => bt_cli::cli::payload::payload(&config, &history, persona.as_deref(), body),
        Command::Models { provider } => {
            bt_cli::cli::models::models(&config, provider.as_deref()).await
        }
        Command::Title { prompt } => bt_cli::cli::title::title(&config, &prompt).await,
        Command::Config(ConfigCommand::Validate) => {
            if !bt_cli::cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => bt_cli::cli::config::show(&config),
    }
}

/// Compact, human-readable logs on stderr. `RUST_LOG` overrides the level.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
