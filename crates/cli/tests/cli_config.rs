use bt_cli::cli::{read_config, Cli, Command, ConfigCommand};
use bt_cli::history::{load_history, save_history};
use bt_domain::message::Message;
use bt_payload::{PayloadBuilder, TurnFlags};
use clap::Parser;

#[test]
fn chat_flags_parse() {
    let cli = Cli::try_parse_from([
        "banter", "chat", "hello there", "--history", "h.json", "--study", "--search", "--json",
    ])
    .unwrap();
    match cli.command {
        Command::Chat {
            message,
            history,
            study,
            thoughts,
            search,
            json,
            model,
            ..
        } => {
            assert_eq!(message, "hello there");
            assert_eq!(history.unwrap().to_str(), Some("h.json"));
            assert!(study && search && json);
            assert!(!thoughts);
            assert!(model.is_none());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn config_subcommands_parse() {
    let cli = Cli::try_parse_from(["banter", "config", "validate"]).unwrap();
    assert!(matches!(cli.command, Command::Config(ConfigCommand::Validate)));
    assert!(Cli::try_parse_from(["banter"]).is_err());
}

#[test]
fn missing_config_file_yields_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let config = read_config(&tmp.path().join("absent.toml")).unwrap();
    assert_eq!(config.budget.max_payload_bytes, 200 * 1024 * 1024);
}

#[test]
fn config_file_drives_payload_building() {
    let tmp = tempfile::tempdir().unwrap();
    let config_path = tmp.path().join("banter.toml");
    std::fs::write(
        &config_path,
        r#"
[budget]
max_payload_bytes = 4096

[chat]
provider = "gemini"
context_length = 2

[persona]
name = "Tutor"
system_prompt = "Be brief."

[[providers]]
id = "gemini"
kind = "google"
base_url = "https://generativelanguage.googleapis.com/v1beta"
"#,
    )
    .unwrap();
    let config = read_config(&config_path).unwrap();

    let history_path = tmp.path().join("chat.json");
    save_history(
        &history_path,
        &[Message::user("one"), Message::model("two"), Message::user("three")],
    )
    .unwrap();
    let history = load_history(&history_path).unwrap();

    let built = PayloadBuilder::new(config.budget.clone())
        .build(&history, &config.chat, &config.persona, TurnFlags::default())
        .unwrap();
    assert_eq!(built.request.contents.len(), 2);
    assert_eq!(built.report.capped_messages, 1);
    assert!(built.request.serialized_len() <= 4096);
}
