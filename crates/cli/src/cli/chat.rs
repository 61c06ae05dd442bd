//! `banter chat`: one turn of a conversation.
//!
//! Builds the size-bounded request, streams the reply through the key
//! rotation executor and prints it. The rotation cursor is loaded from and
//! saved to the cursor store so the next invocation starts on the key that
//! last worked.

use std::io::Write;
use std::path::PathBuf;

use bt_domain::config::Config;
use bt_domain::message::Message;
use bt_domain::stream::Chunk;
use bt_payload::{PayloadBuilder, TurnFlags};
use bt_providers::ChatClient;
use futures_util::StreamExt;

use crate::history::{load_history, save_history};
use crate::state::CursorStore;

pub struct ChatArgs {
    pub message: String,
    pub history: Option<PathBuf>,
    pub persona: Option<PathBuf>,
    pub model: Option<String>,
    pub flags: TurnFlags,
    pub json: bool,
}

/// Accumulated outcome of a streamed reply.
#[derive(Debug, Default, PartialEq)]
pub struct Reply {
    pub text: String,
    pub error: Option<String>,
    pub finish_reason: Option<String>,
}

impl Reply {
    pub fn absorb(&mut self, chunk: &Chunk) {
        match chunk {
            Chunk::Content { text } => self.text.push_str(text),
            Chunk::Thought { .. } => {}
            Chunk::Error { message, .. } => self.error = Some(message.clone()),
            Chunk::End { finish_reason, .. } => self.finish_reason = finish_reason.clone(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

pub async fn chat(mut config: Config, args: ChatArgs) -> anyhow::Result<()> {
    let mut history = match &args.history {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };
    let persona = super::resolve_persona(&config, args.persona.as_deref())?;
    if let Some(model) = &args.model {
        config.chat.model = Some(model.clone());
    }

    let locale = config.chat.locale;
    let client = ChatClient::from_config(&config).unwrap_or_else(|e| super::exit_with(&e, locale));

    history.push(Message::user(args.message.clone()));
    let built = PayloadBuilder::new(config.budget.clone())
        .build_measured(&history, &config.chat, &persona, args.flags, |req| {
            client.body_len(req)
        })
        .unwrap_or_else(|e| super::exit_with(&e, locale));

    let store = CursorStore::default_location()?;
    let mut cursor = store.load(client.provider_id())?;

    let mut stream = client.stream_chat(&mut cursor, &built.request).await;

    let mut reply = Reply::default();
    while let Some(chunk) = stream.next().await {
        reply.absorb(&chunk);
        if args.json {
            println!("{}", serde_json::to_string(&chunk)?);
            continue;
        }
        match &chunk {
            Chunk::Content { text } => {
                print!("{text}");
                std::io::stdout().flush().ok();
            }
            Chunk::Thought { text } => {
                // Dim output to stderr so it doesn't pollute stdout.
                eprint!("\x1b[2m{text}\x1b[0m");
                std::io::stderr().flush().ok();
            }
            Chunk::Error { message, .. } => {
                eprintln!("error: {message}");
            }
            Chunk::End { .. } => {
                if !reply.text.is_empty() {
                    println!();
                }
            }
        }
    }

    if let Err(e) = store.save(client.provider_id(), cursor) {
        tracing::warn!(error = %e, "saving rotation cursor failed");
    }

    if !reply.succeeded() {
        std::process::exit(1);
    }

    if let Some(path) = &args.history {
        history.push(Message::model(reply.text));
        save_history(path, &history)?;
    }
    Ok(())
}
