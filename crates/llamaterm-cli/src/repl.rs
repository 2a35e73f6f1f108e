//! Subcommand: `lt chat` -- interactive REPL.
//!
//! Keeps the running conversation in memory, streams answers as they
//! arrive, and saves every completed exchange to the conversation store so
//! it can be picked up again with `--resume`.

use std::io::{self, Write as _};

use anyhow::{Context, Result};
use llamaterm_client::{Message, Role};
use llamaterm_store::{Conversation, ConversationStore, HistoryEntry};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::helpers::{build_client, conversation_store, history_store, respond};

const CHAT_SYSTEM_PROMPT: &str = "You are a helpful assistant chatting in a terminal. \
    Keep answers concise and use plain text unless showing code.";

/// One line of REPL input, classified.
#[derive(Debug, PartialEq, Eq)]
enum ReplInput<'a> {
    Empty,
    Exit,
    Help,
    Clear,
    Save,
    UnknownCommand(&'a str),
    Prompt(&'a str),
}

fn parse_input(line: &str) -> ReplInput<'_> {
    let trimmed = line.trim();
    match trimmed {
        "" => ReplInput::Empty,
        "exit" | "quit" | "q" => ReplInput::Exit,
        "/help" => ReplInput::Help,
        "/clear" => ReplInput::Clear,
        "/save" => ReplInput::Save,
        cmd if cmd.starts_with('/') => ReplInput::UnknownCommand(cmd),
        prompt => ReplInput::Prompt(prompt),
    }
}

/// Run the interactive REPL.  `resume` is `Some("")` to pick up the most
/// recent conversation, or `Some(id_prefix)` for a specific one.
pub async fn cmd_chat(config: &AppConfig, resume: Option<String>) -> Result<()> {
    let client = build_client(config)?;
    let params = config.generation_params();
    let store = conversation_store()?;

    let mut conversation = resume_conversation(&store, resume.as_deref())?;
    let mut messages = match conversation {
        Some(ref conv) => {
            println!(
                "  Resuming: {} ({} messages)",
                conv.title,
                conv.exchange_len()
            );
            conv.messages.clone()
        }
        None => vec![Message::system(CHAT_SYSTEM_PROMPT)],
    };

    println!();
    println!("  LlamaTerm v{}", env!("CARGO_PKG_VERSION"));
    println!("  Model: {}", config.model);
    println!("  Type /help for commands, or 'exit' to quit.");
    println!();

    let stdin = io::stdin();
    let mut line_buf = String::new();

    loop {
        print!("> ");
        io::stdout().flush().ok();

        line_buf.clear();
        match stdin.read_line(&mut line_buf) {
            Ok(0) => {
                println!();
                info!("EOF received, exiting");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("  Error reading input: {e}");
                continue;
            }
        }

        match parse_input(&line_buf) {
            ReplInput::Empty => continue,
            ReplInput::Exit => break,
            ReplInput::Help => print_help(),
            ReplInput::Clear => {
                messages.retain(|m| m.role == Role::System);
                if messages.is_empty() {
                    messages.push(Message::system(CHAT_SYSTEM_PROMPT));
                }
                conversation = None;
                println!("  [+] Conversation cleared.");
            }
            ReplInput::Save => match save_to_history(&config.model, &messages) {
                Ok(()) => println!("  [+] Saved to history."),
                Err(e) => eprintln!("  [!] {e:#}"),
            },
            ReplInput::UnknownCommand(cmd) => {
                println!("  Unknown command: {cmd} (try /help)");
            }
            ReplInput::Prompt(prompt) => {
                messages.push(Message::user(prompt));

                match respond(&client, &params, &messages, config.stream).await {
                    Ok(answer) => {
                        messages.push(Message::assistant(answer));
                        println!();
                        if let Err(e) =
                            persist(&store, &mut conversation, &config.model, &messages)
                        {
                            warn!(error = %e, "failed to save conversation");
                        }
                    }
                    Err(e) => {
                        messages.pop();
                        eprintln!("\n  Error: {e:#}");
                        eprintln!();
                    }
                }
            }
        }
    }

    if let Some(ref conv) = conversation {
        println!("  Conversation saved as {}", conv.id);
    }
    Ok(())
}

fn resume_conversation(
    store: &ConversationStore,
    resume: Option<&str>,
) -> Result<Option<Conversation>> {
    match resume {
        None => Ok(None),
        Some("") => {
            let latest = store.latest().context("failed to list conversations")?;
            if latest.is_none() {
                println!("  No saved conversations; starting a new one.");
            }
            Ok(latest)
        }
        Some(id) => store
            .load(id)
            .map(Some)
            .with_context(|| format!("failed to load conversation `{id}`")),
    }
}

/// Save the current exchange, starting a new conversation record if this
/// session has none yet.
fn persist(
    store: &ConversationStore,
    conversation: &mut Option<Conversation>,
    model: &str,
    messages: &[Message],
) -> Result<()> {
    let conv = conversation.get_or_insert_with(|| Conversation::new(model, messages.to_vec()));
    conv.messages = messages.to_vec();
    conv.model = model.to_owned();
    store.save(conv)?;
    Ok(())
}

fn save_to_history(model: &str, messages: &[Message]) -> Result<()> {
    if !messages.iter().any(|m| m.role == Role::User) {
        anyhow::bail!("nothing to save yet");
    }
    history_store()?
        .append(HistoryEntry::new(model, messages.to_vec()))
        .context("failed to save history")
}

fn print_help() {
    println!("  Commands:");
    println!("    /help    Show this help");
    println!("    /clear   Start over (keeps the system prompt)");
    println!("    /save    Append this conversation to history");
    println!("    exit     Quit (also: quit, q)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_input() {
        assert_eq!(parse_input("\n"), ReplInput::Empty);
        assert_eq!(parse_input("exit\n"), ReplInput::Exit);
        assert_eq!(parse_input(" quit "), ReplInput::Exit);
        assert_eq!(parse_input("q"), ReplInput::Exit);
        assert_eq!(parse_input("/help"), ReplInput::Help);
        assert_eq!(parse_input("/clear"), ReplInput::Clear);
        assert_eq!(parse_input("/save"), ReplInput::Save);
        assert_eq!(parse_input("/nope"), ReplInput::UnknownCommand("/nope"));
        assert_eq!(parse_input("  what is rust?\n"), ReplInput::Prompt("what is rust?"));
        assert_eq!(parse_input("quit smoking tips"), ReplInput::Prompt("quit smoking tips"));
    }

    #[test]
    fn persist_creates_then_updates_one_conversation() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path());
        let mut conversation = None;

        let mut messages = vec![
            Message::system(CHAT_SYSTEM_PROMPT),
            Message::user("first question"),
            Message::assistant("first answer"),
        ];
        persist(&store, &mut conversation, "llama3.2", &messages).unwrap();
        let id = conversation.as_ref().unwrap().id.clone();

        messages.push(Message::user("second question"));
        messages.push(Message::assistant("second answer"));
        persist(&store, &mut conversation, "llama3.2", &messages).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].title, "first question");
        assert_eq!(listed[0].messages.len(), 5);
    }

    #[test]
    fn resume_latest_with_empty_store_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path());
        assert!(resume_conversation(&store, Some("")).unwrap().is_none());
        assert!(resume_conversation(&store, None).unwrap().is_none());
        assert!(resume_conversation(&store, Some("2024")).is_err());
    }
}
