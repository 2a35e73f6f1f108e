//! Shared helper functions used across CLI subcommands.
//!
//! Includes tracing initialization, input handling, store locations and the
//! common "send and render" path.

use std::io::{self, IsTerminal, Read, Write as _};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use llamaterm_client::{GenerationParams, LlmClient, Message};
use llamaterm_store::{ConversationStore, HistoryStore};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, config_dir};

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
///
/// Logs go to stderr so streamed answers on stdout stay clean.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Join positional words, or read all of stdin when none were given and
/// stdin is piped.
pub fn read_input(words: &[String], what: &str) -> Result<String> {
    let joined = words.join(" ");
    if !joined.trim().is_empty() {
        return Ok(joined.trim().to_owned());
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        bail!("no {what} given (pass it as an argument or pipe it on stdin)");
    }

    let mut buf = String::new();
    stdin
        .lock()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;

    let trimmed = buf.trim();
    if trimmed.is_empty() {
        bail!("no {what} given (stdin was empty)");
    }
    Ok(trimmed.to_owned())
}

/// Ask a yes/no question on stdout; anything but `y`/`yes` is a no.
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush().ok();

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read confirmation")?;
    Ok(is_yes(&line))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

fn data_dir() -> Result<PathBuf> {
    config_dir().context("cannot locate config directory (set HOME or XDG_CONFIG_HOME)")
}

pub fn history_store() -> Result<HistoryStore> {
    Ok(HistoryStore::new(data_dir()?.join("history.json")))
}

pub fn conversation_store() -> Result<ConversationStore> {
    Ok(ConversationStore::new(data_dir()?.join("conversations")))
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Build a client for the effective configuration.
pub fn build_client(config: &AppConfig) -> Result<LlmClient> {
    LlmClient::new(config.client_config()).context("failed to create LLM client")
}

/// Send `messages`, print the answer to stdout (incrementally when
/// `stream` is set) and return it.
pub async fn respond(
    client: &LlmClient,
    params: &GenerationParams,
    messages: &[Message],
    stream: bool,
) -> Result<String> {
    if stream {
        let mut answer = String::new();
        let mut stdout = io::stdout();
        client
            .chat_complete_streaming(params, messages, |fragment| {
                answer.push_str(fragment);
                print!("{fragment}");
                stdout.flush().ok();
            })
            .await
            .context("streaming request failed")?;
        println!();
        return Ok(answer);
    }

    let resp = client
        .chat_complete(params, messages)
        .await
        .context("request failed")?;
    let answer = resp.first_content().unwrap_or_default().to_owned();
    println!("{answer}");
    Ok(answer)
}

/// Send `messages` without printing anything and return the answer.
pub async fn complete_quietly(
    client: &LlmClient,
    params: &GenerationParams,
    messages: &[Message],
) -> Result<String> {
    let resp = client
        .chat_complete(params, messages)
        .await
        .context("request failed")?;
    Ok(resp.first_content().unwrap_or_default().to_owned())
}
