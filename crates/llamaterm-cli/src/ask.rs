//! One-shot question subcommands: `ask`, `copy`, `explain` and `fix`.

use std::path::Path;

use anyhow::{Context, Result};
use llamaterm_client::Message;
use llamaterm_store::HistoryEntry;
use tracing::warn;

use crate::clipboard::copy_to_clipboard;
use crate::config::AppConfig;
use crate::helpers::{build_client, history_store, read_input, respond};

const ASK_SYSTEM_PROMPT: &str = "You are a helpful assistant running in a terminal. \
    Give clear, concise answers. Use plain text; avoid markdown formatting unless \
    showing code.";

const EXPLAIN_SYSTEM_PROMPT: &str = "You are an expert code reviewer. Explain what the \
    given file does: its purpose, its main components and how they fit together. \
    Point out anything unusual, risky or worth improving. Be concise and concrete.";

const FIX_SYSTEM_PROMPT: &str = "You are an expert debugger. For the error you are given, \
    answer in four short parts:\n\
    1. What the error means.\n\
    2. The most likely cause.\n\
    3. How to fix it, with exact commands or code.\n\
    4. How to avoid it in the future.";

/// Subcommand: `lt ask` (and `lt copy`).
pub async fn cmd_ask(config: &AppConfig, words: &[String], copy: bool) -> Result<()> {
    let question = read_input(words, "question")?;
    let messages = vec![Message::system(ASK_SYSTEM_PROMPT), Message::user(question)];
    send_and_record(config, messages, copy).await
}

/// Subcommand: `lt explain <file> [question...]`.
pub async fn cmd_explain(config: &AppConfig, file: &Path, question: &[String]) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let question = question.join(" ");
    let prompt = explain_prompt(file, &content, question.trim());
    let messages = vec![Message::system(EXPLAIN_SYSTEM_PROMPT), Message::user(prompt)];
    send_and_record(config, messages, false).await
}

/// Subcommand: `lt fix [error...]`.
pub async fn cmd_fix(config: &AppConfig, words: &[String]) -> Result<()> {
    let error = read_input(words, "error message")?;
    let prompt = format!("I got this error:\n\n```\n{error}\n```\n\nHow do I fix it?");
    let messages = vec![Message::system(FIX_SYSTEM_PROMPT), Message::user(prompt)];
    send_and_record(config, messages, false).await
}

/// Send, print, optionally copy, then append the exchange to history.
async fn send_and_record(config: &AppConfig, mut messages: Vec<Message>, copy: bool) -> Result<()> {
    let client = build_client(config)?;
    let answer = respond(
        &client,
        &config.generation_params(),
        &messages,
        config.stream,
    )
    .await?;

    if copy {
        match copy_to_clipboard(&answer).await {
            Ok(()) => eprintln!("  [+] Copied to clipboard"),
            Err(e) => eprintln!("  [!] Could not copy to clipboard: {e:#}"),
        }
    }

    messages.push(Message::assistant(answer));
    if let Err(e) = history_store().and_then(|store| {
        store
            .append(HistoryEntry::new(&config.model, messages))
            .context("failed to save history")
    }) {
        warn!(error = %e, "history not saved");
    }
    Ok(())
}

fn explain_prompt(file: &Path, content: &str, question: &str) -> String {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    let file_type = detect_file_type(file);

    let mut prompt = format!("File: {name}\n\n```{file_type}\n{content}\n```\n\n");
    if question.is_empty() {
        prompt.push_str("Explain this file.");
    } else {
        prompt.push_str(question);
    }
    prompt
}

/// Code-fence language for a file, from its extension or well-known name.
pub fn detect_file_type(file: &Path) -> &'static str {
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    match name {
        "Dockerfile" => return "dockerfile",
        "Makefile" | "makefile" => return "makefile",
        _ => {}
    }

    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "rs" => "rust",
        "go" => "go",
        "py" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" => "typescript",
        "tsx" => "tsx",
        "jsx" => "jsx",
        "java" => "java",
        "kt" => "kotlin",
        "swift" => "swift",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "sh" | "bash" | "zsh" => "bash",
        "sql" => "sql",
        "html" | "htm" => "html",
        "css" => "css",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "md" => "markdown",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_types_from_extension() {
        assert_eq!(detect_file_type(Path::new("src/main.rs")), "rust");
        assert_eq!(detect_file_type(Path::new("app.PY")), "python");
        assert_eq!(detect_file_type(Path::new("config.yml")), "yaml");
        assert_eq!(detect_file_type(Path::new("deploy.sh")), "bash");
        assert_eq!(detect_file_type(Path::new("Dockerfile")), "dockerfile");
        assert_eq!(detect_file_type(Path::new("notes")), "");
        assert_eq!(detect_file_type(Path::new("data.unknown")), "");
    }

    #[test]
    fn explain_prompt_embeds_file_in_fence() {
        let prompt = explain_prompt(Path::new("/tmp/lib.rs"), "fn main() {}", "");
        assert!(prompt.starts_with("File: lib.rs\n\n```rust\nfn main() {}\n```"));
        assert!(prompt.ends_with("Explain this file."));

        let prompt = explain_prompt(Path::new("lib.rs"), "x", "why is this slow?");
        assert!(prompt.ends_with("why is this slow?"));
    }
}
