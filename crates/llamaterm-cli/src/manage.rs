//! Housekeeping subcommands: `models`, `config`, `history`,
//! `conversations` and `version`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use llamaterm_client::Role;

use crate::cli::{ConfigAction, ConversationAction, HistoryAction};
use crate::config::{AppConfig, DEFAULT_CONFIG_TEMPLATE, default_config_path, mask_api_key};
use crate::helpers::{build_client, confirm, conversation_store, history_store};

/// Entries shown by `lt history list`.
const HISTORY_LIST_LIMIT: usize = 10;

/// Preview width for history and conversation listings.
const PREVIEW_CHARS: usize = 50;

// ---------------------------------------------------------------------------
// models
// ---------------------------------------------------------------------------

/// Subcommand: `lt models`.
pub async fn cmd_models(config: &AppConfig) -> Result<()> {
    let client = build_client(config)?;
    let mut models = client
        .list_models()
        .await
        .with_context(|| format!("failed to list models from {}", client.base_url()))?;
    models.sort_by(|a, b| a.id.cmp(&b.id));

    if models.is_empty() {
        println!("  No models reported by {}", client.base_url());
        return Ok(());
    }

    println!("  Models at {}:", client.base_url());
    for model in &models {
        let marker = if model.id == config.model { "*" } else { " " };
        if model.owned_by.is_empty() {
            println!("  {marker} {}", model.id);
        } else {
            println!("  {marker} {:<40} {}", model.id, model.owned_by);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

/// Subcommand: `lt config <action>`.
pub fn cmd_config(config: &AppConfig, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            for line in render_config(config) {
                println!("  {line}");
            }
            Ok(())
        }
        ConfigAction::Path => {
            let path = config_path()?;
            if path.exists() {
                println!("{}", path.display());
            } else {
                println!("{} (not created yet; run `lt config init`)", path.display());
            }
            Ok(())
        }
        ConfigAction::Init => {
            let path = config_path()?;
            if path.exists()
                && !confirm(&format!("  {} already exists. Overwrite?", path.display()))?
            {
                println!("  Cancelled.");
                return Ok(());
            }
            write_default_config(&path)?;
            println!("  [+] Wrote {}", path.display());
            Ok(())
        }
    }
}

fn config_path() -> Result<PathBuf> {
    default_config_path().context("cannot locate config directory (set HOME or XDG_CONFIG_HOME)")
}

fn write_default_config(path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn render_config(config: &AppConfig) -> Vec<String> {
    vec![
        format!("base_url:         {}", config.base_url),
        format!("api_key:          {}", mask_api_key(&config.api_key)),
        format!("model:            {}", config.model),
        format!("max_tokens:       {}", config.max_tokens),
        format!("temperature:      {}", config.temperature),
        format!("stream:           {}", config.stream),
        format!("confirm_commands: {}", config.confirm_commands),
        format!("shell:            {}", config.shell),
        format!("timeout_secs:     {}", config.timeout_secs),
    ]
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

/// Subcommand: `lt history <action>`.
pub fn cmd_history(action: HistoryAction) -> Result<()> {
    let store = history_store()?;
    match action {
        HistoryAction::List => {
            let entries = store.load().context("failed to read history")?;
            if entries.is_empty() {
                println!("  No history yet.");
                return Ok(());
            }
            for entry in entries.iter().take(HISTORY_LIST_LIMIT) {
                println!(
                    "  {}  [{}]  {}",
                    entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    entry.model,
                    entry.preview(PREVIEW_CHARS)
                );
            }
            if entries.len() > HISTORY_LIST_LIMIT {
                println!("  ... and {} more", entries.len() - HISTORY_LIST_LIMIT);
            }
            Ok(())
        }
        HistoryAction::Clear => {
            store.clear().context("failed to clear history")?;
            println!("  [+] History cleared.");
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// conversations
// ---------------------------------------------------------------------------

/// Subcommand: `lt conversations <action>`.
pub fn cmd_conversations(action: ConversationAction) -> Result<()> {
    let store = conversation_store()?;
    match action {
        ConversationAction::List => {
            let conversations = store.list().context("failed to list conversations")?;
            if conversations.is_empty() {
                println!("  No saved conversations.");
                return Ok(());
            }
            for conv in &conversations {
                println!(
                    "  {}  {}  ({} messages, {})",
                    conv.id,
                    conv.title,
                    conv.exchange_len(),
                    conv.model
                );
            }
            Ok(())
        }
        ConversationAction::Show { id } => {
            let conv = store
                .load(&id)
                .with_context(|| format!("failed to load conversation `{id}`"))?;
            println!("  {} ({})", conv.title, conv.id);
            println!(
                "  Model: {}  Updated: {}",
                conv.model,
                conv.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            );
            println!();
            for message in conv.messages.iter().filter(|m| m.role != Role::System) {
                let label = match message.role {
                    Role::User => "You",
                    _ => "Assistant",
                };
                println!("{label}:\n{}\n", message.content);
            }
            Ok(())
        }
        ConversationAction::Delete { id } => {
            store
                .delete(&id)
                .with_context(|| format!("failed to delete conversation `{id}`"))?;
            println!("  [+] Deleted {id}");
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// version
// ---------------------------------------------------------------------------

/// Subcommand: `lt version`.
pub fn cmd_version(config: &AppConfig) {
    println!("LlamaTerm v{}", env!("CARGO_PKG_VERSION"));
    println!("  API:   {}", config.base_url);
    println!("  Model: {}", config.model);
}
