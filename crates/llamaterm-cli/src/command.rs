//! Subcommands `lt cmd` and `lt quick`: natural language to shell command.

use anyhow::{Result, bail};
use llamaterm_client::{GenerationParams, Message};
use tracing::info;

use crate::config::AppConfig;
use crate::helpers::{build_client, complete_quietly, confirm, read_input};
use crate::shell::{CommandGuard, clean_command, run_command};

const COMMAND_SYSTEM_PROMPT: &str = "You translate requests into a single shell command. \
    Reply with the command only: no explanation, no markdown, no code fences. \
    Prefer portable POSIX tools. If several commands are needed, join them with && \
    on one line.";

const COMMAND_MAX_TOKENS: u32 = 256;
const COMMAND_TEMPERATURE: f32 = 0.3;

/// Options for [`cmd_cmd`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CmdOptions {
    pub dry_run: bool,
    pub yes: bool,
}

/// Subcommand: `lt cmd <description>`.
pub async fn cmd_cmd(config: &AppConfig, words: &[String], options: CmdOptions) -> Result<()> {
    let description = read_input(words, "description")?;
    let guard = CommandGuard::new()?;
    let command = generate_command(config, &description).await?;

    println!("  Command: {command}");

    let dangerous = guard.is_dangerous(&command);
    if dangerous {
        println!("  [!] WARNING: this command looks destructive. Review it carefully.");
    }

    if options.dry_run {
        return Ok(());
    }

    let needs_confirmation = dangerous || (config.confirm_commands && !options.yes);
    if needs_confirmation && !confirm("  Run this command?")? {
        println!("  Cancelled.");
        return Ok(());
    }

    execute(config, &command).await
}

/// Subcommand: `lt quick <description>`.  Runs without confirmation but
/// refuses anything that looks destructive.
pub async fn cmd_quick(config: &AppConfig, words: &[String]) -> Result<()> {
    let description = read_input(words, "description")?;
    let guard = CommandGuard::new()?;
    let command = generate_command(config, &description).await?;

    println!("  Command: {command}");
    if guard.is_dangerous(&command) {
        bail!("refusing to run a potentially destructive command; use `lt cmd` to review it");
    }

    execute(config, &command).await
}

async fn generate_command(config: &AppConfig, description: &str) -> Result<String> {
    let client = build_client(config)?;
    let params = GenerationParams::new(&config.model, COMMAND_MAX_TOKENS, COMMAND_TEMPERATURE);
    let messages = vec![
        Message::system(COMMAND_SYSTEM_PROMPT),
        Message::user(description),
    ];

    let reply = complete_quietly(&client, &params, &messages).await?;
    let command = clean_command(&reply);
    if command.is_empty() {
        bail!("the model did not return a command");
    }
    Ok(command)
}

async fn execute(config: &AppConfig, command: &str) -> Result<()> {
    info!(command, "executing generated command");
    let exit_code = run_command(&config.shell, command).await?;
    if exit_code != 0 {
        bail!("command exited with status {exit_code}");
    }
    Ok(())
}
