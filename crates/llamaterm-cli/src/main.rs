//! CLI entry point for LlamaTerm.
//!
//! This binary provides the `lt` command: one-shot questions, shell command
//! generation, file explanations, error diagnosis and an interactive chat,
//! all against any OpenAI-compatible chat-completion endpoint.

mod ask;
mod cli;
mod clipboard;
mod command;
mod config;
mod helpers;
mod manage;
mod repl;
mod shell;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use cli::{Cli, Commands, ConfigAction};
use command::CmdOptions;
use config::AppConfig;
use helpers::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Missing `.env` is the common case.
    let _ = dotenvy::dotenv();

    init_tracing(if cli.global.verbose { "debug" } else { "warn" });

    // Housekeeping commands work even when the config file is broken.
    match cli.command {
        Commands::Config {
            action: action @ (ConfigAction::Path | ConfigAction::Init),
        } => return manage::cmd_config(&AppConfig::default(), action),
        Commands::History { action } => return manage::cmd_history(action),
        Commands::Conversations { action } => return manage::cmd_conversations(action),
        _ => {}
    }

    let config = AppConfig::load(&cli.global)?;
    debug!(base_url = %config.base_url, model = %config.model, stream = config.stream, "configuration resolved");

    match cli.command {
        Commands::Ask { question, copy } => ask::cmd_ask(&config, &question, copy).await,
        Commands::Copy { question } => ask::cmd_ask(&config, &question, true).await,
        Commands::Cmd {
            description,
            dry_run,
            yes,
        } => command::cmd_cmd(&config, &description, CmdOptions { dry_run, yes }).await,
        Commands::Quick { description } => command::cmd_quick(&config, &description).await,
        Commands::Explain { file, question } => ask::cmd_explain(&config, &file, &question).await,
        Commands::Fix { error } => ask::cmd_fix(&config, &error).await,
        Commands::Chat { resume } => repl::cmd_chat(&config, resume).await,
        Commands::Models => manage::cmd_models(&config).await,
        Commands::Config { action } => manage::cmd_config(&config, action),
        Commands::History { action } => manage::cmd_history(action),
        Commands::Conversations { action } => manage::cmd_conversations(action),
        Commands::Version => {
            manage::cmd_version(&config);
            Ok(())
        }
    }
}
