//! CLI argument definitions for LlamaTerm.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// LlamaTerm -- an LLM assistant for your terminal.
#[derive(Parser)]
#[command(
    name = "lt",
    version,
    about = "LlamaTerm -- chat with any OpenAI-compatible LLM from your terminal",
    long_about = "Ask questions, generate shell commands, explain files and debug errors \
                  using a local (Ollama, LM Studio, vLLM) or hosted OpenAI-compatible API."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every subcommand.  They override the config file and
/// environment.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file to use instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// API base URL (e.g. http://localhost:11434/v1).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// API key.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Model to use.
    #[arg(long, short, global = true)]
    pub model: Option<String>,

    /// Wait for the full response instead of streaming it.
    #[arg(long, global = true)]
    pub no_stream: bool,

    /// Maximum tokens to generate.
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 - 2.0).
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Enable debug logging on stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a question (reads stdin when no question is given).
    Ask {
        /// The question.
        question: Vec<String>,

        /// Copy the answer to the clipboard.
        #[arg(long, short)]
        copy: bool,
    },

    /// Ask a question and copy the answer to the clipboard.
    Copy {
        /// The question.
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Generate a shell command from a description and run it.
    Cmd {
        /// What the command should do (reads stdin when omitted).
        description: Vec<String>,

        /// Print the command without running it.
        #[arg(long)]
        dry_run: bool,

        /// Run without asking for confirmation.
        #[arg(long, short)]
        yes: bool,
    },

    /// Generate and immediately run a shell command (dangerous ones are refused).
    Quick {
        /// What the command should do.
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },

    /// Explain a source file.
    Explain {
        /// File to explain.
        file: PathBuf,

        /// Specific question about the file.
        question: Vec<String>,
    },

    /// Diagnose an error message (reads stdin when omitted).
    Fix {
        /// The error text.
        error: Vec<String>,
    },

    /// Start an interactive chat session.
    Chat {
        /// Resume a saved conversation (the latest when no id is given).
        #[arg(long, short, value_name = "ID", num_args = 0..=1, default_missing_value = "")]
        resume: Option<String>,
    },

    /// List models available on the server.
    Models,

    /// Inspect or create the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Inspect or clear the chat history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Manage saved chat conversations.
    Conversations {
        #[command(subcommand)]
        action: ConversationAction,
    },

    /// Print version and connection settings.
    Version,
}

/// Actions for the config file.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration.
    Show,
    /// Print the config file location.
    Path,
    /// Write a default config file.
    Init,
}

/// Actions for the chat history.
#[derive(Subcommand)]
pub enum HistoryAction {
    /// Show recent exchanges.
    List,
    /// Delete all history.
    Clear,
}

/// Actions for saved conversations.
#[derive(Subcommand)]
pub enum ConversationAction {
    /// List saved conversations.
    List,
    /// Print a conversation.
    Show {
        /// Conversation id (a unique prefix is enough).
        id: String,
    },
    /// Delete a conversation.
    Delete {
        /// Conversation id (a unique prefix is enough).
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["lt", "ask", "hi", "-m", "gpt-4o", "--no-stream"]).unwrap();
        assert_eq!(cli.global.model.as_deref(), Some("gpt-4o"));
        assert!(cli.global.no_stream);
        match cli.command {
            Commands::Ask { question, copy } => {
                assert_eq!(question, vec!["hi"]);
                assert!(!copy);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn resume_with_and_without_id() {
        let cli = Cli::try_parse_from(["lt", "chat", "--resume"]).unwrap();
        assert!(matches!(cli.command, Commands::Chat { resume: Some(ref id) } if id.is_empty()));

        let cli = Cli::try_parse_from(["lt", "chat", "-r", "2024-05"]).unwrap();
        assert!(matches!(cli.command, Commands::Chat { resume: Some(ref id) } if id == "2024-05"));

        let cli = Cli::try_parse_from(["lt", "chat"]).unwrap();
        assert!(matches!(cli.command, Commands::Chat { resume: None }));
    }

    #[test]
    fn quick_joins_words() {
        let cli = Cli::try_parse_from(["lt", "quick", "list", "big", "files"]).unwrap();
        match cli.command {
            Commands::Quick { description } => assert_eq!(description.join(" "), "list big files"),
            _ => panic!("expected quick"),
        }
    }
}
