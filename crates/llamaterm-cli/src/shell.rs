//! Generated shell commands: cleanup, danger screening and execution.

use std::process::Stdio;

use anyhow::{Context, Result};
use regex::RegexSet;
use tracing::debug;

/// Patterns for commands that can wreck a system.  Not a sandbox; a
/// tripwire for the obvious cases.
const DANGEROUS_PATTERNS: &[&str] = &[
    r"rm\s+-rf\s+/",
    r"rm\s+-rf\s+\*",
    r">\s*/dev/sd",
    r"mkfs\.",
    r"dd\s+if=",
    r":\(\)\{",
    r"chmod\s+-R\s+777\s+/",
    r"curl.*\|\s*bash",
    r"wget.*\|\s*bash",
];

/// Reduce a model reply to a single runnable command line: code fences and
/// stray backticks are stripped and only the first non-empty line is kept.
pub fn clean_command(reply: &str) -> String {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("```"))
        .map(|line| line.trim_matches('`').trim())
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_owned()
}

/// Screens commands against [`DANGEROUS_PATTERNS`].
#[derive(Debug, Clone)]
pub struct CommandGuard {
    patterns: RegexSet,
}

impl CommandGuard {
    pub fn new() -> Result<Self> {
        let patterns =
            RegexSet::new(DANGEROUS_PATTERNS).context("invalid dangerous-command pattern")?;
        Ok(Self { patterns })
    }

    /// Whether `command` matches a known-destructive pattern.
    pub fn is_dangerous(&self, command: &str) -> bool {
        self.patterns.is_match(command)
    }
}

/// Run `command` through `shell -c` with the terminal's stdio attached and
/// return its exit code (`-1` when killed by a signal).
pub async fn run_command(shell: &str, command: &str) -> Result<i32> {
    debug!(shell, command, "running command");

    let status = tokio::process::Command::new(shell)
        .arg("-c")
        .arg(command)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .status()
        .await
        .with_context(|| format!("failed to start {shell}"))?;

    let exit_code = status.code().unwrap_or(-1);
    debug!(exit_code, "command finished");
    Ok(exit_code)
}
