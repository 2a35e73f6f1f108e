//! System clipboard access through the platform's command-line tools.

use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// A clipboard program and its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClipboardTool {
    program: &'static str,
    args: &'static [&'static str],
}

const PBCOPY: ClipboardTool = ClipboardTool {
    program: "pbcopy",
    args: &[],
};
const XCLIP: ClipboardTool = ClipboardTool {
    program: "xclip",
    args: &["-selection", "clipboard"],
};
const XSEL: ClipboardTool = ClipboardTool {
    program: "xsel",
    args: &["--clipboard", "--input"],
};
const CLIP: ClipboardTool = ClipboardTool {
    program: "clip",
    args: &[],
};

/// Copy `text` to the system clipboard.
pub async fn copy_to_clipboard(text: &str) -> Result<()> {
    let tool = select_tool(std::env::consts::OS, on_path)?;
    debug!(program = tool.program, bytes = text.len(), "copying to clipboard");
    pipe_to(tool, text).await
}

/// Run `tool` with `text` on its stdin.  The child is killed if writing
/// fails.
async fn pipe_to(tool: ClipboardTool, text: &str) -> Result<()> {
    let mut child = tokio::process::Command::new(tool.program)
        .args(tool.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to start {}", tool.program))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .await
            .with_context(|| format!("failed to write to {}", tool.program))?;
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("failed to wait for {}", tool.program))?;
    if !status.success() {
        bail!("{} exited with {status}", tool.program);
    }
    Ok(())
}

fn select_tool<F>(os: &str, available: F) -> Result<ClipboardTool>
where
    F: Fn(&str) -> bool,
{
    match os {
        "macos" => Ok(PBCOPY),
        "windows" => Ok(CLIP),
        "linux" | "freebsd" | "openbsd" | "netbsd" => [XCLIP, XSEL]
            .into_iter()
            .find(|tool| available(tool.program))
            .context("no clipboard tool found (install xclip or xsel)"),
        other => bail!("clipboard is not supported on {other}"),
    }
}

fn on_path(program: &str) -> bool {
    std::env::var_os("PATH").is_some_and(|paths| {
        std::env::split_paths(&paths).any(|dir| dir.join(program).is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_tools() {
        assert_eq!(select_tool("macos", |_| false).unwrap(), PBCOPY);
        assert_eq!(select_tool("windows", |_| false).unwrap(), CLIP);
    }

    #[test]
    fn linux_prefers_xclip_then_xsel() {
        assert_eq!(select_tool("linux", |_| true).unwrap(), XCLIP);
        assert_eq!(select_tool("linux", |p| p == "xsel").unwrap(), XSEL);
        assert!(select_tool("linux", |_| false).is_err());
    }

    #[test]
    fn unknown_platform_is_an_error() {
        assert!(select_tool("plan9", |_| true).is_err());
    }

    #[tokio::test]
    async fn pipes_text_into_tool() {
        let cat = ClipboardTool {
            program: "cat",
            args: &[],
        };
        pipe_to(cat, "hello clipboard").await.unwrap();
    }

    #[tokio::test]
    async fn tool_that_stops_reading_is_an_error() {
        let quits = ClipboardTool {
            program: "true",
            args: &[],
        };
        let text = "x".repeat(4 * 1024 * 1024);
        assert!(pipe_to(quits, &text).await.is_err());
    }

    #[tokio::test]
    async fn failing_tool_is_an_error() {
        let fails = ClipboardTool {
            program: "false",
            args: &[],
        };
        assert!(pipe_to(fails, "").await.is_err());
    }
}
