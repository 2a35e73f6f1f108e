//! Layered configuration: defaults, TOML file, environment, then flags.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use llamaterm_client::{ClientConfig, GenerationParams};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::GlobalArgs;

/// Directory name under the user config dir.
const APP_DIR: &str = "lt";

/// Config file name inside [`config_dir`].
const CONFIG_FILE: &str = "config.toml";

/// Commented starter file written by `lt config init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# LlamaTerm configuration
#
# Values here are overridden by LT_* environment variables and by
# command-line flags.

# API endpoint. Any OpenAI-compatible server works:
#   Ollama     http://localhost:11434/v1
#   LM Studio  http://localhost:1234/v1
#   OpenAI     https://api.openai.com/v1
#   Groq       https://api.groq.com/openai/v1
base_url = "http://localhost:11434/v1"

# Leave empty for local servers.
api_key = ""

model = "llama3.2"
max_tokens = 1024
temperature = 0.7

# Print answers as they are generated.
stream = true

# Ask before running generated shell commands.
confirm_commands = true

# Shell used to run generated commands (defaults to $SHELL).
# shell = "/bin/zsh"

# Whole-request timeout in seconds, streamed output included.
timeout_secs = 300
"#;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Effective application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
    pub confirm_commands: bool,
    pub shell: String,
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: llamaterm_client::client::DEFAULT_BASE_URL.to_owned(),
            api_key: String::new(),
            model: "llama3.2".to_owned(),
            max_tokens: 1024,
            temperature: 0.7,
            stream: true,
            confirm_commands: true,
            shell: default_shell(),
            timeout_secs: llamaterm_client::client::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Resolve the effective configuration for this invocation.
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let mut config = match resolve_config_path(args.config.as_deref())? {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("no config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        config.apply_flags(args);
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML config file.  Keys it omits keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }

    /// Apply environment overrides.  `lookup` returns a variable's value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |names: &[&'static str]| {
            names
                .iter()
                .find_map(|name| lookup(*name).filter(|v| !v.is_empty()).map(|v| (*name, v)))
        };

        if let Some((_, v)) = get(&["LT_BASE_URL", "OPENAI_BASE_URL"]) {
            self.base_url = v;
        }
        if let Some((_, v)) = get(&["LT_API_KEY", "OPENAI_API_KEY"]) {
            self.api_key = v;
        }
        if let Some((_, v)) = get(&["LT_MODEL", "OPENAI_MODEL"]) {
            self.model = v;
        }
        if let Some((name, v)) = get(&["LT_MAX_TOKENS"]) {
            self.max_tokens = parse_env(name, &v)?;
        }
        if let Some((name, v)) = get(&["LT_TEMPERATURE"]) {
            self.temperature = parse_env(name, &v)?;
        }
        if let Some((name, v)) = get(&["LT_STREAM"]) {
            self.stream = parse_bool(name, &v)?;
        }
        if let Some((name, v)) = get(&["LT_CONFIRM_COMMANDS"]) {
            self.confirm_commands = parse_bool(name, &v)?;
        }
        if let Some((_, v)) = get(&["LT_SHELL"]) {
            self.shell = v;
        }
        if let Some((name, v)) = get(&["LT_TIMEOUT_SECS"]) {
            self.timeout_secs = parse_env(name, &v)?;
        }
        Ok(())
    }

    /// Apply command-line overrides.
    pub fn apply_flags(&mut self, args: &GlobalArgs) {
        if let Some(ref v) = args.base_url {
            self.base_url = v.clone();
        }
        if let Some(ref v) = args.api_key {
            self.api_key = v.clone();
        }
        if let Some(ref v) = args.model {
            self.model = v.clone();
        }
        if let Some(v) = args.max_tokens {
            self.max_tokens = v;
        }
        if let Some(v) = args.temperature {
            self.temperature = v;
        }
        if args.no_stream {
            self.stream = false;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            bail!("base_url must not be empty");
        }
        if self.model.trim().is_empty() {
            bail!("model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!("temperature must be between 0.0 and 2.0, got {}", self.temperature);
        }
        Ok(())
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams::new(&self.model, self.max_tokens, self.temperature)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url, &self.api_key)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

fn default_shell() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/bin/sh".to_owned())
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid value for {name}: {value:?}"))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("invalid value for {name}: {value:?} (expected true or false)"),
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Per-user directory holding the config file, history and conversations.
pub fn config_dir() -> Option<PathBuf> {
    config_dir_from(std::env::var("XDG_CONFIG_HOME").ok(), std::env::var("HOME").ok())
}

fn config_dir_from(xdg_config_home: Option<String>, home: Option<String>) -> Option<PathBuf> {
    if let Some(xdg) = xdg_config_home.filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(xdg).join(APP_DIR));
    }
    home.filter(|v| !v.is_empty())
        .map(|h| PathBuf::from(h).join(".config").join(APP_DIR))
}

/// Where `lt config init` writes and where the config is looked up first.
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// The config file to load, if any.  An explicit path must exist; the
/// default locations are optional.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("config file not found: {}", path.display());
        }
        return Ok(Some(path.to_path_buf()));
    }

    let candidates = default_config_path()
        .into_iter()
        .chain(std::iter::once(PathBuf::from(CONFIG_FILE)));
    Ok(candidates.into_iter().find(|p| p.is_file()))
}

/// Mask an API key for display: `sk-a...wxyz`, or `****` for short keys.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.is_empty() {
        return "(not set)".to_owned();
    }
    if chars.len() < 8 {
        return "****".to_owned();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.max_tokens, 1024);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert!(config.stream);
        assert!(config.confirm_commands);
        assert!(config.api_key.is_empty());
        assert_eq!(config.timeout_secs, 300);
    }

    #[test]
    fn template_parses_to_defaults() {
        let parsed: AppConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(parsed, defaults);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = \"gpt-4o\"\nmax_tokens = 256\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_tokens = \"lots\"").unwrap();
        assert!(AppConfig::from_file(&path).is_err());
    }

    #[test]
    fn lt_variables_win_over_openai_ones() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("OPENAI_API_KEY", "sk-openai"),
                ("LT_API_KEY", "sk-lt"),
                ("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                ("OPENAI_MODEL", "gpt-4o"),
            ]))
            .unwrap();

        assert_eq!(config.api_key, "sk-lt");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o");
    }

    #[test]
    fn typed_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("LT_MAX_TOKENS", "64"),
                ("LT_TEMPERATURE", "0.2"),
                ("LT_STREAM", "false"),
                ("LT_CONFIRM_COMMANDS", "0"),
                ("LT_SHELL", "/bin/bash"),
                ("LT_TIMEOUT_SECS", "30"),
            ]))
            .unwrap();

        assert_eq!(config.max_tokens, 64);
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert!(!config.stream);
        assert!(!config.confirm_commands);
        assert_eq!(config.shell, "/bin/bash");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn bad_env_value_names_the_variable() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[("LT_MAX_TOKENS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("LT_MAX_TOKENS"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("LT_MODEL", "")])).unwrap();
        assert_eq!(config.model, "llama3.2");
    }

    #[test]
    fn flags_override_everything() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("LT_MODEL", "from-env")])).unwrap();
        config.apply_flags(&GlobalArgs {
            model: Some("from-flag".into()),
            base_url: Some("http://example.test/v1".into()),
            no_stream: true,
            max_tokens: Some(10),
            temperature: Some(1.5),
            ..GlobalArgs::default()
        });

        assert_eq!(config.model, "from-flag");
        assert_eq!(config.base_url, "http://example.test/v1");
        assert!(!config.stream);
        assert_eq!(config.max_tokens, 10);
        assert!((config.temperature - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn validation() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.temperature = 2.5;
        assert!(config.validate().is_err());

        config.temperature = 0.7;
        config.model = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_dir_prefers_xdg() {
        assert_eq!(
            config_dir_from(Some("/xdg".into()), Some("/home/me".into())),
            Some(PathBuf::from("/xdg/lt"))
        );
        assert_eq!(
            config_dir_from(Some(String::new()), Some("/home/me".into())),
            Some(PathBuf::from("/home/me/.config/lt"))
        );
        assert_eq!(config_dir_from(None, None), None);
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(resolve_config_path(Some(missing.as_path())).is_err());

        let present = dir.path().join("lt.toml");
        std::fs::write(&present, "").unwrap();
        assert_eq!(resolve_config_path(Some(present.as_path())).unwrap(), Some(present));
    }

    #[test]
    fn api_key_masking() {
        assert_eq!(mask_api_key(""), "(not set)");
        assert_eq!(mask_api_key("short"), "****");
        assert_eq!(mask_api_key("sk-abcdefghijklmnop"), "sk-a...mnop");
        assert_eq!(mask_api_key("12345678"), "1234...5678");
    }

    #[test]
    fn params_and_client_config_follow_settings() {
        let config = AppConfig {
            model: "gpt-5".into(),
            max_tokens: 99,
            timeout_secs: 12,
            ..AppConfig::default()
        };
        let params = config.generation_params();
        assert_eq!(params.model, "gpt-5");
        assert_eq!(params.max_tokens, 99);
        assert_eq!(config.client_config().timeout, Duration::from_secs(12));
    }
}
