//! Chat history log.
//!
//! A single JSON array of exchanges, newest first, capped at
//! [`MAX_HISTORY_ENTRIES`].  Written whole on every append.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use llamaterm_client::{Message, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::StoreResult;

/// Oldest entries beyond this count are dropped on append.
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// One saved exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub messages: Vec<Message>,
}

impl HistoryEntry {
    /// Stamp `messages` with the current time.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            timestamp: Utc::now(),
            model: model.into(),
            messages,
        }
    }

    /// The first user message, cut to `max_chars` characters with `...`
    /// appended when it was longer.
    pub fn preview(&self, max_chars: usize) -> String {
        let Some(first) = self.messages.iter().find(|m| m.role == Role::User) else {
            return String::new();
        };
        let flat = first.content.replace('\n', " ");
        if flat.chars().count() <= max_chars {
            return flat;
        }
        let mut cut: String = flat.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    }
}

/// Reads and writes the history file.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, newest first.  A missing file is an empty history.
    pub fn load(&self) -> StoreResult<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    /// Prepend `entry`, trim to the cap and rewrite the file.
    #[instrument(skip(self, entry), fields(path = %self.path.display()))]
    pub fn append(&self, entry: HistoryEntry) -> StoreResult<()> {
        let mut entries = self.load()?;
        entries.insert(0, entry);
        entries.truncate(MAX_HISTORY_ENTRIES);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&entries)?)?;

        debug!(count = entries.len(), "history saved");
        Ok(())
    }

    /// Delete the history file.  Clearing an absent history succeeds.
    pub fn clear(&self) -> StoreResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
