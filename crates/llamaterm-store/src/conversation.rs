//! Saved chat conversations.
//!
//! One pretty-printed JSON file per conversation, named
//! `<id>_<sanitized title>.json`.  The id is the creation timestamp
//! (`YYYY-MM-DD_HHMMSS`, local time), so files sort chronologically and can
//! be addressed by any unambiguous id prefix.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use llamaterm_client::{Message, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::error::{StoreError, StoreResult};

/// Id format; also the filename prefix.
const ID_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// Title used when no user message exists yet.
const UNTITLED: &str = "Untitled Conversation";

/// Longest title kept verbatim; longer ones are cut and get `...`.
const MAX_TITLE_CHARS: usize = 50;

/// Longest title fragment embedded in a filename.
const MAX_FILENAME_TITLE_CHARS: usize = 30;

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// A persisted chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Creation timestamp, `YYYY-MM-DD_HHMMSS`.
    pub id: String,
    /// Derived from the first user message.
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Bumped on every save.
    pub updated_at: DateTime<Utc>,
    pub model: String,
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Start a new conversation stamped with the current time.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        let now = Utc::now();
        Self {
            id: now.with_timezone(&Local).format(ID_FORMAT).to_string(),
            title: generate_title(&messages),
            created_at: now,
            updated_at: now,
            model: model.into(),
            messages,
        }
    }

    /// Number of user and assistant messages (the system prompt is not
    /// counted).
    pub fn exchange_len(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role != Role::System)
            .count()
    }

    fn file_name(&self) -> String {
        let title: String = sanitize_filename(&self.title)
            .chars()
            .take(MAX_FILENAME_TITLE_CHARS)
            .collect();
        format!("{}_{}.json", self.id, title)
    }
}

/// Title from the first user message: newlines flattened, cut to 47
/// characters plus `...` when longer than 50.
pub fn generate_title(messages: &[Message]) -> String {
    let Some(first) = messages.iter().find(|m| m.role == Role::User) else {
        return UNTITLED.to_owned();
    };

    let title = first.content.trim().replace('\n', " ");
    if title.is_empty() {
        return UNTITLED.to_owned();
    }
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title;
    }

    let mut cut: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

/// Replace characters that are invalid in filenames on common platforms
/// (and spaces) with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
//  ConversationStore
// ═══════════════════════════════════════════════════════════════════════

/// CRUD operations on conversation files in one directory.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    dir: PathBuf,
}

impl ConversationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `conversation`, bumping its `updated_at`.  Files left over from
    /// an earlier title for the same id are removed.
    #[instrument(skip(self, conversation), fields(id = %conversation.id))]
    pub fn save(&self, conversation: &mut Conversation) -> StoreResult<PathBuf> {
        if conversation.id.is_empty() {
            return Err(StoreError::InvalidArgument(
                "conversation id must not be empty".into(),
            ));
        }

        std::fs::create_dir_all(&self.dir)?;
        conversation.updated_at = Utc::now();

        let file_name = conversation.file_name();
        let prefix = format!("{}_", conversation.id);
        for path in self.files()? {
            let stale = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix) && n != file_name);
            if stale {
                std::fs::remove_file(&path)?;
                trace!(path = %path.display(), "removed stale conversation file");
            }
        }

        let path = self.dir.join(&file_name);
        std::fs::write(&path, serde_json::to_vec_pretty(conversation)?)?;

        debug!(path = %path.display(), messages = conversation.messages.len(), "conversation saved");
        Ok(path)
    }

    /// All readable conversations, most recently updated first.  Files that
    /// fail to parse are skipped.
    pub fn list(&self) -> StoreResult<Vec<Conversation>> {
        let mut conversations: Vec<Conversation> = self
            .files()?
            .into_iter()
            .filter_map(|path| match read_conversation(&path) {
                Ok(conv) => Some(conv),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unreadable conversation");
                    None
                }
            })
            .collect();

        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    /// The most recently updated conversation, if any.
    pub fn latest(&self) -> StoreResult<Option<Conversation>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Load the conversation whose id starts with `id_prefix`.
    pub fn load(&self, id_prefix: &str) -> StoreResult<Conversation> {
        let path = self.find(id_prefix)?;
        read_conversation(&path)
    }

    /// Delete the conversation whose id starts with `id_prefix`.
    #[instrument(skip(self))]
    pub fn delete(&self, id_prefix: &str) -> StoreResult<()> {
        let path = self.find(id_prefix)?;
        std::fs::remove_file(&path)?;
        debug!(path = %path.display(), "conversation deleted");
        Ok(())
    }

    fn find(&self, id_prefix: &str) -> StoreResult<PathBuf> {
        if id_prefix.is_empty() {
            return Err(StoreError::InvalidArgument(
                "conversation id must not be empty".into(),
            ));
        }

        let mut matches: Vec<PathBuf> = self
            .files()?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(id_prefix))
            })
            .collect();

        match matches.len() {
            0 => Err(StoreError::NotFound {
                entity: "conversation",
                id: id_prefix.to_owned(),
            }),
            1 => Ok(matches.remove(0)),
            n => Err(StoreError::InvalidArgument(format!(
                "id prefix `{id_prefix}` matches {n} conversations"
            ))),
        }
    }

    /// JSON files in the directory.  A missing directory has none.
    fn files(&self) -> StoreResult<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn read_conversation(path: &Path) -> StoreResult<Conversation> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
