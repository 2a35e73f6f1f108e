//! # llamaterm-store
//!
//! Flat-file persistence for LlamaTerm.
//!
//! Everything lives as plain JSON under the user's config directory so it
//! can be inspected, copied or deleted by hand.
//!
//! ## Layout
//!
//! ```text
//! ~/.config/lt/
//! ├── history.json                         HistoryStore (newest first, capped)
//! └── conversations/
//!     └── 2024-05-01_142233_How_do_I_list_files.json   ConversationStore
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use llamaterm_store::{Conversation, ConversationStore};
//!
//! let store = ConversationStore::new(config_dir.join("conversations"));
//! let mut conv = Conversation::new("llama3.2", messages);
//! store.save(&mut conv)?;
//! let recent = store.list()?;
//! ```

pub mod conversation;
pub mod error;
pub mod history;

// ── re-exports ───────────────────────────────────────────────────────

pub use conversation::{Conversation, ConversationStore, generate_title, sanitize_filename};
pub use error::{StoreError, StoreResult};
pub use history::{HistoryEntry, HistoryStore, MAX_HISTORY_ENTRIES};
