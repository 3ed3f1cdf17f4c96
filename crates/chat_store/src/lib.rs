//! Durable conversation storage.
//!
//! One bounded conversation history and one unsent input draft, persisted
//! through a small key-value contract ([`KeyValueStorage`]) under two
//! independent fixed keys. The history store is the sole writer of its key
//! and its only reader at process start; persistence is best-effort and
//! never fails the caller.

pub mod draft;
pub mod error;
pub mod history;
pub mod schema;
pub mod storage;

pub use draft::{DraftCache, DRAFT_KEY, DRAFT_WRITE_INTERVAL};
pub use error::StoreError;
pub use history::{HistoryStore, DEFAULT_MAX_HISTORY, FALLBACK_FLOOR, HISTORY_KEY};
pub use schema::{HistoryDocument, Role, Turn, HISTORY_VERSION};
pub use storage::{FileStorage, KeyValueStorage};
