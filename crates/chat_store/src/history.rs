use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::StoreError;
use crate::schema::{HistoryDocument, Turn, HISTORY_VERSION};
use crate::storage::KeyValueStorage;

/// Fixed storage key for the conversation history document.
pub const HISTORY_KEY: &str = "chat-history";
/// Default bound on retained turns.
pub const DEFAULT_MAX_HISTORY: usize = 50;
/// Reduced retention used when a persist attempt fails.
pub const FALLBACK_FLOOR: usize = 20;

/// Ordered, bounded log of conversation turns.
///
/// Sole writer of the history key, and its only reader at process start.
/// Persistence is best-effort: `append` and `clear` never fail; a write
/// error degrades retention instead of surfacing.
pub struct HistoryStore {
    storage: Box<dyn KeyValueStorage>,
    max_turns: usize,
    turns: Vec<Turn>,
}

impl HistoryStore {
    /// Opens the store and loads persisted history once.
    ///
    /// A corrupt or unsupported stored document is treated as empty
    /// history. `max_turns` is clamped to a positive even value, since
    /// turns arrive in user/assistant pairs.
    pub fn open(storage: Box<dyn KeyValueStorage>, max_turns: usize) -> Self {
        let max_turns = normalize_bound(max_turns);
        let turns = match load_turns(&*storage) {
            Ok(turns) => turns,
            Err(error) => {
                tracing::warn!(%error, "stored history unreadable, starting empty");
                Vec::new()
            }
        };

        let mut store = Self {
            storage,
            max_turns,
            turns,
        };
        store.evict_to_bound();
        store
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[must_use]
    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Appends a turn, evicting oldest-first past the bound, and persists.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.evict_to_bound();
        self.persist();
    }

    /// Removes all turns and the persisted document.
    pub fn clear(&mut self) {
        self.turns.clear();
        if let Err(error) = self.storage.remove(HISTORY_KEY) {
            tracing::warn!(%error, "failed to remove stored history");
        }
    }

    fn evict_to_bound(&mut self) {
        if self.turns.len() > self.max_turns {
            let excess = self.turns.len() - self.max_turns;
            self.turns.drain(0..excess);
        }
    }

    /// Best-effort write: on failure, retention degrades to the most
    /// recent [`FALLBACK_FLOOR`] turns and the write is retried once.
    fn persist(&mut self) {
        if let Err(error) = write_turns(&mut *self.storage, &self.turns) {
            tracing::warn!(
                %error,
                floor = FALLBACK_FLOOR,
                "history write failed, truncating and retrying"
            );
            if self.turns.len() > FALLBACK_FLOOR {
                let excess = self.turns.len() - FALLBACK_FLOOR;
                self.turns.drain(0..excess);
            }
            if let Err(error) = write_turns(&mut *self.storage, &self.turns) {
                tracing::warn!(%error, "history write failed after truncation, keeping in-memory turns");
            }
        }
    }
}

fn normalize_bound(max_turns: usize) -> usize {
    let bounded = max_turns.max(2);
    bounded + bounded % 2
}

fn load_turns(storage: &dyn KeyValueStorage) -> Result<Vec<Turn>, StoreError> {
    let Some(raw) = storage.get(HISTORY_KEY)? else {
        return Ok(Vec::new());
    };

    let document: HistoryDocument =
        serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            key: HISTORY_KEY.to_string(),
            source,
        })?;
    if document.version != HISTORY_VERSION {
        return Err(StoreError::UnsupportedVersion {
            key: HISTORY_KEY.to_string(),
            found: document.version,
            expected: HISTORY_VERSION,
        });
    }
    if OffsetDateTime::parse(&document.saved_at, &Rfc3339).is_err() {
        return Err(StoreError::InvalidTimestamp {
            key: HISTORY_KEY.to_string(),
            value: document.saved_at,
        });
    }

    Ok(document.turns)
}

fn write_turns(storage: &mut dyn KeyValueStorage, turns: &[Turn]) -> Result<(), StoreError> {
    let document = HistoryDocument::v1(now_rfc3339()?, turns.to_vec());
    let raw = serde_json::to_string(&document).map_err(|source| StoreError::Serialize {
        key: HISTORY_KEY.to_string(),
        source,
    })?;
    storage.set(HISTORY_KEY, &raw)
}

fn now_rfc3339() -> Result<String, StoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(StoreError::ClockFormat)
}
