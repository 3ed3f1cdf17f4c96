use std::time::{Duration, Instant};

use crate::storage::KeyValueStorage;

/// Fixed storage key for the unsent input draft.
pub const DRAFT_KEY: &str = "chat-draft";
/// Minimum spacing between write-throughs of the draft.
pub const DRAFT_WRITE_INTERVAL: Duration = Duration::from_millis(400);

/// Debounced cache for a single unsent input draft.
///
/// Lifecycle is independent of history: an accepted submit clears it, a
/// cancelled generation does not. Writes are best-effort; a failed write is
/// logged and retried on the next save.
pub struct DraftCache {
    storage: Box<dyn KeyValueStorage>,
    interval: Duration,
    last_write: Option<Instant>,
    pending: Option<String>,
}

impl DraftCache {
    pub fn new(storage: Box<dyn KeyValueStorage>) -> Self {
        Self::with_interval(storage, DRAFT_WRITE_INTERVAL)
    }

    pub fn with_interval(storage: Box<dyn KeyValueStorage>, interval: Duration) -> Self {
        Self {
            storage,
            interval,
            last_write: None,
            pending: None,
        }
    }

    /// Returns the persisted draft, if any.
    pub fn load(&self) -> Option<String> {
        match self.storage.get(DRAFT_KEY) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%error, "failed to read stored draft");
                None
            }
        }
    }

    /// Records the latest draft text, writing through at most once per
    /// interval. Within the interval the newest value is held until the
    /// next [`DraftCache::flush`] or an out-of-interval save.
    pub fn save(&mut self, text: &str) {
        let due = self
            .last_write
            .map_or(true, |at| at.elapsed() >= self.interval);
        if due {
            self.write(text);
        } else {
            self.pending = Some(text.to_string());
        }
    }

    /// Forces any held debounced value out to storage.
    pub fn flush(&mut self) {
        if let Some(text) = self.pending.take() {
            self.write(&text);
        }
    }

    /// Drops the draft, held and persisted.
    pub fn clear(&mut self) {
        self.pending = None;
        self.last_write = None;
        if let Err(error) = self.storage.remove(DRAFT_KEY) {
            tracing::warn!(%error, "failed to remove stored draft");
        }
    }

    fn write(&mut self, text: &str) {
        if let Err(error) = self.storage.set(DRAFT_KEY, text) {
            tracing::warn!(%error, "failed to persist draft");
            return;
        }
        self.last_write = Some(Instant::now());
        self.pending = None;
    }
}
