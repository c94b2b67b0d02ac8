//! State persistence for the watcher.
//!
//! The persisted snapshot is the only continuity between runs: it carries the
//! item universe, the crawl cursor, the last-known facts per item and the two
//! accumulated entry lists.
//!
//! ## Snapshot Layout
//!
//! ```text
//! state.json.gz             # gzip-compressed JSON
//! {
//!   "universe": [10, 20, ...],
//!   "universe_fetched_at": "2024-05-01T12:00:00Z",
//!   "cursor": 250,
//!   "facts": { "10": { "has_target_language": true, "release_marker": "1 Nov, 2000" } },
//!   "language_entries": [ ... newest first ... ],
//!   "release_entries": [ ... newest first ... ]
//! }
//! ```

pub mod local;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{FeedEntry, FeedKind, ItemFacts, ItemId};

// Re-export for convenience
pub use local::{LocalStorage, write_atomic};

/// Aggregate root mutated in place by a single run.
///
/// Every field defaults, so snapshots written by older versions still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchState {
    /// Every known item id, in listing order
    pub universe: Vec<ItemId>,
    /// When the universe was last fetched; `None` means never
    pub universe_fetched_at: Option<DateTime<Utc>>,
    /// Offset of the next batch into `universe`
    pub cursor: usize,
    /// Last-observed facts per item
    pub facts: BTreeMap<ItemId, ItemFacts>,
    /// Language-added entries, newest first
    pub language_entries: Vec<FeedEntry>,
    /// Release-changed entries, newest first
    pub release_entries: Vec<FeedEntry>,
}

impl WatchState {
    /// Whether the universe has ever been fetched.
    pub fn has_universe(&self) -> bool {
        self.universe_fetched_at.is_some()
    }

    /// Whether the universe is absent or older than `max_age`.
    pub fn universe_is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match self.universe_fetched_at {
            Some(fetched_at) => now - fetched_at > max_age,
            None => true,
        }
    }

    /// Replace the universe wholesale.
    ///
    /// The cursor is reset only when no universe existed before; otherwise it
    /// is kept and clamped into the new range.
    pub fn replace_universe(&mut self, ids: Vec<ItemId>, now: DateTime<Utc>) {
        let had_universe = self.has_universe();
        self.universe = ids;
        self.universe_fetched_at = Some(now);
        self.cursor = if had_universe && !self.universe.is_empty() {
            self.cursor % self.universe.len()
        } else {
            0
        };
    }

    /// Facts last stored for `id`, or the never-seen default.
    pub fn facts_for(&self, id: ItemId) -> ItemFacts {
        self.facts.get(&id).cloned().unwrap_or_default()
    }

    /// Overwrite the stored facts for `id`.
    pub fn commit_facts(&mut self, id: ItemId, facts: ItemFacts) {
        self.facts.insert(id, facts);
    }

    /// Entry list for a feed kind, newest first.
    pub fn entries(&self, kind: FeedKind) -> &[FeedEntry] {
        match kind {
            FeedKind::LanguageAdded => &self.language_entries,
            FeedKind::ReleaseChanged => &self.release_entries,
        }
    }

    /// Prepend an entry to the list for `kind`.
    pub fn push_entry(&mut self, kind: FeedKind, entry: FeedEntry) {
        let entries = match kind {
            FeedKind::LanguageAdded => &mut self.language_entries,
            FeedKind::ReleaseChanged => &mut self.release_entries,
        };
        entries.insert(0, entry);
    }

    /// Move the cursor forward by `examined` items, wrapping.
    pub fn advance_cursor(&mut self, examined: usize) {
        let len = self.universe.len();
        self.cursor = if len == 0 {
            0
        } else {
            (self.cursor % len + examined % len) % len
        };
    }
}

/// Trait for state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the snapshot, or an empty state if none was saved yet.
    async fn load(&self) -> Result<WatchState>;

    /// Persist the snapshot atomically.
    async fn save(&self, state: &WatchState) -> Result<()>;
}
