// src/pipeline/crawl.rs

//! Cursor-based incremental crawl.
//!
//! Each run examines a bounded batch starting at the stored cursor and
//! wrapping around the universe, so repeated runs eventually visit every
//! item. The cursor moves by the number of items actually examined: items
//! skipped after a transport failure or an unavailable response come up
//! again on the next run.

use std::time::Duration;

use crate::clock::Clock;
use crate::error::Result;
use crate::models::{CatalogItem, Config, CrawlerConfig, FeedKind};
use crate::pipeline::detect::ChangeDetector;
use crate::services::CatalogClient;
use crate::storage::WatchState;

/// Summary of a crawl batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Whether the universe was fetched during this run
    pub universe_refreshed: bool,
    pub universe_len: usize,
    /// Lookups performed
    pub attempted: usize,
    /// Lookups that produced facts
    pub examined: usize,
    pub transport_failures: usize,
    pub unavailable: usize,
    pub language_added: usize,
    pub release_changed: usize,
    /// Cursor after the batch
    pub cursor: usize,
}

/// Walks a batch of the universe, detecting transitions per item.
pub struct Crawler<'a> {
    catalog: &'a dyn CatalogClient,
    clock: &'a dyn Clock,
    detector: ChangeDetector,
    settings: CrawlerConfig,
    locale: String,
    region: String,
}

impl<'a> Crawler<'a> {
    /// Create a crawler with the given configuration.
    pub fn new(config: &Config, catalog: &'a dyn CatalogClient, clock: &'a dyn Clock) -> Self {
        Self {
            catalog,
            clock,
            detector: ChangeDetector::from_config(config),
            settings: config.crawler.clone(),
            locale: config.catalog.locale.clone(),
            region: config.catalog.region.clone(),
        }
    }

    /// Fetch the universe if it is absent or stale.
    ///
    /// A failed refresh of a stale universe falls back to the stored one.
    /// Without any stored universe there is nothing to crawl and the error
    /// is returned. Returns whether a new universe was stored.
    pub async fn ensure_universe(&self, state: &mut WatchState) -> Result<bool> {
        let now = self.clock.now();
        let max_age = chrono::Duration::days(self.settings.universe_max_age_days);
        if !state.universe_is_stale(now, max_age) {
            return Ok(false);
        }

        log::info!("Refreshing catalog listing");
        match self.catalog.fetch_universe().await {
            Ok(ids) => {
                state.replace_universe(ids, now);
                Ok(true)
            }
            Err(e) if e.is_transport() && state.has_universe() => {
                log::warn!(
                    "Listing refresh failed, keeping {} known items: {}",
                    state.universe.len(),
                    e
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Run one batch against `state`.
    ///
    /// Facts and entries are committed item by item. If an unrecoverable
    /// error aborts the batch, the cursor still advances past the items
    /// examined so far before the error is returned.
    pub async fn crawl(&self, state: &mut WatchState) -> Result<CrawlStats> {
        let mut stats = CrawlStats {
            universe_refreshed: self.ensure_universe(state).await?,
            universe_len: state.universe.len(),
            ..CrawlStats::default()
        };

        log::info!(
            "Crawling up to {} of {} items from cursor {}",
            self.settings.batch_size.min(stats.universe_len),
            stats.universe_len,
            state.cursor
        );

        let outcome = self.run_batch(state, &mut stats).await;
        state.advance_cursor(stats.examined);
        stats.cursor = state.cursor;
        outcome.map(|()| stats)
    }

    async fn run_batch(&self, state: &mut WatchState, stats: &mut CrawlStats) -> Result<()> {
        let len = state.universe.len();
        if len == 0 {
            log::warn!("Universe is empty, nothing to crawl");
            return Ok(());
        }

        let start = state.cursor;
        for i in 0..self.settings.batch_size {
            let id = state.universe[(start + i) % len];
            stats.attempted += 1;

            match self.catalog.fetch_item(id, &self.locale, &self.region).await {
                Err(e) if e.is_transport() => {
                    stats.transport_failures += 1;
                    log::warn!("Skipping app {}: {}", id, e);
                    pause(self.settings.backoff_delay_ms).await;
                }
                Err(e) => {
                    log::error!("Aborting batch at app {}: {}", id, e);
                    return Err(e);
                }
                Ok(None) => {
                    stats.unavailable += 1;
                    pause(self.settings.request_delay_ms).await;
                }
                Ok(Some(item)) => {
                    self.examine(state, &item, stats);
                    pause(self.settings.request_delay_ms).await;
                }
            }
        }
        Ok(())
    }

    /// Compare, record entries and commit the new facts for one item.
    fn examine(&self, state: &mut WatchState, item: &CatalogItem, stats: &mut CrawlStats) {
        let previous = state.facts_for(item.id);
        let current = self.detector.observe(item);
        let transitions = self
            .detector
            .detect(item, &previous, &current, self.clock.now());

        if let Some(entry) = transitions.language_added {
            log::info!("{}", entry.title);
            state.push_entry(FeedKind::LanguageAdded, entry);
            stats.language_added += 1;
        }
        if let Some(entry) = transitions.release_changed {
            log::info!("{}", entry.title);
            state.push_entry(FeedKind::ReleaseChanged, entry);
            stats.release_changed += 1;
        }

        log::debug!("Examined app {} ({})", item.id, item.name);
        state.commit_facts(item.id, current);
        stats.examined += 1;
    }
}

/// Sleep for `ms` milliseconds; zero skips the sleep.
async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
