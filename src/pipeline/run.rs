// src/pipeline/run.rs

//! One complete watcher run: load, crawl, publish, save.

use std::path::PathBuf;

use crate::clock::Clock;
use crate::error::Result;
use crate::models::Config;
use crate::services::CatalogClient;
use crate::storage::{StateStore, WatchState};

use super::crawl::{CrawlStats, Crawler};
use super::publish::FeedPublisher;

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: CrawlStats,
    /// Feed documents written
    pub feeds: Vec<PathBuf>,
}

impl RunSummary {
    /// One-line report for the invoking environment.
    pub fn line(&self) -> String {
        format!(
            "checked={} cursor={}/{} lang_added={} rel_changes={}",
            self.stats.examined,
            self.stats.cursor,
            self.stats.universe_len,
            self.stats.language_added,
            self.stats.release_changed
        )
    }
}

/// Run the watcher once.
///
/// The state is saved exactly once after the batch, whether or not the
/// batch completed. Feed documents are only rewritten when the batch
/// completed. When both the run and the save fail, the run error is
/// returned and the save error is logged.
pub async fn run_watch(
    config: &Config,
    catalog: &dyn CatalogClient,
    store: &dyn StateStore,
    clock: &dyn Clock,
) -> Result<RunSummary> {
    let mut state = store.load().await?;

    let outcome = crawl_and_publish(config, catalog, clock, &mut state).await;
    let saved = store.save(&state).await;

    match (outcome, saved) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Ok(_), Err(e)) => {
            log::error!("Failed to save state: {}", e);
            Err(e)
        }
        (Err(e), Ok(())) => {
            log::error!("Run aborted, partial progress saved: {}", e);
            Err(e)
        }
        (Err(e), Err(save_error)) => {
            log::error!("Run aborted and state could not be saved: {}", save_error);
            Err(e)
        }
    }
}

async fn crawl_and_publish(
    config: &Config,
    catalog: &dyn CatalogClient,
    clock: &dyn Clock,
    state: &mut WatchState,
) -> Result<RunSummary> {
    let crawler = Crawler::new(config, catalog, clock);
    let stats = crawler.crawl(state).await?;

    log::info!(
        "Batch done: {} attempted, {} examined, {} transport failures, {} unavailable",
        stats.attempted,
        stats.examined,
        stats.transport_failures,
        stats.unavailable
    );

    let publisher = FeedPublisher::from_config(&config.feeds);
    let feeds = publisher.publish(state, clock.now()).await?;

    Ok(RunSummary { stats, feeds })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::AppError;
    use crate::services::fake::{FakeCatalog, FakeResponse, item};
    use crate::storage::LocalStorage;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn config(dir: &TempDir, batch_size: usize) -> Config {
        let mut config = Config::default();
        config.crawler.batch_size = batch_size;
        config.crawler.request_delay_ms = 0;
        config.crawler.backoff_delay_ms = 0;
        config.feeds.output_dir = dir.path().to_path_buf();
        config.storage.state_path = dir.path().join("state.json.gz");
        config
    }

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_run_writes_state_and_feeds() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp, 2);
        let store = LocalStorage::new(&config.storage.state_path);
        let catalog = FakeCatalog::new(vec![10, 20, 30])
            .with(10, FakeResponse::Item(item(10, "Japanese", "")))
            .with(20, FakeResponse::Item(item(20, "English", "Q4 2024")));

        let summary = run_watch(&config, &catalog, &store, &clock()).await.unwrap();
        assert_eq!(
            summary.line(),
            "checked=2 cursor=2/3 lang_added=1 rel_changes=1"
        );
        assert_eq!(summary.feeds.len(), 2);

        let state = store.load().await.unwrap();
        assert_eq!(state.cursor, 2);
        assert_eq!(state.language_entries[0].guid, "lang-10-1714564800");
        assert_eq!(state.release_entries[0].guid, "release-20-1714564800");

        let lang = std::fs::read_to_string(tmp.path().join("rss_lang_ja_added.xml")).unwrap();
        assert!(lang.contains("[JA added] Game 10"));
        let release = std::fs::read_to_string(tmp.path().join("rss_release_changed.xml")).unwrap();
        let release = rss::Channel::read_from(release.as_bytes()).unwrap();
        assert_eq!(
            release.items()[0].title(),
            Some("[Release date added] Game 20 -> Q4 2024")
        );
    }

    #[tokio::test]
    async fn test_runs_resume_from_saved_cursor() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp, 2);
        let store = LocalStorage::new(&config.storage.state_path);
        let catalog = FakeCatalog::new(vec![1, 2, 3])
            .with(1, FakeResponse::Item(item(1, "", "")))
            .with(2, FakeResponse::Item(item(2, "", "")))
            .with(3, FakeResponse::Item(item(3, "", "")));
        let clock = clock();

        run_watch(&config, &catalog, &store, &clock).await.unwrap();
        clock.advance(chrono::Duration::hours(1));
        let summary = run_watch(&config, &catalog, &store, &clock).await.unwrap();

        assert_eq!(catalog.universe_calls(), 1);
        assert_eq!(catalog.item_calls(), vec![1, 2, 3, 1]);
        assert_eq!(summary.stats.cursor, 1);
    }

    #[tokio::test]
    async fn test_aborted_run_saves_progress_and_keeps_feeds() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp, 3);
        let store = LocalStorage::new(&config.storage.state_path);
        let feed_path = tmp.path().join("rss_lang_ja_added.xml");
        std::fs::write(&feed_path, "previous feed").unwrap();

        let catalog = FakeCatalog::new(vec![1, 2, 3])
            .with(1, FakeResponse::Item(item(1, "Japanese", "")))
            .with(2, FakeResponse::Fatal);

        let err = run_watch(&config, &catalog, &store, &clock()).await.unwrap_err();
        assert!(matches!(err, AppError::Catalog(_)));

        let state = store.load().await.unwrap();
        assert_eq!(state.universe, vec![1, 2, 3]);
        assert_eq!(state.cursor, 1);
        assert_eq!(state.language_entries.len(), 1);
        assert!(state.facts.contains_key(&1));

        assert_eq!(std::fs::read_to_string(&feed_path).unwrap(), "previous feed");
        assert!(!tmp.path().join("rss_release_changed.xml").exists());
    }

    struct ReadOnlyStore;

    #[async_trait]
    impl StateStore for ReadOnlyStore {
        async fn load(&self) -> Result<WatchState> {
            Ok(WatchState::default())
        }

        async fn save(&self, _state: &WatchState) -> Result<()> {
            Err(AppError::Io(std::io::Error::other("read-only filesystem")))
        }
    }

    #[tokio::test]
    async fn test_failed_save_fails_run() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp, 1);
        let catalog = FakeCatalog::new(vec![1]);

        let err = run_watch(&config, &catalog, &ReadOnlyStore, &clock())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[tokio::test]
    async fn test_crawl_error_wins_over_save_error() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp, 1);
        let catalog = FakeCatalog::new(vec![1]).with(1, FakeResponse::Fatal);

        let err = run_watch(&config, &catalog, &ReadOnlyStore, &clock())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Catalog(_)));
    }
}
