//! Pipeline entry points for watcher operations.
//!
//! - `run_watch`: Load state, crawl one batch, publish feeds, save state
//! - `Crawler`: Cursor-based batch over the item universe
//! - `ChangeDetector`: Language and release-date transitions per item
//! - `FeedPublisher`: RSS rendering of accumulated entries

pub mod crawl;
pub mod detect;
pub mod publish;
pub mod run;

pub use crawl::{CrawlStats, Crawler};
pub use detect::{ChangeDetector, ReleaseLabel, Transitions, normalize_release_marker};
pub use publish::FeedPublisher;
pub use run::{RunSummary, run_watch};
