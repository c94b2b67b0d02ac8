// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains the data structures shared by the catalog client,
//! the crawl pipeline and the state store.

mod config;
mod feed;
mod item;

// Re-export all public types
pub use config::{
    CatalogConfig, Config, CrawlerConfig, FeedConfig, FeedsConfig, ID_PLACEHOLDER,
    LanguageConfig, StorageConfig,
};
pub use feed::{FeedEntry, FeedKind};
pub use item::{CatalogItem, ItemFacts, ItemId};
