// src/pipeline/publish.rs

//! Feed publishing.
//!
//! Renders each accumulated entry list into its own RSS 2.0 document with the
//! Media RSS namespace. Entries with an image get a `<media:thumbnail>` and
//! an inline `<img>` at the top of the description.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rss::extension::{Extension, ExtensionMap};
use rss::{Channel, Guid, Item};

use crate::error::{AppError, Result};
use crate::models::{FeedConfig, FeedEntry, FeedKind, FeedsConfig};
use crate::storage::{WatchState, write_atomic};

/// Media RSS namespace URI.
pub const MEDIA_NAMESPACE: &str = "http://search.yahoo.com/mrss/";

const CHANNEL_DESCRIPTION: &str = "Catalog watch feed";
const CHANNEL_LANGUAGE: &str = "en";

/// Renders and writes the two output documents.
#[derive(Debug, Clone)]
pub struct FeedPublisher {
    max_items: usize,
    output_dir: PathBuf,
    language: FeedConfig,
    release: FeedConfig,
}

impl FeedPublisher {
    pub fn from_config(config: &FeedsConfig) -> Self {
        Self {
            max_items: config.max_items,
            output_dir: config.output_dir.clone(),
            language: config.language.clone(),
            release: config.release.clone(),
        }
    }

    /// Document definition for a feed kind.
    pub fn feed(&self, kind: FeedKind) -> &FeedConfig {
        match kind {
            FeedKind::LanguageAdded => &self.language,
            FeedKind::ReleaseChanged => &self.release,
        }
    }

    /// Output location for a feed kind.
    pub fn output_path(&self, kind: FeedKind) -> PathBuf {
        self.output_dir.join(&self.feed(kind).file_name)
    }

    /// Render the most recent `max_items` entries, newest first.
    pub fn render(
        entries: &[FeedEntry],
        feed: &FeedConfig,
        max_items: usize,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let items: Vec<Item> = entries.iter().take(max_items).map(render_item).collect();

        let mut namespaces = BTreeMap::new();
        namespaces.insert("media".to_string(), MEDIA_NAMESPACE.to_string());

        let mut channel = Channel::default();
        channel.set_title(feed.title.clone());
        channel.set_link(feed.self_link.clone());
        channel.set_description(CHANNEL_DESCRIPTION);
        channel.set_language(Some(CHANNEL_LANGUAGE.to_string()));
        channel.set_last_build_date(Some(rfc822_date(now)));
        channel.set_namespaces(namespaces);
        channel.set_items(items);

        let buffer = channel
            .pretty_write_to(Vec::new(), b' ', 2)
            .map_err(AppError::feed)?;
        String::from_utf8(buffer).map_err(AppError::feed)
    }

    /// Render both documents and write each atomically.
    pub async fn publish(&self, state: &WatchState, now: DateTime<Utc>) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for kind in [FeedKind::LanguageAdded, FeedKind::ReleaseChanged] {
            let entries = state.entries(kind);
            let xml = Self::render(entries, self.feed(kind), self.max_items, now)?;
            let path = self.output_path(kind);
            write_atomic(&path, xml.as_bytes()).await?;
            log::info!(
                "Feed written to {} ({} of {} entries)",
                path.display(),
                entries.len().min(self.max_items),
                entries.len()
            );
            written.push(path);
        }
        Ok(written)
    }
}

/// RFC 822 date with a zero-padded day, always in UTC.
fn rfc822_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

fn render_item(entry: &FeedEntry) -> Item {
    let mut guid = Guid::default();
    guid.set_value(entry.guid.clone());
    guid.set_permalink(false);

    let description = match &entry.image_url {
        Some(url) => format!("{}{}", inline_image(url), entry.description),
        None => entry.description.clone(),
    };

    let mut item = Item::default();
    item.set_title(entry.title.clone());
    item.set_link(entry.link.clone());
    item.set_guid(guid);
    item.set_pub_date(rfc822_date(entry.published_at));
    item.set_description(description);
    if let Some(url) = &entry.image_url {
        item.set_extensions(media_thumbnail(url));
    }
    item
}

fn media_thumbnail(url: &str) -> ExtensionMap {
    let mut thumbnail = Extension::default();
    thumbnail.name = "media:thumbnail".to_string();
    thumbnail.attrs.insert("url".to_string(), url.to_string());

    let mut media = BTreeMap::new();
    media.insert("thumbnail".to_string(), vec![thumbnail]);

    let mut extensions = ExtensionMap::new();
    extensions.insert("media".to_string(), media);
    extensions
}

fn inline_image(url: &str) -> String {
    format!(
        r#"<p><img src="{}" referrerpolicy="no-referrer" loading="lazy" /></p>"#,
        escape_attr(url)
    )
}

/// Escape a value for use inside a double-quoted HTML attribute.
fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
