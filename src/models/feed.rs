//! Feed entry data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ItemId;

/// Kind of transition an entry reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// Target language appeared in the supported languages
    LanguageAdded,
    /// Release date appeared or changed
    ReleaseChanged,
}

impl FeedKind {
    /// Prefix used when building entry guids.
    pub const fn guid_prefix(&self) -> &'static str {
        match self {
            Self::LanguageAdded => "lang",
            Self::ReleaseChanged => "release",
        }
    }

    /// Build a guid unique per item, kind and creation second.
    pub fn guid(&self, id: ItemId, created_at: DateTime<Utc>) -> String {
        format!("{}-{}-{}", self.guid_prefix(), id, created_at.timestamp())
    }
}

/// One emitted, immutable record of a detected transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub guid: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_guid_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(FeedKind::LanguageAdded.guid(10, at), "lang-10-1714564800");
        assert_eq!(
            FeedKind::ReleaseChanged.guid(10, at),
            "release-10-1714564800"
        );
    }
}
