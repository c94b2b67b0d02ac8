//! Change detection between two observations of the same item.
//!
//! Two independent checks run per item:
//!
//! - **Language added**: the target language was absent and is now present.
//!   Removal is never reported.
//! - **Release marker changed**: the trimmed release date text differs. An
//!   empty previous value is labelled "added", everything else "changed".

use chrono::{DateTime, Utc};
use scraper::Html;

use crate::models::{CatalogItem, Config, FeedEntry, FeedKind, ItemFacts, LanguageConfig};
use crate::utils::fill_id_template;

/// How a release marker transition is labelled in entry titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseLabel {
    Added,
    Changed,
}

impl ReleaseLabel {
    /// Classify a marker transition, `None` when nothing changed.
    pub fn classify(previous: &str, current: &str) -> Option<Self> {
        if previous == current {
            None
        } else if previous.is_empty() {
            Some(Self::Added)
        } else {
            Some(Self::Changed)
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "Release date added",
            Self::Changed => "Release date changed",
        }
    }
}

/// Entries produced by one comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transitions {
    pub language_added: Option<FeedEntry>,
    pub release_changed: Option<FeedEntry>,
}

impl Transitions {
    pub fn is_empty(&self) -> bool {
        self.language_added.is_none() && self.release_changed.is_none()
    }
}

/// Trim a raw release date. The result is an opaque token compared for
/// equality only; empty means "no date".
pub fn normalize_release_marker(raw: &str) -> String {
    raw.trim().to_string()
}

/// Compares previous and current facts and builds feed entries.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    language: LanguageConfig,
    item_link_url: String,
}

impl ChangeDetector {
    /// Create a detector for the given target language.
    pub fn new(language: LanguageConfig, item_link_url: impl Into<String>) -> Self {
        Self {
            language,
            item_link_url: item_link_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.language.clone(), config.catalog.item_link_url.clone())
    }

    /// Whether the supported-languages text mentions the target language.
    ///
    /// Entities are decoded and markup dropped before a case-insensitive
    /// substring match on either the keyword or the native-script name.
    /// Only text content counts: attribute values are ignored and text nodes
    /// are joined with a space, so a name split by tags does not match.
    pub fn has_target_language(&self, supported_languages: &str) -> bool {
        if supported_languages.trim().is_empty() {
            return false;
        }

        let fragment = Html::parse_fragment(supported_languages);
        let text = fragment
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        [&self.language.keyword, &self.language.native_name]
            .into_iter()
            .map(|needle| needle.trim().to_lowercase())
            .any(|needle| !needle.is_empty() && text.contains(&needle))
    }

    /// Derive the tracked facts from a freshly fetched item.
    pub fn observe(&self, item: &CatalogItem) -> ItemFacts {
        ItemFacts {
            has_target_language: self.has_target_language(&item.supported_languages),
            release_marker: normalize_release_marker(&item.release_date),
        }
    }

    /// Compare two observations. Never touches stored facts.
    pub fn detect(
        &self,
        item: &CatalogItem,
        previous: &ItemFacts,
        current: &ItemFacts,
        now: DateTime<Utc>,
    ) -> Transitions {
        let language_added = (!previous.has_target_language && current.has_target_language)
            .then(|| {
                self.entry(
                    item,
                    FeedKind::LanguageAdded,
                    format!("[{} added] {}", self.language.tag, item.name),
                    format!(
                        "{} language appeared in supported_languages.",
                        self.language.name
                    ),
                    now,
                )
            });

        let release_changed =
            ReleaseLabel::classify(&previous.release_marker, &current.release_marker).map(
                |label| {
                    let shown = if current.release_marker.is_empty() {
                        "(blank)"
                    } else {
                        current.release_marker.as_str()
                    };
                    self.entry(
                        item,
                        FeedKind::ReleaseChanged,
                        format!("[{}] {} -> {}", label.as_str(), item.name, shown),
                        format!(
                            "release_date.date: '{}' -> '{}'",
                            previous.release_marker, current.release_marker
                        ),
                        now,
                    )
                },
            );

        Transitions {
            language_added,
            release_changed,
        }
    }

    fn entry(
        &self,
        item: &CatalogItem,
        kind: FeedKind,
        title: String,
        description: String,
        now: DateTime<Utc>,
    ) -> FeedEntry {
        FeedEntry {
            title,
            link: fill_id_template(&self.item_link_url, item.id),
            guid: kind.guid(item.id, now),
            published_at: now,
            description,
            image_url: item.image_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn detector() -> ChangeDetector {
        ChangeDetector::new(
            LanguageConfig::default(),
            "https://store.example.com/app/{id}/",
        )
    }

    fn make_item(id: u64) -> CatalogItem {
        CatalogItem {
            id,
            name: format!("Game {}", id),
            supported_languages: String::new(),
            release_date: String::new(),
            image_url: Some(format!("https://cdn.example.com/{}.jpg", id)),
        }
    }

    fn facts(has_target_language: bool, release_marker: &str) -> ItemFacts {
        ItemFacts {
            has_target_language,
            release_marker: release_marker.to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_no_changes() {
        let d = detector();
        let item = make_item(1);
        for f in [
            facts(false, ""),
            facts(true, ""),
            facts(false, "2024-05-01"),
            facts(true, "Coming soon"),
        ] {
            assert!(d.detect(&item, &f, &f, now()).is_empty());
        }
    }

    #[test]
    fn test_language_added() {
        let d = detector();
        let item = make_item(10);
        let result = d.detect(&item, &facts(false, ""), &facts(true, ""), now());

        let entry = result.language_added.unwrap();
        assert_eq!(entry.title, "[JA added] Game 10");
        assert_eq!(entry.link, "https://store.example.com/app/10/");
        assert_eq!(entry.guid, "lang-10-1714564800");
        assert_eq!(entry.published_at, now());
        assert_eq!(
            entry.description,
            "Japanese language appeared in supported_languages."
        );
        assert_eq!(entry.image_url.as_deref(), Some("https://cdn.example.com/10.jpg"));
        assert!(result.release_changed.is_none());
    }

    #[test]
    fn test_language_removed_is_silent() {
        let d = detector();
        let item = make_item(10);
        assert!(d.detect(&item, &facts(true, ""), &facts(false, ""), now()).is_empty());
        assert!(d.detect(&item, &facts(false, ""), &facts(false, ""), now()).is_empty());
        assert!(d.detect(&item, &facts(true, ""), &facts(true, ""), now()).is_empty());
    }

    #[test]
    fn test_release_added() {
        let d = detector();
        let item = make_item(20);
        let result = d.detect(&item, &facts(false, ""), &facts(false, "2024-05-01"), now());

        let entry = result.release_changed.unwrap();
        assert_eq!(entry.title, "[Release date added] Game 20 -> 2024-05-01");
        assert_eq!(entry.description, "release_date.date: '' -> '2024-05-01'");
        assert_eq!(entry.guid, "release-20-1714564800");
        assert!(result.language_added.is_none());
    }

    #[test]
    fn test_release_changed() {
        let d = detector();
        let item = make_item(20);
        let result = d.detect(
            &item,
            &facts(false, "2024-05-01"),
            &facts(false, "2024-06-10"),
            now(),
        );
        assert_eq!(
            result.release_changed.unwrap().title,
            "[Release date changed] Game 20 -> 2024-06-10"
        );
    }

    #[test]
    fn test_release_cleared_is_labelled_changed() {
        let d = detector();
        let item = make_item(20);
        let result = d.detect(&item, &facts(false, "2024-06-10"), &facts(false, ""), now());

        let entry = result.release_changed.unwrap();
        assert_eq!(entry.title, "[Release date changed] Game 20 -> (blank)");
        assert_eq!(entry.description, "release_date.date: '2024-06-10' -> ''");
    }

    #[test]
    fn test_both_transitions_fire() {
        let d = detector();
        let item = make_item(30);
        let result = d.detect(&item, &facts(false, ""), &facts(true, "Q3 2025"), now());
        assert!(result.language_added.is_some());
        assert!(result.release_changed.is_some());
    }

    #[test]
    fn test_classify_labels() {
        assert_eq!(ReleaseLabel::classify("", ""), None);
        assert_eq!(ReleaseLabel::classify("", "2024"), Some(ReleaseLabel::Added));
        assert_eq!(ReleaseLabel::classify("2024", "2025"), Some(ReleaseLabel::Changed));
        assert_eq!(ReleaseLabel::classify("2024", ""), Some(ReleaseLabel::Changed));
    }

    #[test]
    fn test_has_target_language() {
        let d = detector();
        assert!(d.has_target_language("English, Japanese"));
        assert!(d.has_target_language("English<strong>*</strong>, JAPANESE<br>"));
        assert!(d.has_target_language("英語、日本語"));
        assert!(d.has_target_language("English, &#74;apanese"));
        assert!(d.has_target_language("&#26085;&#26412;&#35486;"));
        assert!(!d.has_target_language("English, French"));
        assert!(!d.has_target_language(""));
        assert!(!d.has_target_language("   "));
    }

    #[test]
    fn test_language_match_reads_text_only() {
        let d = detector();
        assert!(!d.has_target_language(r#"English<img alt="Japanese">"#));
        assert!(!d.has_target_language("English, Japa<b>nese</b>"));
        assert!(d.has_target_language("English,<br>Japanese<strong>*</strong>"));
        assert!(d.has_target_language("Fran&ccedil;ais, &lt;Japanese&gt;"));
    }

    #[test]
    fn test_observe_normalizes_release() {
        let d = detector();
        let mut item = make_item(5);
        item.supported_languages = "Japanese".to_string();
        item.release_date = "  1 Nov, 2000 \n".to_string();

        assert_eq!(d.observe(&item), facts(true, "1 Nov, 2000"));

        item.release_date = "   ".to_string();
        assert_eq!(d.observe(&item).release_marker, "");
    }
}
