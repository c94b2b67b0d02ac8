// src/models/item.rs

use serde::{Deserialize, Serialize};

/// Catalog item identifier.
pub type ItemId = u64;

/// Last-observed values tracked per item for change detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFacts {
    #[serde(default)]
    pub has_target_language: bool,
    /// Trimmed release date text; empty means "no date".
    #[serde(default)]
    pub release_marker: String,
}

/// Detail record for one item as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    /// Raw supported-languages text, may contain markup and entities
    pub supported_languages: String,
    /// Raw human-readable release date
    pub release_date: String,
    pub image_url: Option<String>,
}
