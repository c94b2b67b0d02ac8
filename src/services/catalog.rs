// src/services/catalog.rs

//! Catalog client service.
//!
//! Wraps the upstream listing and per-item detail lookups. Pure
//! request/response: no state, no retries.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{CatalogConfig, CatalogItem, ItemId};
use crate::utils::fill_id_template;
use crate::utils::http::create_async_client;

/// Lookup service over the upstream catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch every item id in the catalog, in listing order.
    async fn fetch_universe(&self) -> Result<Vec<ItemId>>;

    /// Fetch one item's details.
    ///
    /// `Ok(None)` means the catalog has no usable data for this item in the
    /// given locale/region. Only network-level failures are errors.
    async fn fetch_item(
        &self,
        id: ItemId,
        locale: &str,
        region: &str,
    ) -> Result<Option<CatalogItem>>;
}

/// HTTP client for the Steam store API.
pub struct SteamCatalog {
    config: CatalogConfig,
    client: Client,
}

impl SteamCatalog {
    /// Create a new catalog client with the given configuration.
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let client = create_async_client(&config)?;
        Ok(Self { config, client })
    }

    /// GET a URL and return the body of a successful response.
    async fn get(&self, url: &str, query: &[(&str, String)], context: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::transport(context, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::transport(context, format!("HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::transport(context, e))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl CatalogClient for SteamCatalog {
    async fn fetch_universe(&self) -> Result<Vec<ItemId>> {
        let body = self.get(&self.config.listing_url, &[], "app list").await?;
        let ids = parse_listing(&body)?;
        log::info!("Fetched catalog listing with {} items", ids.len());
        Ok(ids)
    }

    async fn fetch_item(
        &self,
        id: ItemId,
        locale: &str,
        region: &str,
    ) -> Result<Option<CatalogItem>> {
        let query = [
            ("appids", id.to_string()),
            ("l", locale.to_string()),
            ("cc", region.to_string()),
        ];
        let context = format!("app {id}");
        let body = self.get(&self.config.details_url, &query, &context).await?;

        let item = parse_details(id, &body, &self.config.image_fallback_url);
        if item.is_none() {
            log::debug!("No usable details for app {}", id);
        }
        Ok(item)
    }
}

#[derive(Deserialize)]
struct ListingResponse {
    applist: Listing,
}

#[derive(Deserialize)]
struct Listing {
    #[serde(default)]
    apps: Vec<ListingEntry>,
}

#[derive(Deserialize)]
struct ListingEntry {
    #[serde(default)]
    appid: Option<ItemId>,
}

#[derive(Deserialize)]
struct DetailsEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ItemData>,
}

#[derive(Deserialize)]
struct ItemData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    supported_languages: Option<String>,
    #[serde(default)]
    release_date: Option<ReleaseDate>,
    #[serde(default)]
    capsule_imagev5: Option<String>,
    #[serde(default)]
    capsule_image: Option<String>,
    #[serde(default)]
    header_image: Option<String>,
}

#[derive(Deserialize)]
struct ReleaseDate {
    #[serde(default)]
    date: Option<String>,
}

/// Extract item ids from a listing body, skipping entries without an id.
fn parse_listing(body: &[u8]) -> Result<Vec<ItemId>> {
    let listing: ListingResponse = serde_json::from_slice(body)
        .map_err(|e| AppError::catalog(format!("malformed app list: {e}")))?;
    Ok(listing
        .applist
        .apps
        .into_iter()
        .filter_map(|entry| entry.appid)
        .collect())
}

/// Parse a detail body. Anything other than a successful record for `id`
/// yields `None`.
fn parse_details(id: ItemId, body: &[u8], image_fallback: &str) -> Option<CatalogItem> {
    let mut envelopes: HashMap<String, DetailsEnvelope> = serde_json::from_slice(body).ok()?;
    let envelope = envelopes.remove(&id.to_string())?;
    if !envelope.success {
        return None;
    }
    let data = envelope.data?;

    let image_url = [data.capsule_imagev5, data.capsule_image, data.header_image]
        .into_iter()
        .flatten()
        .find(|url| !url.is_empty())
        .unwrap_or_else(|| fill_id_template(image_fallback, id));

    Some(CatalogItem {
        id,
        name: non_empty(data.name).unwrap_or_else(|| format!("App {id}")),
        supported_languages: data.supported_languages.unwrap_or_default(),
        release_date: data
            .release_date
            .and_then(|rd| rd.date)
            .unwrap_or_default(),
        image_url: Some(image_url),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
