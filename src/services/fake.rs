// src/services/fake.rs

//! In-memory catalog used by tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{CatalogItem, ItemId};
use crate::services::CatalogClient;

/// Scripted answer for one item.
#[derive(Debug, Clone)]
pub enum FakeResponse {
    Item(CatalogItem),
    Unavailable,
    Transport,
    Fatal,
}

/// Catalog answering from a fixed table. Unknown ids are unavailable.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    pub universe: Vec<ItemId>,
    pub universe_fails: bool,
    pub responses: HashMap<ItemId, FakeResponse>,
    universe_calls: AtomicUsize,
    item_calls: Mutex<Vec<ItemId>>,
}

impl FakeCatalog {
    pub fn new(universe: Vec<ItemId>) -> Self {
        Self {
            universe,
            ..Self::default()
        }
    }

    pub fn with(mut self, id: ItemId, response: FakeResponse) -> Self {
        self.responses.insert(id, response);
        self
    }

    pub fn set(&mut self, id: ItemId, response: FakeResponse) {
        self.responses.insert(id, response);
    }

    pub fn universe_calls(&self) -> usize {
        self.universe_calls.load(Ordering::SeqCst)
    }

    pub fn item_calls(&self) -> Vec<ItemId> {
        self.item_calls.lock().unwrap().clone()
    }
}

/// Item with the given languages text and release date.
pub fn item(id: ItemId, languages: &str, release_date: &str) -> CatalogItem {
    CatalogItem {
        id,
        name: format!("Game {id}"),
        supported_languages: languages.to_string(),
        release_date: release_date.to_string(),
        image_url: Some(format!("https://cdn.example.com/{id}.jpg")),
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn fetch_universe(&self) -> Result<Vec<ItemId>> {
        self.universe_calls.fetch_add(1, Ordering::SeqCst);
        if self.universe_fails {
            return Err(AppError::transport("app list", "connection refused"));
        }
        Ok(self.universe.clone())
    }

    async fn fetch_item(
        &self,
        id: ItemId,
        _locale: &str,
        _region: &str,
    ) -> Result<Option<CatalogItem>> {
        self.item_calls.lock().unwrap().push(id);
        match self.responses.get(&id) {
            Some(FakeResponse::Item(item)) => Ok(Some(item.clone())),
            Some(FakeResponse::Transport) => {
                Err(AppError::transport(format!("app {id}"), "timed out"))
            }
            Some(FakeResponse::Fatal) => Err(AppError::catalog("unexpected response")),
            Some(FakeResponse::Unavailable) | None => Ok(None),
        }
    }
}
