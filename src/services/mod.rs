//! Service layer for the watcher.
//!
//! - Catalog lookups (`CatalogClient`, `SteamCatalog`)

mod catalog;
#[cfg(test)]
pub(crate) mod fake;

pub use catalog::{CatalogClient, SteamCatalog};
