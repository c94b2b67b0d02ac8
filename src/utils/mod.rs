//! Utility functions and helpers.

pub mod http;

use crate::models::{ID_PLACEHOLDER, ItemId};

/// Substitute the item id into a URL template.
pub fn fill_id_template(template: &str, id: ItemId) -> String {
    template.replace(ID_PLACEHOLDER, &id.to_string())
}
