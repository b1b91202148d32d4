/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust response wrappers with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

/// Paged list payload used by the orders and fills endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_num: u32,
    #[serde(default)]
    pub total_page: u32,
    pub items: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}
