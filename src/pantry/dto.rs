use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    quantity::{first_present, normalize_item},
    repo_types::{NewItem, PantryItem},
    services::{CategoryGroup, QuickAction},
};

/// Loosely typed item as typed in by the user; quantity may be a number or free text.
/// The name may arrive as `name`, `clean_name` or `item_name`, first non-blank wins.
#[derive(Debug, Deserialize)]
pub struct ItemInput {
    pub name: Option<String>,
    pub clean_name: Option<String>,
    pub item_name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<Value>,
    pub unit: Option<String>,
}

impl From<ItemInput> for NewItem {
    fn from(input: ItemInput) -> Self {
        let name = first_present([input.name, input.clean_name, input.item_name]);
        normalize_item(name, input.category, input.quantity.as_ref(), input.unit)
    }
}

#[derive(Debug, Deserialize)]
pub struct AddItemsRequest {
    pub items: Vec<ItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub delta: f64,
}

#[derive(Debug, Deserialize)]
pub struct UseRequest {
    pub action: QuickAction,
}

#[derive(Debug, Serialize)]
pub struct InventoryResponse {
    pub categories: Vec<CategoryGroup>,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub items: Vec<PantryItem>,
}
