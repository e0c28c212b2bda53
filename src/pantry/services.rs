use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    repo::PantryStore,
    repo_types::PantryItem,
    rules::{deduction_for, usage_log, Category},
};

/// One-tap adjustments offered for an inventory row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAction {
    Quarter,
    Half,
    /// Large negative delta that clamps the row to zero.
    All,
    UseOne,
}

impl QuickAction {
    pub fn delta(self) -> f64 {
        match self {
            Self::Quarter => -0.25,
            Self::Half => -0.5,
            Self::All => -100.0,
            Self::UseOne => -1.0,
        }
    }

    pub fn offered_for(category: &str) -> Vec<QuickAction> {
        if Category::parse(category).is_portioned() {
            vec![Self::Quarter, Self::Half, Self::All]
        } else {
            vec![Self::UseOne]
        }
    }
}

/// Delta applied by the restock list's "restock full" action.
pub const RESTOCK_DELTA: f64 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum PantryError {
    #[error("Item not found")]
    NotFound,
    #[error("delta must be a finite number")]
    InvalidDelta,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Applies a quantity change to one row, clamped at zero.
pub async fn adjust_item(store: &PantryStore, id: i64, delta: f64) -> Result<PantryItem, PantryError> {
    if !delta.is_finite() {
        return Err(PantryError::InvalidDelta);
    }
    store
        .adjust_quantity(id, delta)
        .await?
        .ok_or(PantryError::NotFound)
}

#[derive(Debug, Serialize)]
pub struct InventoryEntry {
    #[serde(flatten)]
    pub item: PantryItem,
    pub quick_actions: Vec<QuickAction>,
}

#[derive(Debug, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub items: Vec<InventoryEntry>,
}

/// Groups rows already ordered by category into one group per category.
pub fn group_by_category(items: Vec<PantryItem>) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for item in items {
        let entry = InventoryEntry {
            quick_actions: QuickAction::offered_for(&item.category),
            item,
        };
        if let Some(group) = groups
            .last_mut()
            .filter(|g| g.category == entry.item.category)
        {
            group.items.push(entry);
        } else {
            groups.push(CategoryGroup {
                category: entry.item.category.clone(),
                items: vec![entry],
            });
        }
    }
    groups
}

/// Deducts what a cooked recipe consumed from the pantry.
///
/// Each fragment is matched best-effort against the oldest in-stock row containing it;
/// fragments without a match are skipped. Returns one log line per deduction.
pub async fn deduct_ingredients(
    store: &PantryStore,
    ingredient_names: &[String],
    people_count: u32,
) -> anyhow::Result<Vec<String>> {
    let mut logs = Vec::new();
    for fragment in ingredient_names {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        let Some(item) = store.find_first_match(fragment).await? else {
            continue;
        };

        let deduction = deduction_for(&item.category, &item.item_name, people_count);
        let remaining = (item.quantity - deduction).max(0.0);
        store.set_quantity(item.id, remaining).await?;
        debug!(item_id = item.id, deduction, remaining, "ingredient deducted");
        logs.push(usage_log(deduction, &item.item_name));
    }
    Ok(logs)
}
