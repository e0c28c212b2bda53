use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Pantry row in a user's database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PantryItem {
    pub id: i64,
    pub item_name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

/// Item ready to be merged into a pantry, defaults already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
}

impl NewItem {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            quantity,
            unit: unit.into(),
        }
    }
}
