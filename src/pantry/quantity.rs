use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::repo_types::NewItem;

pub const DEFAULT_QUANTITY: f64 = 1.0;
pub const DEFAULT_NAME: &str = "Unknown Item";
pub const DEFAULT_CATEGORY: &str = "Pantry";

/// Extracts the first decimal number from free text, e.g. `"2 lbs"` -> 2.0.
/// Anything without a number yields [`DEFAULT_QUANTITY`].
pub fn parse_quantity_text(text: &str) -> f64 {
    lazy_static! {
        static ref NUMBER_RE: Regex = Regex::new(r"\d+(\.\d+)?").unwrap();
    }
    NUMBER_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|q| q.is_finite())
        .unwrap_or(DEFAULT_QUANTITY)
}

/// Quantity of a JSON value as sent by clients or the vision model.
pub fn parse_quantity(value: Option<&Value>) -> f64 {
    match value {
        None | Some(Value::Null) => DEFAULT_QUANTITY,
        Some(Value::String(s)) => parse_quantity_text(s),
        Some(other) => parse_quantity_text(&other.to_string()),
    }
}

/// First name candidate that is neither missing nor blank.
pub fn first_present(candidates: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    candidates.into_iter().flatten().find(|s| !s.trim().is_empty())
}

/// Builds a [`NewItem`] from loosely typed parts, applying the ingestion defaults.
pub fn normalize_item(
    name: Option<String>,
    category: Option<String>,
    quantity: Option<&Value>,
    unit: Option<String>,
) -> NewItem {
    let non_blank = |s: Option<String>| {
        s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    };
    NewItem {
        name: non_blank(name).unwrap_or_else(|| DEFAULT_NAME.into()),
        category: non_blank(category).unwrap_or_else(|| DEFAULT_CATEGORY.into()),
        quantity: parse_quantity(quantity),
        unit: unit.map(|u| u.trim().to_string()).unwrap_or_default(),
    }
}
