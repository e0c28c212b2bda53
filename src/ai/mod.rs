//! Language-model collaborators: receipt parsing and recipe suggestion.
//!
//! Both services sit behind traits so [`crate::state::AppState`] can hold either the
//! OpenAI-compatible [`client::OpenAiClient`] or an in-process test double.

pub mod client;
mod prompts;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("request to language model failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("language model returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed language model response: {0}")]
    Malformed(String),
}

impl AiError {
    /// Failures worth one more attempt: network trouble, rate limiting, server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            Self::Malformed(_) => false,
        }
    }
}

/// One line item read off a receipt. Models answer with `clean_name`, sometimes `name`,
/// occasionally both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScannedItem {
    #[serde(default)]
    pub clean_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeRequest {
    pub ingredients: Vec<String>,
    pub staples: Vec<String>,
    pub meal_context: String,
    pub people_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub time_minutes: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub used_ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
}

#[async_trait]
pub trait ReceiptScanner: Send + Sync {
    async fn scan_receipt(&self, image: Bytes, content_type: &str) -> Result<Vec<ScannedItem>, AiError>;
}

#[async_trait]
pub trait RecipeChef: Send + Sync {
    async fn suggest_recipes(&self, request: &RecipeRequest) -> Result<Vec<Recipe>, AiError>;
}

/// Pulls the list under `key` out of a model answer; a bare JSON list is accepted too.
/// Elements that do not fit `T` are dropped.
pub(crate) fn parse_list<T: serde::de::DeserializeOwned>(content: &str, key: &str) -> Result<Vec<T>, AiError> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| AiError::Malformed(e.to_string()))?;
    let list = match value {
        Value::Array(list) => list,
        Value::Object(mut obj) => match obj.remove(key) {
            Some(Value::Array(list)) => list,
            _ => return Err(AiError::Malformed(format!("expected a `{key}` list"))),
        },
        _ => return Err(AiError::Malformed("expected a JSON object or list".into())),
    };

    let total = list.len();
    let parsed: Vec<T> = list
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    if parsed.len() < total {
        warn!(skipped = total - parsed.len(), key, "dropped malformed entries");
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn items_accept_object_or_list() {
        let wrapped = r#"{"items":[{"clean_name":"Basmati Rice","category":"Pantry","quantity":1,"unit":"bag"}]}"#;
        let items: Vec<ScannedItem> = parse_list(wrapped, "items").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].clean_name.as_deref(), Some("Basmati Rice"));
        assert_eq!(items[0].quantity, Some(json!(1)));

        let bare = r#"[{"name":"Milk","category":"Dairy"}]"#;
        let items: Vec<ScannedItem> = parse_list(bare, "items").unwrap();
        assert_eq!(items[0].name.as_deref(), Some("Milk"));
        assert_eq!(items[0].quantity, None);

        let both = r#"{"items":[{"clean_name":"Whole Milk","name":"WHL MLK 1GAL","category":"Dairy"}]}"#;
        let items: Vec<ScannedItem> = parse_list(both, "items").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].clean_name.as_deref(), Some("Whole Milk"));
        assert_eq!(items[0].name.as_deref(), Some("WHL MLK 1GAL"));
    }

    #[test]
    fn malformed_answers_are_errors() {
        assert!(matches!(
            parse_list::<ScannedItem>("not json", "items"),
            Err(AiError::Malformed(_))
        ));
        assert!(matches!(
            parse_list::<ScannedItem>(r#"{"receipt": []}"#, "items"),
            Err(AiError::Malformed(_))
        ));
        assert!(matches!(parse_list::<ScannedItem>("42", "items"), Err(AiError::Malformed(_))));
    }

    #[test]
    fn bad_entries_are_dropped() {
        let content = r#"{"recipes":[
            {"name":"Fried Rice","time_minutes":20,"used_ingredients":["Rice"],"steps":["Fry"]},
            {"time_minutes":"soon"},
            "not a recipe"
        ]}"#;
        let recipes: Vec<Recipe> = parse_list(content, "recipes").unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].name, "Fried Rice");
        assert_eq!(recipes[0].description, "");
    }

    #[test]
    fn status_errors_classify_transience() {
        let err = |status| AiError::Status { status, body: String::new() };
        assert!(err(reqwest::StatusCode::BAD_GATEWAY).is_transient());
        assert!(err(reqwest::StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(!err(reqwest::StatusCode::UNAUTHORIZED).is_transient());
        assert!(!AiError::Malformed("x".into()).is_transient());
    }
}
