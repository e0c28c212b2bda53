use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{
    parse_list,
    prompts::{recipe_prompt, RECEIPT_PROMPT},
    AiError, ReceiptScanner, Recipe, RecipeChef, RecipeRequest, ScannedItem,
};
use crate::config::OpenAiConfig;

const MAX_RETRIES: u32 = 1;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);
const RECEIPT_MAX_TOKENS: u32 = 1500;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completions client serving both the vision and the recipe roles.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(cfg: &OpenAiConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
        })
    }

    /// Sends one user turn and returns the assistant's JSON text.
    async fn complete_json(
        &self,
        content: Vec<ContentPart>,
        max_tokens: Option<u32>,
    ) -> Result<String, AiError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
            max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let mut attempt = 0;
        loop {
            match self.send_once(&request).await {
                Err(e) if e.is_transient() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    warn!(error = %e, attempt, "transient language model failure, retrying");
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                other => return other,
            }
        }
    }

    async fn send_once(&self, request: &ChatRequest<'_>) -> Result<String, AiError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AiError::Status { status, body });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| AiError::Malformed(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AiError::Malformed("response has no message content".into()))
    }
}

#[async_trait]
impl ReceiptScanner for OpenAiClient {
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    async fn scan_receipt(&self, image: Bytes, content_type: &str) -> Result<Vec<ScannedItem>, AiError> {
        let data_url = format!("data:{};base64,{}", content_type, STANDARD.encode(&image));
        let content = vec![
            ContentPart::Text {
                text: RECEIPT_PROMPT.to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: data_url,
                    detail: "high",
                },
            },
        ];
        let answer = self.complete_json(content, Some(RECEIPT_MAX_TOKENS)).await?;
        let items = parse_list(&answer, "items")?;
        debug!(count = items.len(), "receipt parsed");
        Ok(items)
    }
}

#[async_trait]
impl RecipeChef for OpenAiClient {
    #[instrument(skip(self, request), fields(people = request.people_count))]
    async fn suggest_recipes(&self, request: &RecipeRequest) -> Result<Vec<Recipe>, AiError> {
        let content = vec![ContentPart::Text {
            text: recipe_prompt(request),
        }];
        let answer = self.complete_json(content, None).await?;
        let recipes = parse_list(&answer, "recipes")?;
        debug!(count = recipes.len(), "recipes suggested");
        Ok(recipes)
    }
}
