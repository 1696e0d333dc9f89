// Vibeforge Integration Layer - HTTP Chat Client
//
// Chat inference against an OpenAI-compatible completions endpoint.

use async_trait::async_trait;
use isahc::{config::Configurable, AsyncReadResponseExt, HttpClient, Request};
use serde::Serialize;
use std::time::Duration;
use tokio::time::timeout;

use super::adapter::{ChatConfig, ChatMessage, ChatOptions, ChatProvider, ChatResponse};
use super::error::{IntegrationError, IntegrationResult};

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

pub struct HttpChat {
    client: HttpClient,
    config: ChatConfig,
}

impl HttpChat {
    pub fn new(config: ChatConfig) -> IntegrationResult<Self> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn request_body(messages: &[ChatMessage], options: &ChatOptions) -> IntegrationResult<String> {
        Ok(serde_json::to_string(&CompletionRequest {
            model: &options.model,
            messages,
        })?)
    }
}

/// Model ids from a catalog response: a bare array, or an object holding
/// one under `models` or `data`. Entries are ids or objects with an `id`.
pub fn model_ids(value: &serde_json::Value) -> Vec<String> {
    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        serde_json::Value::Object(map) => match map.get("models").or_else(|| map.get("data")) {
            Some(serde_json::Value::Array(entries)) => entries,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    entries
        .iter()
        .filter_map(|entry| match entry {
            serde_json::Value::String(id) => Some(id.clone()),
            other => other.get("id").and_then(|id| id.as_str()).map(str::to_string),
        })
        .collect()
}

impl HttpChat {
    /// Fetch the model catalog
    pub async fn list_models(&self) -> IntegrationResult<Vec<String>> {
        let endpoint = self.config.models_endpoint.as_str();
        let text = timeout(Duration::from_secs(self.config.timeout_secs), async {
            let mut response = self.client.get_async(endpoint).await?;
            let status = response.status();
            let text = response.text().await?;
            if status.is_success() {
                Ok::<_, IntegrationError>(text)
            } else {
                Err(IntegrationError::Http(format!("{} returned {}", endpoint, status)))
            }
        })
        .await
        .map_err(|_| IntegrationError::Timeout {
            operation: "list models".to_string(),
            duration_secs: self.config.timeout_secs,
        })??;

        let value: serde_json::Value = serde_json::from_str(&text)?;
        Ok(model_ids(&value))
    }
}

#[async_trait]
impl ChatProvider for HttpChat {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> IntegrationResult<ChatResponse> {
        let body = Self::request_body(messages, options)?;
        let mut builder = Request::post(self.config.endpoint.as_str())
            .header("content-type", "application/json")
            .header("accept", "application/json");
        if let Some(key) = &self.config.api_key {
            builder = builder.header("authorization", format!("Bearer {}", key));
        }
        let request = builder.body(body)?;

        log::debug!(
            "Vibeforge: chat request to {} with model {}",
            self.config.endpoint,
            options.model
        );

        // isahc enforces the timeout too; this covers reading the body.
        let text = timeout(Duration::from_secs(self.config.timeout_secs), async {
            let mut response = self.client.send_async(request).await?;
            let status = response.status();
            let text = response.text().await?;
            if status.is_success() {
                Ok::<_, IntegrationError>(text)
            } else {
                Err(IntegrationError::Inference(format!(
                    "{} returned {}: {}",
                    self.config.endpoint, status, text
                )))
            }
        })
        .await
        .map_err(|_| IntegrationError::Timeout {
            operation: format!("chat {}", options.model),
            duration_secs: self.config.timeout_secs,
        })??;

        let value: serde_json::Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            // Some endpoints answer with the completion as plain text.
            Err(_) => serde_json::Value::String(text),
        };
        Ok(ChatResponse::from_value(&value))
    }
}
