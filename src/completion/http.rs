use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::CompletionService;
use crate::error::{is_transient_status, Result, RodeoError};

/// Request structure for the completion endpoint
///
/// The prompt travels as a JSON string, so quotes, braces and newlines in
/// document text are escaped by the serializer.
#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response structure from the completion endpoint
#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    answer: Option<String>,
}

/// HTTP client for the completion service
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpCompletionClient {
    /// Create a new completion client
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Full URL of the completion endpoint
    /// * `api_key` - Optional bearer token
    /// * `timeout` - Upper bound for one request, including reading the body
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RodeoError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl CompletionService for HttpCompletionClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<Option<String>> {
        let request = CompletionRequest { model, prompt };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let start = std::time::Instant::now();
        let response = builder.send().await.map_err(RodeoError::completion)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RodeoError::Completion {
                message: format!("Completion API error {}: {}", status, body),
                transient: is_transient_status(status),
            });
        }

        let body = response.text().await.map_err(RodeoError::completion)?;
        log::debug!("Completion API call took {:?} (model {})", start.elapsed(), model);

        if body.trim().is_empty() {
            return Ok(None);
        }

        let parsed: CompletionResponse = serde_json::from_str(&body).map_err(|e| RodeoError::Completion {
            message: format!("Failed to parse response: {}", e),
            transient: false,
        })?;

        Ok(parsed.answer.filter(|a| !a.trim().is_empty()))
    }

    fn name(&self) -> &str {
        "http"
    }
}
