use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::TextExtractor;
use crate::error::{is_transient_status, Result, RodeoError};
use crate::ingest::FileType;

/// Request body for the document-parsing service
#[derive(Serialize)]
struct ParseRequest<'a> {
    storage_path: &'a str,
    filename: &'a str,
    options: ParseOptions,
}

#[derive(Serialize)]
struct ParseOptions {
    mode: &'static str,
}

/// Client for a remote document-parsing service
///
/// The service resolves `(storage_path, filename)` against the stage itself;
/// document bytes are never sent in the request.
pub struct RemoteExtractor {
    client: Client,
    endpoint: String,
    storage_path: String,
    api_key: Option<String>,
    ocr: bool,
}

impl RemoteExtractor {
    pub fn new(
        endpoint: String,
        storage_path: String,
        api_key: Option<String>,
        ocr: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RodeoError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            storage_path,
            api_key,
            ocr,
        })
    }

    fn mode(&self) -> &'static str {
        if self.ocr {
            "OCR"
        } else {
            "default"
        }
    }
}

#[async_trait]
impl TextExtractor for RemoteExtractor {
    async fn extract(&self, staged_reference: &str, _file_type: FileType) -> Result<String> {
        let request = ParseRequest {
            storage_path: &self.storage_path,
            filename: staged_reference,
            options: ParseOptions { mode: self.mode() },
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let start = std::time::Instant::now();
        let response = builder.send().await.map_err(RodeoError::extraction)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RodeoError::Extraction {
                message: format!("Parsing service error {}: {}", status, body),
                transient: is_transient_status(status),
            });
        }

        let body = response.text().await.map_err(RodeoError::extraction)?;
        log::debug!(
            "Parsing service returned {} bytes for {} in {:?}",
            body.len(),
            staged_reference,
            start.elapsed()
        );

        Ok(normalize_response(&body))
    }

    fn name(&self) -> &str {
        "remote"
    }
}

/// Reduce a parsing-service response body to plain text.
///
/// - `{"content": "..."}` → the content
/// - `{"content": null}` or an empty body → `""`
/// - a JSON string → that string
/// - anything else (plain text, malformed JSON, JSON without `content`) →
///   the body as-is
pub fn normalize_response(body: &str) -> String {
    if body.trim().is_empty() {
        return String::new();
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("content") {
            Some(Value::String(content)) => content.clone(),
            Some(Value::Null) => String::new(),
            _ => {
                log::warn!("Parsing service payload has no text content field, keeping raw response");
                body.to_string()
            }
        },
        Ok(Value::String(text)) => text,
        Ok(_) => body.to_string(),
        Err(_) => body.to_string(),
    }
}
