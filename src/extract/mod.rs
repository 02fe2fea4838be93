//! Text extraction strategies.
//!
//! A remote document-parsing service handles the supported types; a local
//! best-effort decoder covers offline mode and types the service cannot read.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{api_key_from_env, Config, ExtractionMode};
use crate::error::{Result, RodeoError};
use crate::ingest::FileType;
use crate::storage::BlobStore;

pub use local::{decode_bytes, LocalExtractor};
pub use remote::{normalize_response, RemoteExtractor};

/// Turns a staged document into plain text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text from a staged document. Returns an empty string, not an
    /// error, when the document holds no text.
    async fn extract(&self, staged_reference: &str, file_type: FileType) -> Result<String>;

    /// Get extractor name for logging
    fn name(&self) -> &str;
}

/// Picks the remote or local extractor per document type
pub struct ExtractionStrategy {
    remote: Option<RemoteExtractor>,
    local: Option<LocalExtractor>,
}

impl ExtractionStrategy {
    pub fn new(remote: Option<RemoteExtractor>, local: Option<LocalExtractor>) -> Self {
        Self { remote, local }
    }

    /// Build the strategy described by `[extraction]`
    pub fn from_config(config: &Config, store: Arc<dyn BlobStore>) -> Result<Self> {
        let extraction = &config.extraction;

        let remote = match (extraction.mode, &extraction.endpoint) {
            (ExtractionMode::Remote, Some(endpoint)) => Some(RemoteExtractor::new(
                endpoint.clone(),
                store.location().to_string(),
                api_key_from_env(&extraction.api_key_env),
                extraction.ocr,
                Duration::from_secs(extraction.timeout_secs),
            )?),
            (ExtractionMode::Remote, None) => {
                return Err(RodeoError::Config(
                    "extraction.endpoint is required in remote mode".to_string(),
                ));
            }
            (ExtractionMode::Local, _) => None,
        };

        let local = match extraction.mode {
            ExtractionMode::Local => Some(LocalExtractor::new(store)),
            ExtractionMode::Remote if extraction.local_fallback => Some(LocalExtractor::new(store)),
            ExtractionMode::Remote => None,
        };

        Ok(Self::new(remote, local))
    }

    fn select(&self, file_type: FileType) -> Result<&dyn TextExtractor> {
        if let Some(remote) = &self.remote {
            if file_type.is_supported() {
                return Ok(remote);
            }
        }

        match &self.local {
            Some(local) => {
                if self.remote.is_some() {
                    log::warn!(
                        "No remote extractor for .{} files, using local best-effort decoding",
                        file_type
                    );
                }
                Ok(local)
            }
            None => Err(RodeoError::InvalidInput(format!(
                "Unsupported file type: {}. Supported types are PDF, TXT and DOCX.",
                file_type
            ))),
        }
    }
}

#[async_trait]
impl TextExtractor for ExtractionStrategy {
    async fn extract(&self, staged_reference: &str, file_type: FileType) -> Result<String> {
        let extractor = self.select(file_type)?;
        log::debug!("Extracting {} with {}", staged_reference, extractor.name());
        extractor.extract(staged_reference, file_type).await
    }

    fn name(&self) -> &str {
        match (&self.remote, &self.local) {
            (Some(_), Some(_)) => "remote+local-fallback",
            (Some(_), None) => "remote",
            (None, _) => "local",
        }
    }
}
