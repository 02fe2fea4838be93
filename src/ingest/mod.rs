pub mod document;
pub mod metadata;

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{Result, RodeoError};
use crate::extract::TextExtractor;
use crate::registry::MetadataRegistry;
use crate::storage::BlobStore;

pub use document::{DocumentStatus, ExtractedDocument, FileType, UploadedDocument, SUPPORTED_TYPES};
pub use metadata::{compute_content_hash, sanitize_filename, staged_reference};

/// Attempts at drawing a staged reference not already in the store
const MAX_REFERENCE_ATTEMPTS: usize = 5;

/// What happened to the registry row for an upload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "lowercase")]
pub enum MetadataOutcome {
    Recorded,
    /// No registry configured
    Disabled,
    /// Insert failed; the blob is still stored
    Failed(String),
}

/// Result of a successful ingest
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub document: UploadedDocument,
    pub metadata: MetadataOutcome,
}

/// Upload → stage → (record) → extract
pub struct IngestionPipeline {
    store: Arc<dyn BlobStore>,
    extractor: Arc<dyn TextExtractor>,
    registry: Option<MetadataRegistry>,
    max_upload_bytes: u64,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn BlobStore>,
        extractor: Arc<dyn TextExtractor>,
        registry: Option<MetadataRegistry>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            store,
            extractor,
            registry,
            max_upload_bytes,
        }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    pub fn extractor_name(&self) -> &str {
        self.extractor.name()
    }

    /// Stage an uploaded file and record it in the registry.
    ///
    /// A registry failure does not undo the stage write; it is reported in
    /// the receipt instead.
    pub async fn ingest(&self, file_bytes: &[u8], original_name: &str, size_bytes: u64) -> Result<IngestReceipt> {
        if size_bytes != file_bytes.len() as u64 {
            return Err(RodeoError::InvalidInput(format!(
                "Upload size mismatch: declared {} bytes, received {}",
                size_bytes,
                file_bytes.len()
            )));
        }
        if size_bytes > self.max_upload_bytes {
            return Err(RodeoError::InvalidInput(format!(
                "File is too large ({} bytes, limit {} bytes)",
                size_bytes, self.max_upload_bytes
            )));
        }

        let uploaded_at = Utc::now();
        let reference = self.fresh_reference(original_name, uploaded_at).await?;

        let staged = self.store.put(file_bytes, &reference).await.map_err(|e| match e {
            RodeoError::StorageWrite(_) => e,
            other => RodeoError::StorageWrite(other.to_string()),
        })?;

        let document = UploadedDocument {
            original_name: original_name.to_string(),
            staged_reference: staged,
            file_type: FileType::from_filename(original_name),
            size_bytes,
            content_sha256: compute_content_hash(file_bytes),
            status: DocumentStatus::Active,
            uploaded_at,
        };

        log::info!(
            "Staged {} as {} ({} bytes, {})",
            document.original_name,
            document.staged_reference,
            document.size_bytes,
            document.file_type
        );

        let metadata = match &self.registry {
            None => MetadataOutcome::Disabled,
            Some(registry) => match registry.record(&document).await {
                Ok(()) => MetadataOutcome::Recorded,
                Err(e) => {
                    log::warn!(
                        "Could not record {} in upload history: {}",
                        document.staged_reference,
                        e
                    );
                    MetadataOutcome::Failed(e.to_string())
                }
            },
        };

        Ok(IngestReceipt { document, metadata })
    }

    /// Pull text out of a staged document.
    pub async fn extract(&self, staged_reference: &str, file_type: FileType) -> Result<ExtractedDocument> {
        let start = std::time::Instant::now();
        let text = self.extractor.extract(staged_reference, file_type).await?;
        let extracted = ExtractedDocument::new(staged_reference, text);

        if extracted.is_empty() {
            log::warn!("No text extracted from {}", staged_reference);
        } else {
            log::info!(
                "Extracted {} characters from {} in {:?}",
                extracted.char_count(),
                staged_reference,
                start.elapsed()
            );
        }

        Ok(extracted)
    }

    /// Ingest then extract, the single "Upload & Parse" action.
    pub async fn ingest_and_extract(
        &self,
        file_bytes: &[u8],
        original_name: &str,
        size_bytes: u64,
    ) -> Result<(IngestReceipt, ExtractedDocument)> {
        let receipt = self.ingest(file_bytes, original_name, size_bytes).await?;
        let extracted = self
            .extract(&receipt.document.staged_reference, receipt.document.file_type)
            .await?;
        Ok((receipt, extracted))
    }

    async fn fresh_reference(&self, original_name: &str, now: chrono::DateTime<Utc>) -> Result<String> {
        for _ in 0..MAX_REFERENCE_ATTEMPTS {
            let candidate = staged_reference(original_name, now);
            let taken = self.store.exists(&candidate).await.map_err(|e| match e {
                RodeoError::InvalidInput(_) | RodeoError::StorageWrite(_) => e,
                other => RodeoError::StorageWrite(format!("checking {}: {}", candidate, other)),
            })?;
            if !taken {
                return Ok(candidate);
            }
            log::debug!("Staged reference {} already taken, drawing another", candidate);
        }
        Err(RodeoError::StorageWrite(format!(
            "could not find a free staged name for {}",
            original_name
        )))
    }
}
