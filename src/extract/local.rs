use async_trait::async_trait;
use std::sync::Arc;

use super::TextExtractor;
use crate::error::{Result, RodeoError};
use crate::ingest::FileType;
use crate::storage::BlobStore;

/// Best-effort decoder that reads the staged bytes directly
///
/// Plain text decodes cleanly. PDF and DOCX are compressed containers, so
/// what comes out of them is mostly noise with fragments of readable text.
pub struct LocalExtractor {
    store: Arc<dyn BlobStore>,
}

impl LocalExtractor {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TextExtractor for LocalExtractor {
    async fn extract(&self, staged_reference: &str, file_type: FileType) -> Result<String> {
        let bytes = self
            .store
            .fetch(staged_reference)
            .await
            .map_err(|e| RodeoError::Extraction {
                message: format!("could not read {} from the stage: {}", staged_reference, e),
                transient: false,
            })?;
        let text = decode_bytes(&bytes, file_type);
        log::debug!(
            "Decoded {} bytes of {} locally into {} chars",
            bytes.len(),
            staged_reference,
            text.chars().count()
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Decode raw document bytes into text.
///
/// `txt` is decoded as UTF-8 (invalid sequences replaced). Everything else is
/// decoded the same way and then stripped of control characters other than
/// newlines, carriage returns and tabs.
pub fn decode_bytes(bytes: &[u8], file_type: FileType) -> String {
    let lossy = String::from_utf8_lossy(bytes);
    let decoded: &str = &lossy;

    match file_type {
        FileType::Txt => decoded
            .strip_prefix('\u{feff}')
            .unwrap_or(decoded)
            .to_string(),
        FileType::Pdf | FileType::Docx | FileType::Unknown => decoded
            .chars()
            .filter(|c| is_printable(*c))
            .collect(),
    }
}

fn is_printable(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\t') || !c.is_control()
}
