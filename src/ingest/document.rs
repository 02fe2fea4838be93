use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RodeoError;

/// Document type derived from the upload's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Txt,
    Docx,
    /// Anything else; decoded as raw text on a best-effort basis.
    Unknown,
}

/// Types the upload form accepts.
pub const SUPPORTED_TYPES: [FileType; 3] = [FileType::Pdf, FileType::Txt, FileType::Docx];

impl FileType {
    /// Classify a filename by its extension (case-insensitive).
    pub fn from_filename(name: &str) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => FileType::Pdf,
            "txt" => FileType::Txt,
            "docx" => FileType::Docx,
            _ => FileType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Txt => "txt",
            FileType::Docx => "docx",
            FileType::Unknown => "unknown",
        }
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_TYPES.contains(self)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = RodeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(FileType::Pdf),
            "txt" => Ok(FileType::Txt),
            "docx" => Ok(FileType::Docx),
            "unknown" => Ok(FileType::Unknown),
            other => Err(RodeoError::InvalidInput(format!("Unknown file type: {}", other))),
        }
    }
}

/// Visibility of an upload in the history listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Active,
    Removed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Active => "active",
            DocumentStatus::Removed => "removed",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = RodeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(DocumentStatus::Active),
            "removed" => Ok(DocumentStatus::Removed),
            other => Err(RodeoError::InvalidInput(format!("Unknown document status: {}", other))),
        }
    }
}

/// One user-submitted file after it has been written to the stage.
///
/// Everything except `status` is fixed at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub original_name: String,
    pub staged_reference: String,
    pub file_type: FileType,
    pub size_bytes: u64,
    pub content_sha256: String,
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
}

/// Text pulled out of a staged document. Held only for the current request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedDocument {
    /// Staged reference the text came from
    pub source: String,
    /// Never absent; empty when nothing could be extracted
    pub text: String,
}

impl ExtractedDocument {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in characters, not bytes.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// First `limit` characters, for showing the user what was extracted.
    pub fn preview(&self, limit: usize) -> &str {
        crate::qa::bound_context(&self.text, limit).0
    }
}
