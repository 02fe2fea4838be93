use thiserror::Error;

/// Main error type for Document Rodeo
#[derive(Error, Debug)]
pub enum RodeoError {
    /// The blob store rejected or failed the write
    #[error("Storage write error: {0}")]
    StorageWrite(String),

    /// The metadata registry insert failed
    #[error("Metadata write error: {0}")]
    MetadataWrite(String),

    /// The text extraction service was unreachable or errored
    #[error("Extraction error: {message}")]
    Extraction { message: String, transient: bool },

    /// The completion service was unreachable or errored
    #[error("Completion error: {message}")]
    Completion { message: String, transient: bool },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Staged document or registry row not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl RodeoError {
    /// Build an extraction failure from a transport error.
    pub fn extraction(err: reqwest::Error) -> Self {
        RodeoError::Extraction {
            transient: is_transient_transport(&err),
            message: format!("Network error: {}", err),
        }
    }

    /// Build a completion failure from a transport error.
    pub fn completion(err: reqwest::Error) -> Self {
        RodeoError::Completion {
            transient: is_transient_transport(&err),
            message: format!("Network error: {}", err),
        }
    }

    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RodeoError::Extraction { transient, .. } | RodeoError::Completion { transient, .. } => {
                *transient
            }
            _ => false,
        }
    }

    /// Stable tag for the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            RodeoError::StorageWrite(_) => "storage_write",
            RodeoError::MetadataWrite(_) => "metadata_write",
            RodeoError::Extraction { .. } => "extraction",
            RodeoError::Completion { .. } => "completion",
            RodeoError::InvalidInput(_) => "invalid_input",
            RodeoError::Database(_) => "database",
            RodeoError::Io(_) => "io",
            RodeoError::Config(_) => "config",
            RodeoError::NotFound(_) => "not_found",
        }
    }

    /// Human-readable message shown to the person using the shell.
    pub fn user_message(&self) -> String {
        match self {
            RodeoError::StorageWrite(_) => {
                "Upload failed: the document could not be stored.".to_string()
            }
            RodeoError::MetadataWrite(_) => {
                "The document was stored, but it could not be added to the upload history."
                    .to_string()
            }
            RodeoError::Extraction { transient: true, .. } => {
                "Parse failed: the document parsing service did not respond in time. Try again."
                    .to_string()
            }
            RodeoError::Extraction { .. } => {
                "Parse failed: the document parsing service returned an error.".to_string()
            }
            RodeoError::Completion { transient: true, .. } => {
                "No answer: the language model did not respond in time. Try again.".to_string()
            }
            RodeoError::Completion { .. } => {
                "No answer: the language model service returned an error.".to_string()
            }
            RodeoError::InvalidInput(msg) => msg.clone(),
            RodeoError::NotFound(what) => format!("Not found: {}", what),
            RodeoError::Database(_) | RodeoError::Io(_) | RodeoError::Config(_) => {
                "Internal error. Check the server logs for details.".to_string()
            }
        }
    }
}

fn is_transient_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Statuses worth retrying later: rate limiting and gateway trouble.
pub(crate) fn is_transient_status(status: reqwest::StatusCode) -> bool {
    matches!(
        status,
        reqwest::StatusCode::TOO_MANY_REQUESTS
            | reqwest::StatusCode::BAD_GATEWAY
            | reqwest::StatusCode::SERVICE_UNAVAILABLE
            | reqwest::StatusCode::GATEWAY_TIMEOUT
    )
}

/// Convenient Result type using RodeoError
pub type Result<T> = std::result::Result<T, RodeoError>;
