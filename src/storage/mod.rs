//! Blob store for uploaded documents.
//!
//! Objects are addressed by the store's location plus a filename (the
//! staged reference). `put` replaces an existing object under the same
//! filename and never touches any other.

pub mod local;

use async_trait::async_trait;
use crate::error::Result;

pub use local::LocalStage;

/// Durable object storage the ingestion pipeline writes into
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` under `filename`, replacing any previous object with that name.
    ///
    /// Returns the staged reference (the filename as the store records it).
    async fn put(&self, data: &[u8], filename: &str) -> Result<String>;

    /// Read back a stored object
    async fn fetch(&self, filename: &str) -> Result<Vec<u8>>;

    /// Check if an object exists
    async fn exists(&self, filename: &str) -> Result<bool>;

    /// Location string that the extraction service resolves filenames against
    fn location(&self) -> &str;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
