pub mod http;

use async_trait::async_trait;
use crate::error::Result;

pub use http::HttpCompletionClient;

/// Trait for LLM text completion
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Generate text for `prompt` with the given model.
    ///
    /// `Ok(None)` means the service answered but produced nothing.
    async fn complete(&self, model: &str, prompt: &str) -> Result<Option<String>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
