//! Shared fakes for unit tests.

use async_trait::async_trait;
use axum::Router;
use std::sync::Mutex;

use crate::completion::CompletionService;
use crate::error::{Result, RodeoError};
use crate::extract::TextExtractor;
use crate::ingest::FileType;
use crate::storage::BlobStore;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve_router(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

enum Script {
    Answer(String),
    Silent,
    Fail,
}

/// Completion service that replies from a script and records every prompt
pub struct ScriptedCompletion {
    script: Script,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedCompletion {
    pub fn answering(text: &str) -> Self {
        Self::with(Script::Answer(text.to_string()))
    }

    pub fn silent() -> Self {
        Self::with(Script::Silent)
    }

    pub fn failing() -> Self {
        Self::with(Script::Fail)
    }

    fn with(script: Script) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// `(model, prompt)` pairs received so far
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, model: &str, prompt: &str) -> Result<Option<String>> {
        self.prompts
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.to_string()));
        match &self.script {
            Script::Answer(text) => Ok(Some(text.clone())),
            Script::Silent => Ok(None),
            Script::Fail => Err(RodeoError::Completion {
                message: "scripted failure".to_string(),
                transient: false,
            }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Blob store whose writes always fail
pub struct FailingStore;

#[async_trait]
impl BlobStore for FailingStore {
    async fn put(&self, _data: &[u8], filename: &str) -> Result<String> {
        Err(RodeoError::StorageWrite(format!("{}: permission denied", filename)))
    }

    async fn fetch(&self, filename: &str) -> Result<Vec<u8>> {
        Err(RodeoError::NotFound(filename.to_string()))
    }

    async fn exists(&self, _filename: &str) -> Result<bool> {
        Ok(false)
    }

    fn location(&self) -> &str {
        "@failing"
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Blob store whose stage cannot even be listed
pub struct UnreadableStore;

#[async_trait]
impl BlobStore for UnreadableStore {
    async fn put(&self, _data: &[u8], filename: &str) -> Result<String> {
        Ok(filename.to_string())
    }

    async fn fetch(&self, filename: &str) -> Result<Vec<u8>> {
        Err(RodeoError::NotFound(filename.to_string()))
    }

    async fn exists(&self, _filename: &str) -> Result<bool> {
        Err(RodeoError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "stage not readable",
        )))
    }

    fn location(&self) -> &str {
        "@unreadable"
    }

    fn name(&self) -> &str {
        "unreadable"
    }
}

/// Extractor that always reports a parsing-service error
pub struct FailingExtractor;

#[async_trait]
impl TextExtractor for FailingExtractor {
    async fn extract(&self, staged_reference: &str, _file_type: FileType) -> Result<String> {
        Err(RodeoError::Extraction {
            message: format!("parsing service rejected {}", staged_reference),
            transient: false,
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}
