//! Wiring from `Config` to the running services.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::completion::{CompletionService, HttpCompletionClient};
use crate::config::{api_key_from_env, Config};
use crate::db::Db;
use crate::extract::ExtractionStrategy;
use crate::ingest::IngestionPipeline;
use crate::qa::QaAssembler;
use crate::registry::MetadataRegistry;
use crate::storage::{BlobStore, LocalStage};

/// Everything a shell needs to ingest documents and answer questions
pub struct App {
    pub pipeline: IngestionPipeline,
    pub assembler: QaAssembler,
    pub registry: Option<MetadataRegistry>,
    pub preview_chars: usize,
}

impl App {
    pub fn new(
        pipeline: IngestionPipeline,
        assembler: QaAssembler,
        registry: Option<MetadataRegistry>,
        preview_chars: usize,
    ) -> Self {
        Self {
            pipeline,
            assembler,
            registry,
            preview_chars,
        }
    }

    /// Build the stage, registry, extractors and completion client from config
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn BlobStore> = Arc::new(
            LocalStage::new(config.stage_dir(), Some(config.stage_path()))
                .with_context(|| format!("Failed to open stage {}", config.stage_dir().display()))?,
        );

        let registry = if config.registry.enabled {
            let db = Db::new(config.db_path());
            let registry = MetadataRegistry::open(db)
                .await
                .with_context(|| format!("Failed to open registry {}", config.db_path().display()))?;
            Some(registry)
        } else {
            log::info!("Upload history disabled");
            None
        };

        let extractor = ExtractionStrategy::from_config(config, store.clone())
            .context("Failed to configure text extraction")?;
        log::info!("Text extraction: {}", crate::extract::TextExtractor::name(&extractor));

        let completion: Arc<dyn CompletionService> = Arc::new(
            HttpCompletionClient::new(
                config.completion.endpoint.clone(),
                api_key_from_env(&config.completion.api_key_env),
                Duration::from_secs(config.completion.timeout_secs),
            )
            .context("Failed to configure completion client")?,
        );

        let pipeline = IngestionPipeline::new(
            store,
            Arc::new(extractor),
            registry.clone(),
            config.http_server.max_upload_bytes,
        );
        let assembler = QaAssembler::new(
            completion,
            config.completion.model.clone(),
            config.qa.max_context_chars,
        );

        Ok(Self::new(pipeline, assembler, registry, config.qa.preview_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_from_config_local() {
        let temp_dir = TempDir::new().unwrap();
        let toml = format!(
            r#"
[storage]
stage_dir = "{stage}"

[registry]
db_path = "{db}"

[extraction]
mode = "local"

[completion]
endpoint = "http://127.0.0.1:9/complete"
"#,
            stage = temp_dir.path().join("stage").display(),
            db = temp_dir.path().join("rodeo.db").display(),
        );
        let config = Config::from_toml_str(&toml).unwrap();

        let app = App::from_config(&config).await.unwrap();
        assert!(app.registry.is_some());
        assert_eq!(app.pipeline.extractor_name(), "local");
        assert_eq!(app.assembler.model(), "llama3.1-70b");
        assert_eq!(app.preview_chars, 3000);
        assert!(temp_dir.path().join("stage").is_dir());
    }
}
