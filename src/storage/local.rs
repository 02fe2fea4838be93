use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;

use super::BlobStore;
use crate::error::{Result, RodeoError};

/// Stage directory on the local filesystem
pub struct LocalStage {
    stage_dir: PathBuf,
    location: String,
}

impl LocalStage {
    /// Create the stage, making the directory if needed.
    ///
    /// `location` is what the extraction service is told the stage is called;
    /// pass `None` to use the directory path.
    pub fn new(stage_dir: impl Into<PathBuf>, location: Option<String>) -> Result<Self> {
        let stage_dir = stage_dir.into();
        std::fs::create_dir_all(&stage_dir)?;
        let location = location.unwrap_or_else(|| stage_dir.display().to_string());
        Ok(Self { stage_dir, location })
    }

    /// Resolve a filename inside the stage, refusing anything that could escape it.
    fn object_path(&self, filename: &str) -> Result<PathBuf> {
        let valid = !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains('/')
            && !filename.contains('\\');
        if !valid {
            return Err(RodeoError::InvalidInput(format!(
                "Invalid staged filename: {:?}",
                filename
            )));
        }
        Ok(self.stage_dir.join(filename))
    }
}

#[async_trait]
impl BlobStore for LocalStage {
    async fn put(&self, data: &[u8], filename: &str) -> Result<String> {
        let target = self.object_path(filename)?;
        let stage_dir = self.stage_dir.clone();
        let size = data.len();
        let data = data.to_vec();

        // Temp file in the same directory, renamed over the target: readers
        // never observe a partial object.
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&stage_dir)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| RodeoError::StorageWrite(format!("stage write task failed: {}", e)))?
        .map_err(|e| RodeoError::StorageWrite(format!("{}: {}", filename, e)))?;

        log::debug!("Staged {} ({} bytes) in {}", filename, size, self.location);
        Ok(filename.to_string())
    }

    async fn fetch(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.object_path(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RodeoError::NotFound(format!("staged document {}", filename)))
            }
            Err(e) => Err(RodeoError::Io(e)),
        }
    }

    async fn exists(&self, filename: &str) -> Result<bool> {
        let path = self.object_path(filename)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn name(&self) -> &str {
        "local-stage"
    }
}
