//! Filesystem-backed generation store.
//!
//! Generations and saves live side by side in one directory, named
//! `<prefix><%Y-%m-%d_%H-%M-%S>.<ext>`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::infrastructure::ports::{ClockPort, GenerationStore, PersistenceError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Generation store writing plain files under a root directory.
pub struct FileGenerationStore {
    root: PathBuf,
    clock: Arc<dyn ClockPort>,
}

impl FileGenerationStore {
    pub fn new(root: impl Into<PathBuf>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            root: root.into(),
            clock,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_name(&self, prefix: &str, extension: &str) -> String {
        format!(
            "{}{}.{}",
            prefix,
            self.clock.now().format(TIMESTAMP_FORMAT),
            extension
        )
    }

    async fn write(&self, file_name: &str, content: &str) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| PersistenceError::io("create_dir", self.root.display(), e))?;

        let path = self.root.join(file_name);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| PersistenceError::io("write", path.display(), e))?;

        tracing::info!(file = %file_name, "Saved generation");
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<String, PersistenceError> {
        let path = self.root.join(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PersistenceError::NotFound(name.to_string()))
            }
            Err(e) => Err(PersistenceError::io("read", path.display(), e)),
        }
    }
}

#[async_trait]
impl GenerationStore for FileGenerationStore {
    async fn save_text(&self, prefix: &str, content: &str) -> Result<String, PersistenceError> {
        let file_name = self.file_name(prefix, "md");
        self.write(&file_name, content).await?;
        Ok(file_name)
    }

    async fn save_json(
        &self,
        prefix: &str,
        value: &serde_json::Value,
    ) -> Result<String, PersistenceError> {
        let content = serde_json::to_string_pretty(value)
            .map_err(PersistenceError::serialization)?;
        let file_name = self.file_name(prefix, "json");
        self.write(&file_name, &content).await?;
        Ok(file_name)
    }

    async fn read_text(&self, name: &str) -> Result<String, PersistenceError> {
        self.read(name).await
    }

    async fn read_json(&self, name: &str) -> Result<serde_json::Value, PersistenceError> {
        let content = self.read(name).await?;
        serde_json::from_str(&content).map_err(PersistenceError::serialization)
    }
}
