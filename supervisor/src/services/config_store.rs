//! JSON file configuration store
//!
//! Reads the fleet document from disk and writes it back atomically: the new
//! content goes to a sibling temp file which is then renamed over the target.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::FleetConfig;
use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::ConfigStore;

/// Fleet configuration stored as a pretty-printed JSON file
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "config.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ConfigStore for JsonConfigStore {
    async fn load(&self) -> SupervisorResult<FleetConfig> {
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            SupervisorError::persistence(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let config: FleetConfig = serde_json::from_str(&content)?;
        config.validate()?;

        debug!(path = %self.path.display(), channels = config.channels.len(), "📂 Loaded fleet configuration");
        Ok(config)
    }

    async fn save(&self, config: &FleetConfig) -> SupervisorResult<()> {
        let content = serde_json::to_string_pretty(config)?;
        let temp_path = self.temp_path();

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            SupervisorError::persistence(format!("cannot replace {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), channels = config.channels.len(), "💾 Saved fleet configuration");
        Ok(())
    }
}
