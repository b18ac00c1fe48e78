//! Probe result persistence.
//!
//! Abstract interface for keeping the last good probe result across sessions.

use std::path::PathBuf;

use async_trait::async_trait;
use reflection_bridge::ProbeResult;

/// Error type for probe store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait ProbeStore: Send + Sync {
    /// Load the saved result; `Ok(None)` when nothing was saved yet.
    async fn load(&self) -> Result<Option<ProbeResult>, StoreError>;

    /// Replace the saved result.
    async fn save(&self, result: &ProbeResult) -> Result<(), StoreError>;
}

/// Local filesystem implementation, one pretty-printed JSON file.
pub struct JsonFileProbeStore {
    path: PathBuf,
}

impl JsonFileProbeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ProbeStore for JsonFileProbeStore {
    async fn load(&self) -> Result<Option<ProbeResult>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, result: &ProbeResult) -> Result<(), StoreError> {
        // Create parent directories if needed
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Replace atomically via a sibling temp file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(result)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
