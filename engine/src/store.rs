use crate::traits::StateStore;
use async_trait::async_trait;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tabsense_protocol::PersistedState;
use tokio::sync::Mutex;

/// JSON-file implementation of the durable state slot.
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl StateStore for JsonStateStore {
    async fn load(&self) -> anyhow::Result<Option<PersistedState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = tokio::fs::read(&self.path).await?;
        let state: PersistedState = serde_json::from_slice(&content)?;

        if state.version != PersistedState::CURRENT_VERSION {
            warn!(
                "persisted state version mismatch: {} vs {}. Starting fresh.",
                state.version,
                PersistedState::CURRENT_VERSION
            );
            return Ok(None);
        }

        debug!("loaded {} persisted clusters", state.clusters.len());
        Ok(Some(state))
    }

    async fn save(&self, state: &PersistedState) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

/// In-memory state slot, handy for tests and embedded hosts without durable
/// storage.
#[derive(Default)]
pub struct MemoryStateStore {
    slot: Mutex<Option<PersistedState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> anyhow::Result<Option<PersistedState>> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, state: &PersistedState) -> anyhow::Result<()> {
        *self.slot.lock().await = Some(state.clone());
        Ok(())
    }
}
