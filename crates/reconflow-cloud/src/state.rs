//! Handle store
//!
//! Manages the `.reconflow/state.json` file. The only thing persisted per
//! resource is its canonical identity string (the handle) and the resource
//! type it belongs to; everything else is re-read from the backend.

use crate::error::{ReconcileError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".reconflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";

/// All handles known to a project, indexed by resource address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Handles indexed by address (e.g. "cosmos-linked")
    pub resources: BTreeMap<String, HandleEntry>,
}

impl Default for HandleState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl HandleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or replace a handle
    pub fn set(&mut self, address: impl Into<String>, entry: HandleEntry) {
        self.resources.insert(address.into(), entry);
        self.updated_at = Utc::now();
    }

    /// Forget a handle
    pub fn remove(&mut self, address: &str) -> Option<HandleEntry> {
        let result = self.resources.remove(address);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    pub fn get(&self, address: &str) -> Option<&HandleEntry> {
        self.resources.get(address)
    }
}

/// Persisted handle of one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleEntry {
    /// Resource type (e.g. "iothub_endpoint_storage_container")
    pub resource_type: String,

    /// Canonical identity string
    pub handle: String,

    /// When the handle was last written
    pub updated_at: DateTime<Utc>,
}

impl HandleEntry {
    pub fn new(resource_type: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            handle: handle.into(),
            updated_at: Utc::now(),
        }
    }
}

/// Reads and writes the handle file
pub struct HandleStore {
    /// Project root directory
    project_root: PathBuf,
}

impl HandleStore {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    /// Path of the state file
    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the current state
    pub async fn load(&self) -> Result<HandleState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(HandleState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: HandleState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(ReconcileError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} handles", state.resources.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    pub async fn save(&self, state: &HandleState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} handles", state.resources.len());
        Ok(())
    }
}
