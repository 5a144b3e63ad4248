//! Persistence of upload ids and layout between browser sessions.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const STATE_DIR: &str = ".spanlens";
const HISTORY_FILE: &str = "session.json";

/// State remembered between runs of the terminal browser.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct HistorySnapshot {
    /// Remote file id of each uploaded source, keyed by its path.
    pub uploads: BTreeMap<String, String>,
    /// Last divider position, as the percentage given to the code pane.
    pub split_percent: Option<u16>,
}

impl HistorySnapshot {
    pub fn file_id_for(&self, path: &Path) -> Option<&str> {
        self.uploads.get(&path_key(path)).map(String::as_str)
    }

    pub fn remember_upload(&mut self, path: &Path, file_id: impl Into<String>) {
        self.uploads.insert(path_key(path), file_id.into());
    }

    /// Forget every path mapped to `file_id`. Returns `true` when something was removed.
    pub fn forget_file(&mut self, file_id: &str) -> bool {
        let before = self.uploads.len();
        self.uploads.retain(|_, id| id != file_id);
        self.uploads.len() != before
    }
}

fn path_key(path: &Path) -> String {
    path.display().to_string()
}

/// Stores the snapshot under `.spanlens/session.json` in the workspace root.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    root: PathBuf,
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let path = root.join(STATE_DIR).join(HISTORY_FILE);
        Self { root, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding browser state and logs.
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    pub fn load(&self) -> Result<Option<HistorySnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read history file at {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&data)
            .with_context(|| format!("invalid history data in {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    /// Load the snapshot, treating a missing file as empty.
    pub fn load_or_default(&self) -> Result<HistorySnapshot> {
        Ok(self.load()?.unwrap_or_default())
    }

    pub fn save(&self, snapshot: &HistorySnapshot) -> Result<()> {
        let dir = self.path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create state directory {}", dir.display()))?;

        let data = serde_json::to_string_pretty(snapshot)
            .context("failed to serialize history snapshot")?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write history file to {}", self.path.display()))?;
        Ok(())
    }
}
