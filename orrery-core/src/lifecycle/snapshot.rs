//! Serializable view of the lifecycle, written to disk so a later process
//! can inspect how the previous one ended.

use std::path::Path;

use serde::{Deserialize, Serialize};

use orrery_types::LifecycleState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleSnapshot {
    pub state: LifecycleState,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub failure: Option<String>,
}

impl LifecycleSnapshot {
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Returns `None` when the file is missing or unreadable.
    pub fn load(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::warn!(target: "lifecycle", "ignoring malformed snapshot {}: {}", path.display(), e);
                None
            }
        }
    }
}
