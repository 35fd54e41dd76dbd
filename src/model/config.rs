use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration from taskwiki.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Write newly assigned UUIDs in their 8-hex short form
    #[serde(default)]
    pub short_uuids: bool,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Which task store backs the wiki
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Taskwarrior,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// JSON store file, relative to the config file's directory
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Taskwarrior executable
    #[serde(default = "default_task_command")]
    pub command: String,
    /// Taskwarrior `rc.data.location` override
    #[serde(default)]
    pub data_location: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            backend: StoreBackend::Json,
            path: default_store_path(),
            command: default_task_command(),
            data_location: None,
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("tasks.json")
}

fn default_task_command() -> String {
    "task".to_string()
}
