use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::model::config::SyncConfig;

pub const CONFIG_FILE: &str = "taskwiki.toml";

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// A loaded config plus the directory its relative paths resolve against
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SyncConfig,
    pub base_dir: PathBuf,
}

/// Walk up from `start` looking for `taskwiki.toml`
pub fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Read and parse a config file
pub fn read_config(path: &Path) -> Result<SyncConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load the config for a wiki file: an explicit path wins, otherwise the
/// nearest `taskwiki.toml` above the wiki, otherwise defaults rooted at the
/// wiki's directory.
pub fn load_config(explicit: Option<&Path>, wiki_path: &Path) -> Result<LoadedConfig, ConfigError> {
    let wiki_dir = match wiki_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => discover_config(&wiki_dir),
    };

    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            let config = read_config(&path)?;
            let base_dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            Ok(LoadedConfig { config, base_dir })
        }
        None => Ok(LoadedConfig {
            config: SyncConfig::default(),
            base_dir: wiki_dir,
        }),
    }
}
