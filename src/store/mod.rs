pub mod json_file;
pub mod lock;
pub mod memory;
pub mod taskwarrior;

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::model::config::{StoreBackend, StoreConfig};
use crate::model::task::{StoreTask, TaskUuid};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use taskwarrior::TaskwarriorStore;

/// Error type for task store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid task data: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("could not open lock file {path}: {source}")]
    LockOpen {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not lock {path}: another sync is writing")]
    LockBusy { path: PathBuf },
    #[error("due {due} does not exist in the local time zone")]
    UnrepresentableDue { due: String },
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("could not run `{command}`: {source}")]
    SpawnError {
        command: String,
        source: std::io::Error,
    },
    #[error("short uuid {prefix} matches {count} tasks")]
    AmbiguousUuid { prefix: String, count: usize },
    #[error("task {0} vanished from the store after saving")]
    MissingAfterSave(Uuid),
}

/// The external task store.
///
/// The store is the only source of truth for task field values; callers
/// never invent task data, they only push edits through `save`.
pub trait TaskStore {
    /// Look up one task by full or short UUID
    fn get_by_uuid(&self, uuid: &TaskUuid) -> Result<Option<StoreTask>, StoreError>;

    /// Fetch many tasks in a single round-trip. Unknown UUIDs are skipped.
    fn filter_by_uuids(&self, uuids: &[Uuid]) -> Result<Vec<StoreTask>, StoreError>;

    /// Persist a task, assigning a UUID if it has none. Returns the stored record.
    fn save(&mut self, task: StoreTask) -> Result<StoreTask, StoreError>;
}

/// Resolve a reference against a set of tasks, refusing ambiguous short forms
pub(crate) fn pick_unique<'a>(
    tasks: impl IntoIterator<Item = &'a StoreTask>,
    uuid: &TaskUuid,
) -> Result<Option<StoreTask>, StoreError> {
    let mut matches = tasks
        .into_iter()
        .filter(|t| t.uuid.as_ref().is_some_and(|u| uuid.matches(u)));
    let first = matches.next();
    let rest = matches.count();
    if rest > 0 {
        return Err(StoreError::AmbiguousUuid {
            prefix: uuid.to_string(),
            count: rest + 1,
        });
    }
    Ok(first.cloned())
}

/// Open the store a config describes. Relative paths resolve against `base_dir`.
pub fn open_store(config: &StoreConfig, base_dir: &Path) -> Result<Box<dyn TaskStore>, StoreError> {
    match config.backend {
        StoreBackend::Json => {
            let store = JsonFileStore::open(base_dir.join(&config.path))?;
            Ok(Box::new(store))
        }
        StoreBackend::Taskwarrior => {
            let store = TaskwarriorStore::new(
                config.command.clone(),
                config.data_location.as_ref().map(|p| base_dir.join(p)),
            );
            Ok(Box::new(store))
        }
    }
}

impl<S: TaskStore + ?Sized> TaskStore for Box<S> {
    fn get_by_uuid(&self, uuid: &TaskUuid) -> Result<Option<StoreTask>, StoreError> {
        (**self).get_by_uuid(uuid)
    }

    fn filter_by_uuids(&self, uuids: &[Uuid]) -> Result<Vec<StoreTask>, StoreError> {
        (**self).filter_by_uuids(uuids)
    }

    fn save(&mut self, task: StoreTask) -> Result<StoreTask, StoreError> {
        (**self).save(task)
    }
}
