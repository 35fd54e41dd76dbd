use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::io::wiki_file::atomic_write;
use crate::model::task::{StoreTask, TaskUuid};
use crate::store::lock::{DEFAULT_WAIT, StoreLock};
use crate::store::{StoreError, TaskStore, pick_unique};

/// A task store persisted as a pretty-printed JSON array in one file.
///
/// Reads are served from the snapshot taken at `open`. Each save re-reads
/// the file under an advisory lock, applies the one task, and rewrites the
/// file atomically, so concurrent runs only ever lose the race, not data.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    tasks: IndexMap<Uuid, StoreTask>,
}

impl JsonFileStore {
    /// Open the store. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tasks = read_tasks(&path)?;
        info!(path = %path.display(), count = tasks.len(), "opened json store");
        Ok(JsonFileStore { path, tasks })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tasks(&self) -> impl Iterator<Item = &StoreTask> {
        self.tasks.values()
    }
}

fn read_tasks(path: &Path) -> Result<IndexMap<Uuid, StoreTask>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(IndexMap::new()),
        Err(e) => {
            return Err(StoreError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    if text.trim().is_empty() {
        return Ok(IndexMap::new());
    }

    let list: Vec<StoreTask> = serde_json::from_str(&text)?;
    let mut tasks = IndexMap::with_capacity(list.len());
    for mut task in list {
        // hand-added records get an identity here and keep it on the next write
        let uuid = match task.uuid {
            Some(uuid) => uuid,
            None => {
                let uuid = *task.uuid.insert(Uuid::new_v4());
                warn!(
                    %uuid,
                    description = %task.description,
                    path = %path.display(),
                    "assigned uuid to stored task"
                );
                uuid
            }
        };
        tasks.insert(uuid, task);
    }
    Ok(tasks)
}

fn write_tasks(path: &Path, tasks: &IndexMap<Uuid, StoreTask>) -> Result<(), StoreError> {
    let list: Vec<&StoreTask> = tasks.values().collect();
    let mut content = serde_json::to_string_pretty(&list)?;
    content.push('\n');
    atomic_write(path, content.as_bytes()).map_err(|e| StoreError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

impl TaskStore for JsonFileStore {
    fn get_by_uuid(&self, uuid: &TaskUuid) -> Result<Option<StoreTask>, StoreError> {
        if let Some(full) = uuid.full() {
            return Ok(self.tasks.get(&full).cloned());
        }
        pick_unique(self.tasks.values(), uuid)
    }

    fn filter_by_uuids(&self, uuids: &[Uuid]) -> Result<Vec<StoreTask>, StoreError> {
        Ok(uuids
            .iter()
            .filter_map(|u| self.tasks.get(u).cloned())
            .collect())
    }

    fn save(&mut self, mut task: StoreTask) -> Result<StoreTask, StoreError> {
        let uuid = *task.uuid.get_or_insert_with(Uuid::new_v4);

        let _lock = StoreLock::hold(&self.path, DEFAULT_WAIT)?;
        let mut on_disk = read_tasks(&self.path)?;
        on_disk.insert(uuid, task.clone());
        write_tasks(&self.path, &on_disk)?;
        self.tasks = on_disk;

        debug!(%uuid, path = %self.path.display(), "json store save");
        Ok(task)
    }
}
