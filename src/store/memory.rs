use std::cell::Cell;

use indexmap::IndexMap;
use tracing::debug;
use uuid::Uuid;

use crate::model::task::{StoreTask, TaskUuid};
use crate::store::{StoreError, TaskStore, pick_unique};

/// Round-trip counters, so callers can see how chatty a sync was
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get: usize,
    pub filter: usize,
    pub save: usize,
}

/// An in-process task store keyed by UUID, in insertion order
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: IndexMap<Uuid, StoreTask>,
    calls: Cell<CallCounts>,
    saved: Vec<Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a task directly, bypassing the call counters. Returns its UUID.
    pub fn insert(&mut self, mut task: StoreTask) -> Uuid {
        let uuid = *task.uuid.get_or_insert_with(Uuid::new_v4);
        self.tasks.insert(uuid, task);
        uuid
    }

    pub fn get(&self, uuid: &Uuid) -> Option<&StoreTask> {
        self.tasks.get(uuid)
    }

    pub fn get_mut(&mut self, uuid: &Uuid) -> Option<&mut StoreTask> {
        self.tasks.get_mut(uuid)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &StoreTask> {
        self.tasks.values()
    }

    pub fn calls(&self) -> CallCounts {
        self.calls.get()
    }

    /// UUIDs in the order `save` persisted them
    pub fn save_log(&self) -> &[Uuid] {
        &self.saved
    }

    fn bump(&self, f: impl FnOnce(&mut CallCounts)) {
        let mut counts = self.calls.get();
        f(&mut counts);
        self.calls.set(counts);
    }
}

impl TaskStore for MemoryStore {
    fn get_by_uuid(&self, uuid: &TaskUuid) -> Result<Option<StoreTask>, StoreError> {
        self.bump(|c| c.get += 1);
        if let Some(full) = uuid.full() {
            return Ok(self.tasks.get(&full).cloned());
        }
        pick_unique(self.tasks.values(), uuid)
    }

    fn filter_by_uuids(&self, uuids: &[Uuid]) -> Result<Vec<StoreTask>, StoreError> {
        self.bump(|c| c.filter += 1);
        Ok(uuids
            .iter()
            .filter_map(|u| self.tasks.get(u).cloned())
            .collect())
    }

    fn save(&mut self, mut task: StoreTask) -> Result<StoreTask, StoreError> {
        self.bump(|c| c.save += 1);
        let uuid = *task.uuid.get_or_insert_with(Uuid::new_v4);
        debug!(%uuid, description = %task.description, "memory store save");
        self.tasks.insert(uuid, task.clone());
        self.saved.push(uuid);
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_assigns_uuid() {
        let mut store = MemoryStore::new();
        let saved = store.save(StoreTask::new("Write spec")).unwrap();
        let uuid = saved.uuid.unwrap();
        assert_eq!(store.get(&uuid).unwrap().description, "Write spec");
        assert_eq!(store.save_log(), &[uuid]);
        assert_eq!(store.calls().save, 1);
    }

    #[test]
    fn test_save_keeps_existing_uuid() {
        let mut store = MemoryStore::new();
        let uuid = store.insert(StoreTask::new("old"));
        let mut edited = store.get(&uuid).unwrap().clone();
        edited.description = "new".to_string();
        let saved = store.save(edited).unwrap();
        assert_eq!(saved.uuid, Some(uuid));
        assert_eq!(store.tasks().count(), 1);
        assert_eq!(store.get(&uuid).unwrap().description, "new");
    }

    #[test]
    fn test_lookup_by_short_uuid() {
        let mut store = MemoryStore::new();
        let uuid = store.insert(StoreTask::new("A"));
        let found = store.get_by_uuid(&TaskUuid::short(&uuid)).unwrap().unwrap();
        assert_eq!(found.uuid, Some(uuid));
        assert_eq!(store.calls().get, 1);
    }

    #[test]
    fn test_filter_skips_unknown() {
        let mut store = MemoryStore::new();
        let a = store.insert(StoreTask::new("A"));
        let found = store.filter_by_uuids(&[a, Uuid::new_v4()]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(store.calls().filter, 1);
    }
}
