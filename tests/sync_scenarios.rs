//! End-to-end cache scenarios against the in-memory and JSON file stores.

use std::rc::Rc;

use pretty_assertions::assert_eq;
use taskwiki_sync::buffer::{LineBuffer, VecBuffer};
use taskwiki_sync::model::task::{Priority, StoreTask, TaskStatus, TaskUuid};
use taskwiki_sync::store::{JsonFileStore, MemoryStore};
use taskwiki_sync::sync::{SyncCache, SyncError};

fn cache(store: MemoryStore, text: &str) -> SyncCache<MemoryStore, VecBuffer> {
    SyncCache::new(store, VecBuffer::from_text(text))
}

// ============================================================================
// New task flow
// ============================================================================

#[test]
fn new_task_gets_uuid_written_back() {
    let mut cache = cache(MemoryStore::new(), "* [ ] Write spec\n");

    let projection = cache.get_by_line(0).unwrap().unwrap();
    assert!(projection.is_new());
    assert_eq!(projection.line.text, "Write spec");
    assert_eq!(projection.line.priority, None);
    assert_eq!(projection.line.due, None);
    assert_eq!(projection.line.uuid, None);

    assert_eq!(cache.save_tasks().unwrap(), 1);
    cache.update_buffer().unwrap();

    let uuid = cache.store().tasks().next().unwrap().uuid.unwrap();
    assert_eq!(
        cache.buffer().read_line(0).unwrap(),
        format!("* [ ] Write spec  #{}", uuid)
    );
}

#[test]
fn sync_buffer_creates_then_settles() {
    let mut cache = cache(
        MemoryStore::new(),
        "Project: Home\n* [ ] Buy milk !!\nnotes\n* [X] Call plumber\n",
    );

    let first = cache.sync_buffer().unwrap();
    assert_eq!(first.tasks, 2);
    assert_eq!(first.saved, 2);
    assert_eq!(first.refreshed, 2);

    let milk = cache
        .store()
        .tasks()
        .find(|t| t.description == "Buy milk")
        .unwrap();
    assert_eq!(milk.project.as_deref(), Some("Home"));
    assert_eq!(milk.priority, Some(Priority::Medium));
    let plumber = cache
        .store()
        .tasks()
        .find(|t| t.description == "Call plumber")
        .unwrap();
    assert_eq!(plumber.status, TaskStatus::Completed);

    // a second sync over the written-back buffer changes nothing
    let text = cache.buffer().to_text();
    let second = cache.sync_buffer().unwrap();
    assert_eq!(second.saved, 0);
    assert_eq!(cache.buffer().to_text(), text);
}

// ============================================================================
// Cache identity
// ============================================================================

#[test]
fn repeated_line_lookups_share_the_backing_task() {
    let mut store = MemoryStore::new();
    let uuid = store.insert(StoreTask::new("A"));
    let text = format!("* [ ] A  #{}\n* [ ] A again  #{}\n", uuid, TaskUuid::short(&uuid));
    let mut cache = cache(store, &text);

    let first = cache.get_by_line(0).unwrap().unwrap().task().unwrap().clone();
    let again = cache.get_by_line(0).unwrap().unwrap().task().unwrap().clone();
    let short = cache.get_by_line(1).unwrap().unwrap().task().unwrap().clone();
    assert!(Rc::ptr_eq(&first, &again));
    assert!(Rc::ptr_eq(&first, &short));
    assert_eq!(cache.store().calls().get, 1);
}

// ============================================================================
// Dependency order
// ============================================================================

#[test]
fn dependency_is_saved_first() {
    let mut store = MemoryStore::new();
    let b = store.insert(StoreTask::new("B"));
    let mut a_task = StoreTask::new("A");
    a_task.depends = vec![b];
    let a = store.insert(a_task);

    // both lines are edited so both need saving
    let text = format!("* [ ] A edited  #{}\n* [ ] B edited  #{}\n", a, b);
    let mut cache = cache(store, &text);
    cache.load_buffer().unwrap();

    assert_eq!(cache.save_order().unwrap(), vec![1, 0]);
    assert_eq!(cache.save_tasks().unwrap(), 2);
    assert_eq!(cache.store().save_log(), &[b, a]);
    assert_eq!(cache.store().get(&a).unwrap().depends, vec![b]);
}

#[test]
fn dependency_chain_across_many_lines() {
    let mut store = MemoryStore::new();
    let c = store.insert(StoreTask::new("C"));
    let mut b_task = StoreTask::new("B");
    b_task.depends = vec![c];
    let b = store.insert(b_task);
    let mut a_task = StoreTask::new("A");
    a_task.depends = vec![b, c];
    let a = store.insert(a_task);

    let text = format!(
        "* [ ] A edited  #{}\nprose\n* [ ] New one\n* [ ] B edited  #{}\n* [ ] C edited  #{}\n",
        a, b, c
    );
    let mut cache = cache(store, &text);
    cache.load_buffer().unwrap();

    let order = cache.save_order().unwrap();
    let pos = |line: usize| order.iter().position(|l| *l == line).unwrap();
    assert!(pos(4) < pos(3));
    assert!(pos(3) < pos(0));
    assert_eq!(order.len(), 4);

    cache.save_tasks().unwrap();
    let log = cache.store().save_log();
    let at = |u: uuid::Uuid| log.iter().position(|x| *x == u).unwrap();
    assert!(at(c) < at(b));
    assert!(at(b) < at(a));
}

#[test]
fn two_cycle_is_an_explicit_error() {
    let mut store = MemoryStore::new();
    let a = store.insert(StoreTask::new("A"));
    let b = store.insert(StoreTask::new("B"));
    store.get_mut(&a).unwrap().depends = vec![b];
    store.get_mut(&b).unwrap().depends = vec![a];

    let text = format!("intro\n* [ ] A  #{}\n* [ ] B  #{}\n", a, b);
    let mut cache = cache(store, &text);

    let err = cache.sync_buffer().unwrap_err();
    assert!(matches!(err, SyncError::DependencyCycle { ref lines } if lines == &[1, 2]));
    assert_eq!(
        err.to_string(),
        "dependency cycle detected between lines 2, 3"
    );
    assert_eq!(cache.store().calls().save, 0);
}

#[test]
fn dependency_outside_the_buffer_does_not_block() {
    let mut store = MemoryStore::new();
    let elsewhere = store.insert(StoreTask::new("Elsewhere"));
    let mut a_task = StoreTask::new("A");
    a_task.depends = vec![elsewhere];
    let a = store.insert(a_task);

    let mut cache = cache(store, &format!("* [ ] A edited  #{}\n", a));
    let summary = cache.sync_buffer().unwrap();
    assert_eq!(summary.saved, 1);
}

// ============================================================================
// Batched refresh
// ============================================================================

#[test]
fn refresh_uses_one_store_call() {
    let mut store = MemoryStore::new();
    let uuids: Vec<_> = ["One", "Two", "Three"]
        .iter()
        .map(|d| store.insert(StoreTask::new(*d)))
        .collect();
    let text: String = uuids
        .iter()
        .zip(["One", "Two", "Three"])
        .map(|(u, d)| format!("* [ ] {}  #{}\n", d, u))
        .collect();
    let mut cache = cache(store, &text);
    cache.load_buffer().unwrap();

    // the store changes behind the cache's back
    for (i, uuid) in uuids.iter().enumerate() {
        let task = cache.store_mut().get_mut(uuid).unwrap();
        task.description = format!("Task {}", i + 1);
        task.status = TaskStatus::Completed;
    }

    assert_eq!(cache.update_tasks().unwrap(), 3);
    assert_eq!(cache.store().calls().filter, 1);

    for (i, projection) in cache.projections().enumerate() {
        let task = projection.task().unwrap().borrow();
        assert_eq!(task.description, format!("Task {}", i + 1));
        assert_eq!(task.status, TaskStatus::Completed);
    }

    cache.update_buffer().unwrap();
    assert_eq!(
        cache.buffer().read_line(1).unwrap(),
        format!("* [X] Task 2  #{}", uuids[1])
    );
}

#[test]
fn refresh_buffer_discards_local_edits() {
    let mut store = MemoryStore::new();
    let uuid = store.insert(StoreTask::new("Stored"));
    let mut cache = cache(store, &format!("* [ ] Edited locally !!!  #{}\n", uuid));

    let summary = cache.refresh_buffer().unwrap();
    assert_eq!(summary.refreshed, 1);
    assert_eq!(summary.saved, 0);
    assert_eq!(
        cache.buffer().read_line(0).unwrap(),
        format!("* [ ] Stored  #{}", uuid)
    );
}

// ============================================================================
// File-backed store
// ============================================================================

#[test]
fn json_store_round_trip_through_sync() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");

    let store = JsonFileStore::open(&path).unwrap();
    let mut cache = SyncCache::new(store, VecBuffer::from_text("* [ ] Persist me (2024-06-01)\n"))
        .with_short_uuids(true);
    cache.sync_buffer().unwrap();
    let (_, buffer) = cache.into_parts();

    let reopened = JsonFileStore::open(&path).unwrap();
    let task = reopened.tasks().next().unwrap();
    assert_eq!(task.description, "Persist me");
    let uuid = task.uuid.unwrap();
    assert_eq!(
        buffer.read_line(0).unwrap(),
        format!("* [ ] Persist me (2024-06-01)  #{}", TaskUuid::short(&uuid))
    );

    // a fresh session resolves the short form against the file
    let mut cache = SyncCache::new(reopened, buffer);
    let summary = cache.sync_buffer().unwrap();
    assert_eq!(summary.tasks, 1);
    assert_eq!(summary.saved, 0);
}
