use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::buffer::LineBuffer;
use crate::model::task::{SharedTask, TaskUuid, share};
use crate::store::TaskStore;
use crate::sync::SyncError;
use crate::sync::context::{SectionContext, section_context};
use crate::sync::order::dependency_order;
use crate::sync::projection::TaskProjection;

/// Counts from one whole-buffer sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Task lines found in the buffer
    pub tasks: usize,
    /// Tasks written to the store
    pub saved: usize,
    /// Tasks re-read from the store by the batched refresh
    pub refreshed: usize,
}

/// The two-keyed task cache for one buffer.
///
/// `by_id` holds the single shared instance of every store task seen in
/// this session; `by_line` holds the projection for every line looked at,
/// with `None` recording "this line has no task" so it is never parsed
/// twice. Call `reset` at the start of every buffer-scoped command.
pub struct SyncCache<S, B> {
    store: S,
    buffer: B,
    short_uuids: bool,
    by_id: IndexMap<Uuid, SharedTask>,
    by_line: BTreeMap<usize, Option<TaskProjection>>,
}

impl<S: TaskStore, B: LineBuffer> SyncCache<S, B> {
    pub fn new(store: S, buffer: B) -> Self {
        SyncCache {
            store,
            buffer,
            short_uuids: false,
            by_id: IndexMap::new(),
            by_line: BTreeMap::new(),
        }
    }

    /// Write newly assigned UUIDs in their 8-hex form
    pub fn with_short_uuids(mut self, short: bool) -> Self {
        self.short_uuids = short;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut B {
        &mut self.buffer
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.buffer)
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// The shared task for a UUID, fetched from the store on first use.
    /// Short and full forms of the same UUID resolve to the same instance.
    pub fn get_by_id(&mut self, uuid: &TaskUuid) -> Result<Option<SharedTask>, SyncError> {
        if let Some(hit) = self.cached_task(uuid) {
            return Ok(Some(hit));
        }

        debug!(%uuid, "task cache miss");
        let Some(task) = self.store.get_by_uuid(uuid)? else {
            return Ok(None);
        };
        let Some(full) = task.uuid else {
            warn!(%uuid, "store returned a task without a uuid");
            return Ok(None);
        };
        let shared = self
            .by_id
            .entry(full)
            .or_insert_with(|| share(task))
            .clone();
        Ok(Some(shared))
    }

    fn cached_task(&self, uuid: &TaskUuid) -> Option<SharedTask> {
        if let Some(full) = uuid.full() {
            return self.by_id.get(&full).cloned();
        }
        let mut matches = self.by_id.iter().filter(|(k, _)| uuid.matches(k));
        match (matches.next(), matches.next()) {
            (Some((_, task)), None) => Some(task.clone()),
            _ => None,
        }
    }

    /// The projection for a line, parsed on first use. `Ok(None)` when the
    /// line holds no task; that answer is cached too.
    pub fn get_by_line(&mut self, line: usize) -> Result<Option<&TaskProjection>, SyncError> {
        self.ensure_line(line)?;
        Ok(self.by_line.get(&line).and_then(Option::as_ref))
    }

    /// Mutable access to a line's projection, for local edits before a save
    pub fn get_by_line_mut(
        &mut self,
        line: usize,
    ) -> Result<Option<&mut TaskProjection>, SyncError> {
        self.ensure_line(line)?;
        Ok(self.by_line.get_mut(&line).and_then(Option::as_mut))
    }

    fn ensure_line(&mut self, line: usize) -> Result<(), SyncError> {
        if !self.by_line.contains_key(&line) {
            let projection = TaskProjection::from_line(self, line)?;
            self.by_line.insert(line, projection);
        }
        Ok(())
    }

    /// Present projections in line order
    pub fn projections(&self) -> impl Iterator<Item = &TaskProjection> {
        self.by_line.values().flatten()
    }

    // -----------------------------------------------------------------------
    // Whole-cache operations
    // -----------------------------------------------------------------------

    /// Forget everything. The next lookups start from the store and buffer.
    pub fn reset(&mut self) {
        debug!(
            tasks = self.by_id.len(),
            lines = self.by_line.len(),
            "resetting cache"
        );
        self.by_id.clear();
        self.by_line.clear();
    }

    /// Parse every line of the buffer once
    pub fn load_buffer(&mut self) -> Result<(), SyncError> {
        for line in 0..self.buffer.line_count() {
            self.ensure_line(line)?;
        }
        debug!(
            lines = self.by_line.len(),
            tasks = self.projections().count(),
            "buffer loaded"
        );
        Ok(())
    }

    /// Rewrite every cached task line from its backing task
    pub fn update_buffer(&mut self) -> Result<(), SyncError> {
        for projection in self.by_line.values_mut().flatten() {
            projection.update_from_task(self.short_uuids);
            projection.update_in_buffer(&mut self.buffer)?;
        }
        Ok(())
    }

    /// Map each cached line to the lines its task depends on
    pub fn dependency_graph(&self) -> BTreeMap<usize, Vec<usize>> {
        let lines_by_uuid: HashMap<Uuid, usize> = self
            .projections()
            .filter_map(|p| p.uuid().map(|u| (u, p.line_number())))
            .collect();

        self.projections()
            .map(|p| (p.line_number(), p.dependencies_on_other_lines(&lines_by_uuid)))
            .collect()
    }

    /// The order `save_tasks` would save the cached lines in
    pub fn save_order(&self) -> Result<Vec<usize>, SyncError> {
        dependency_order(&self.dependency_graph())
            .map_err(|lines| SyncError::DependencyCycle { lines })
    }

    /// Save every cached task, dependencies first.
    ///
    /// The order is settled before anything is written, so a cycle fails
    /// the whole save without touching the store. Returns how many tasks
    /// were written.
    pub fn save_tasks(&mut self) -> Result<usize, SyncError> {
        let order = self.save_order()?;
        let mut saved = 0;

        for line in order {
            let context = match self.by_line.get(&line) {
                Some(Some(p)) if p.is_new() => section_context(&self.buffer, line)?,
                _ => SectionContext::default(),
            };
            let Some(Some(projection)) = self.by_line.get_mut(&line) else {
                continue;
            };

            if projection.save_to_store(&mut self.store, &context, self.short_uuids)? {
                saved += 1;
            }
            if let Some(task) = projection.task()
                && let Some(uuid) = task.borrow().uuid
            {
                self.by_id.entry(uuid).or_insert_with(|| task.clone());
            }
        }

        info!(saved, "saved tasks");
        Ok(saved)
    }

    /// Refresh every cached, persisted task from the store in one call.
    /// Tasks are overwritten in place, so projections see the new state.
    pub fn update_tasks(&mut self) -> Result<usize, SyncError> {
        let uuids: Vec<Uuid> = self
            .by_id
            .values()
            .filter_map(|t| t.borrow().uuid)
            .collect();
        if uuids.is_empty() {
            return Ok(0);
        }

        let fresh = self.store.filter_by_uuids(&uuids)?;
        let mut updated = 0;
        for task in fresh {
            if let Some(uuid) = task.uuid
                && let Some(shared) = self.by_id.get(&uuid)
            {
                *shared.borrow_mut() = task;
                updated += 1;
            }
        }

        debug!(requested = uuids.len(), updated, "refreshed tasks");
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Buffer-scoped commands
    // -----------------------------------------------------------------------

    /// Save local edits, pull store state, and write it back to the buffer
    pub fn sync_buffer(&mut self) -> Result<SyncSummary, SyncError> {
        self.reset();
        self.load_buffer()?;
        let saved = self.save_tasks()?;
        let refreshed = self.update_tasks()?;
        self.update_buffer()?;

        let summary = SyncSummary {
            tasks: self.projections().count(),
            saved,
            refreshed,
        };
        info!(?summary, "buffer synced");
        Ok(summary)
    }

    /// Save local edits and write assigned UUIDs back, without a refresh
    pub fn save_buffer(&mut self) -> Result<SyncSummary, SyncError> {
        self.reset();
        self.load_buffer()?;
        let saved = self.save_tasks()?;
        self.update_buffer()?;

        Ok(SyncSummary {
            tasks: self.projections().count(),
            saved,
            refreshed: 0,
        })
    }

    /// Pull store state into the buffer, discarding local edits to known tasks
    pub fn refresh_buffer(&mut self) -> Result<SyncSummary, SyncError> {
        self.reset();
        self.load_buffer()?;
        let refreshed = self.update_tasks()?;
        self.update_buffer()?;

        Ok(SyncSummary {
            tasks: self.projections().count(),
            saved: 0,
            refreshed,
        })
    }
}
