use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::buffer::{BufferError, LineBuffer};
use crate::model::line::TaskLine;
use crate::model::task::{SharedTask, StoreTask, TaskStatus, TaskUuid, share};
use crate::parse::{parse_task_line, serialize_task_line};
use crate::store::{StoreError, TaskStore};
use crate::sync::SyncError;
use crate::sync::cache::SyncCache;
use crate::sync::context::SectionContext;

/// One buffer line's view of a task.
///
/// The line fields are the editable, local side; the backing task is the
/// store's record, shared with the cache. A projection without a backing
/// task is a new task that has never been saved.
#[derive(Debug, Clone)]
pub struct TaskProjection {
    line_number: usize,
    pub line: TaskLine,
    task: Option<SharedTask>,
}

impl TaskProjection {
    /// Build the projection for `line_number`, resolving its backing task
    /// through the cache. `Ok(None)` means the line holds no task.
    pub fn from_line<S: TaskStore, B: LineBuffer>(
        cache: &mut SyncCache<S, B>,
        line_number: usize,
    ) -> Result<Option<Self>, SyncError> {
        let text = cache.buffer().read_line(line_number)?;
        let Some(line) = parse_task_line(&text) else {
            return Ok(None);
        };

        let task = match line.uuid {
            Some(ref uuid) => {
                let task = cache
                    .get_by_id(uuid)?
                    .ok_or_else(|| SyncError::UnknownTask {
                        line: line_number,
                        uuid: uuid.clone(),
                    })?;
                Some(task)
            }
            None => None,
        };

        Ok(Some(TaskProjection {
            line_number,
            line,
            task,
        }))
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn task(&self) -> Option<&SharedTask> {
        self.task.as_ref()
    }

    /// Never saved to the store
    pub fn is_new(&self) -> bool {
        self.task.is_none()
    }

    /// The store UUID of the backing task, if any
    pub fn uuid(&self) -> Option<Uuid> {
        self.task.as_ref().and_then(|t| t.borrow().uuid)
    }

    /// Lines holding the tasks this one depends on.
    ///
    /// `lines_by_uuid` indexes the projections currently cached by line.
    /// Dependencies that are not on any cached line do not constrain the
    /// save order.
    pub fn dependencies_on_other_lines(&self, lines_by_uuid: &HashMap<Uuid, usize>) -> Vec<usize> {
        let Some(ref task) = self.task else {
            return Vec::new();
        };
        let task = task.borrow();

        let mut lines = Vec::new();
        for dep in &task.depends {
            match lines_by_uuid.get(dep) {
                Some(&line) if line != self.line_number => lines.push(line),
                Some(_) => {}
                None => {
                    debug!(line = self.line_number, %dep, "dependency not on a cached line");
                }
            }
        }
        lines
    }

    /// Overwrite the line fields from the backing task
    pub fn update_from_task(&mut self, short_uuids: bool) {
        let Some(ref task) = self.task else {
            return;
        };
        let task = task.borrow();

        self.line.text = task.description.clone();
        if TaskStatus::from_mark(self.line.mark) != Some(task.status) {
            self.line.mark = task.status.mark();
        }
        self.line.priority = task.priority;
        self.line.due = task.due;

        if let Some(uuid) = task.uuid
            && !self.line.uuid.as_ref().is_some_and(|u| u.matches(&uuid))
        {
            self.line.uuid = Some(written_uuid(uuid, short_uuids));
        }
    }

    /// Write the serialized line back to its place in the buffer
    pub fn update_in_buffer<B: LineBuffer + ?Sized>(&self, buffer: &mut B) -> Result<(), BufferError> {
        buffer.write_line(self.line_number, &serialize_task_line(&self.line))
    }

    /// Push the line's edits to the store, creating the task if it is new.
    ///
    /// New tasks start from the section defaults in `context`. An existing
    /// task whose record would not change is not sent to the store. Returns
    /// whether the store was written.
    pub fn save_to_store<S: TaskStore + ?Sized>(
        &mut self,
        store: &mut S,
        context: &SectionContext,
        short_uuids: bool,
    ) -> Result<bool, StoreError> {
        let mut record = match self.task {
            Some(ref task) => task.borrow().clone(),
            None => {
                let mut fresh = StoreTask::new(self.line.text.clone());
                context.apply(&mut fresh);
                fresh
            }
        };
        let before = record.clone();

        record.description = self.line.text.clone();
        match TaskStatus::from_mark(self.line.mark) {
            Some(status) => record.status = status,
            None if self.task.is_none() => record.status = TaskStatus::Pending,
            None => {}
        }
        record.priority = match self.task {
            Some(_) => self.line.priority,
            None => self.line.priority.or(context.priority),
        };
        record.due = self.line.due;

        if self.task.is_some() && record == before {
            return Ok(false);
        }

        let saved = store.save(record)?;
        debug!(line = self.line_number, uuid = ?saved.uuid, "saved task");

        match self.task {
            Some(ref task) => *task.borrow_mut() = saved,
            None => {
                if let Some(uuid) = saved.uuid {
                    self.line.uuid = Some(written_uuid(uuid, short_uuids));
                }
                self.task = Some(share(saved));
            }
        }
        Ok(true)
    }
}

fn written_uuid(uuid: Uuid, short: bool) -> TaskUuid {
    if short {
        TaskUuid::short(&uuid)
    } else {
        TaskUuid::Full(uuid)
    }
}
