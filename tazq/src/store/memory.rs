//! In-memory task store.
//!
//! Rows live in a `Vec` in insertion order; ids start at 1. Nothing
//! survives the process. Useful for tests and for running controllers
//! without a database file.

use std::sync::Arc;

use parking_lot::Mutex;

use tazq_proto::task::{Task, TaskId};

use super::live::Watchers;
use super::{StoreError, Subscription, TaskStore};

#[derive(Default)]
struct Rows {
    tasks: Vec<Task>,
    last_id: i64,
    unavailable: bool,
}

/// Task store backed by process memory.
#[derive(Default)]
pub struct InMemoryTaskStore {
    rows: Mutex<Rows>,
    watchers: Arc<Watchers>,
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following write fail with [`StoreError::Unavailable`]
    /// (or succeed again when `false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.rows.lock().unavailable = unavailable;
    }

    /// Copy of the current rows.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Task> {
        self.rows.lock().tasks.clone()
    }

    /// Number of live subscriptions still registered.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.watchers.len()
    }

    /// Runs `op` under the write lock and publishes when it reports a change.
    fn write<R>(&self, op: impl FnOnce(&mut Rows) -> (R, bool)) -> Result<R, StoreError> {
        let mut rows = self.rows.lock();
        if rows.unavailable {
            return Err(StoreError::Unavailable("in-memory store marked unavailable".to_string()));
        }
        let (result, changed) = op(&mut rows);
        if changed {
            self.watchers.publish(&rows.tasks);
        }
        drop(rows);
        Ok(result)
    }
}

impl TaskStore for InMemoryTaskStore {
    async fn get_all(&self) -> Result<Subscription<Vec<Task>>, StoreError> {
        let rows = self.rows.lock();
        Ok(self.watchers.watch_all(&rows.tasks))
    }

    async fn get(&self, id: TaskId) -> Result<Subscription<Task>, StoreError> {
        let rows = self.rows.lock();
        Ok(self.watchers.watch_one(id, &rows.tasks))
    }

    async fn insert(&self, task: &Task) -> Result<TaskId, StoreError> {
        let id = self.write(|rows| {
            rows.last_id += 1;
            let id = TaskId::new(rows.last_id);
            rows.tasks.push(Task { id, ..task.clone() });
            (id, true)
        })?;
        tracing::debug!(task_id = %id, "task inserted");
        Ok(id)
    }

    async fn update(&self, task: &Task) -> Result<(), StoreError> {
        let updated = self.write(|rows| {
            let slot = rows.tasks.iter_mut().find(|t| t.id == task.id);
            let found = slot.is_some();
            if let Some(slot) = slot {
                *slot = task.clone();
            }
            (found, found)
        })?;
        tracing::debug!(task_id = %task.id, updated, "task update");
        Ok(())
    }

    async fn delete(&self, task: &Task) -> Result<(), StoreError> {
        let deleted = self.write(|rows| {
            let before = rows.tasks.len();
            rows.tasks.retain(|t| t.id != task.id);
            let changed = rows.tasks.len() != before;
            (changed, changed)
        })?;
        tracing::debug!(task_id = %task.id, deleted, "task delete");
        Ok(())
    }

    async fn update_task_status(&self, id: TaskId, is_done: bool) -> Result<(), StoreError> {
        let updated = self.write(|rows| {
            let slot = rows.tasks.iter_mut().find(|t| t.id == id);
            let found = slot.is_some();
            if let Some(slot) = slot {
                slot.is_done = is_done;
            }
            (found, found)
        })?;
        tracing::debug!(task_id = %id, is_done, updated, "task status update");
        Ok(())
    }
}
