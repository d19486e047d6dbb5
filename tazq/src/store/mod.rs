//! Local task persistence.
//!
//! Defines the [`TaskStore`] trait the controllers talk to, plus two
//! implementations:
//! - [`memory::InMemoryTaskStore`]: in-process rows, for tests and demos
//! - [`sqlite::SqliteTaskStore`]: a `task` table in a local SQLite file
//!
//! Stores do not validate tasks. Updates, deletes and status changes that
//! name an id with no row are silent no-ops.

pub mod live;
pub mod memory;
pub mod sqlite;

use std::future::Future;

use tazq_proto::task::{Task, TaskId};

pub use live::{Subscription, SubscriptionId};
pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

/// Errors raised by a task store. All of them are storage faults and are
/// not recoverable locally.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The SQLite engine reported an error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The storage is unavailable (I/O failure, disk full, ...).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The background worker running the query failed.
    #[error("storage worker failed: {0}")]
    Worker(String),
}

/// Persistence boundary for task records.
///
/// Every mutation that changes a row publishes a fresh snapshot to all live
/// subscriptions before the next mutation is accepted.
pub trait TaskStore: Send + Sync + 'static {
    /// Subscribes to every task, in insertion order.
    ///
    /// The current rows are delivered immediately; a new snapshot follows
    /// every committed change.
    fn get_all(
        &self,
    ) -> impl Future<Output = Result<Subscription<Vec<Task>>, StoreError>> + Send;

    /// Subscribes to a single task.
    ///
    /// Nothing is delivered while no row has this id.
    fn get(
        &self,
        id: TaskId,
    ) -> impl Future<Output = Result<Subscription<Task>, StoreError>> + Send;

    /// Inserts `task` under a fresh id and returns that id. The incoming
    /// `task.id` is ignored.
    fn insert(&self, task: &Task) -> impl Future<Output = Result<TaskId, StoreError>> + Send;

    /// Replaces the row matched by `task.id`.
    fn update(&self, task: &Task) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes the row matched by `task.id`.
    fn delete(&self, task: &Task) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Sets only the completion flag of row `id`.
    fn update_task_status(
        &self,
        id: TaskId,
        is_done: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
