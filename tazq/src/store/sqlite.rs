//! SQLite-backed task store.
//!
//! One row per task in the `task` table. The connection sits behind a mutex
//! and every statement runs on the tokio blocking pool, so callers on the
//! async side never block. Snapshots for live queries are re-read and
//! published before the mutex is released.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};

use tazq_proto::task::{Priority, Task, TaskId};

use super::live::Watchers;
use super::{StoreError, Subscription, TaskStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS task (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    priority TEXT NOT NULL,
    category TEXT NOT NULL,
    is_done INTEGER NOT NULL DEFAULT 0,
    date_created INTEGER NOT NULL
);";
const SELECT_ALL: &str = "SELECT id, title, description, priority, category, is_done, date_created
    FROM task ORDER BY id";
const INSERT_TASK: &str = "INSERT INTO task
    (title, description, priority, category, is_done, date_created)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
const UPDATE_TASK: &str = "UPDATE task
    SET title = ?1, description = ?2, priority = ?3, category = ?4, is_done = ?5, date_created = ?6
    WHERE id = ?7";
const DELETE_TASK: &str = "DELETE FROM task WHERE id = ?1";
const UPDATE_STATUS: &str = "UPDATE task SET is_done = ?1 WHERE id = ?2";

struct Shared {
    conn: Mutex<Connection>,
    watchers: Arc<Watchers>,
}

/// Task store persisting to a SQLite database.
#[derive(Clone)]
pub struct SqliteTaskStore {
    shared: Arc<Shared>,
}

impl SqliteTaskStore {
    /// Opens (or creates) the database at `path`, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory cannot be created or the
    /// database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        tracing::info!(path = %path.display(), "opened task database");
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if SQLite cannot create the schema.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            shared: Arc::new(Shared {
                conn: Mutex::new(conn),
                watchers: Arc::new(Watchers::default()),
            }),
        })
    }

    /// Number of live subscriptions still registered.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.watchers.len()
    }

    /// Runs `op` with the connection on the blocking pool.
    async fn run<R, F>(&self, op: F) -> Result<R, StoreError>
    where
        R: Send + 'static,
        F: FnOnce(&Connection, &Arc<Watchers>) -> Result<R, StoreError> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || {
            let conn = shared.conn.lock();
            op(&conn, &shared.watchers)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// Runs a mutating statement and publishes a snapshot if any row changed.
    async fn mutate<F>(&self, op: F) -> Result<usize, StoreError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<usize> + Send + 'static,
    {
        self.run(move |conn, watchers| {
            let changed = op(conn)?;
            if changed > 0 && !watchers.is_empty() {
                watchers.publish(&select_all(conn)?);
            }
            Ok(changed)
        })
        .await
    }
}

impl TaskStore for SqliteTaskStore {
    async fn get_all(&self) -> Result<Subscription<Vec<Task>>, StoreError> {
        self.run(|conn, watchers| Ok(watchers.watch_all(&select_all(conn)?)))
            .await
    }

    async fn get(&self, id: TaskId) -> Result<Subscription<Task>, StoreError> {
        self.run(move |conn, watchers| Ok(watchers.watch_one(id, &select_all(conn)?)))
            .await
    }

    async fn insert(&self, task: &Task) -> Result<TaskId, StoreError> {
        let task = task.clone();
        let id = self
            .run(move |conn, watchers| {
                conn.execute(
                    INSERT_TASK,
                    params![
                        task.title,
                        task.description,
                        task.priority.as_str(),
                        task.category,
                        task.is_done,
                        task.date_created,
                    ],
                )?;
                let id = TaskId::new(conn.last_insert_rowid());
                if !watchers.is_empty() {
                    watchers.publish(&select_all(conn)?);
                }
                Ok(id)
            })
            .await?;
        tracing::debug!(task_id = %id, "task inserted");
        Ok(id)
    }

    async fn update(&self, task: &Task) -> Result<(), StoreError> {
        let task = task.clone();
        let id = task.id;
        let changed = self
            .mutate(move |conn| {
                conn.execute(
                    UPDATE_TASK,
                    params![
                        task.title,
                        task.description,
                        task.priority.as_str(),
                        task.category,
                        task.is_done,
                        task.date_created,
                        task.id.get(),
                    ],
                )
            })
            .await?;
        tracing::debug!(task_id = %id, changed, "task update");
        Ok(())
    }

    async fn delete(&self, task: &Task) -> Result<(), StoreError> {
        let id = task.id;
        let changed = self
            .mutate(move |conn| conn.execute(DELETE_TASK, params![id.get()]))
            .await?;
        tracing::debug!(task_id = %id, changed, "task delete");
        Ok(())
    }

    async fn update_task_status(&self, id: TaskId, is_done: bool) -> Result<(), StoreError> {
        let changed = self
            .mutate(move |conn| conn.execute(UPDATE_STATUS, params![is_done, id.get()]))
            .await?;
        tracing::debug!(task_id = %id, is_done, changed, "task status update");
        Ok(())
    }
}

fn select_all(conn: &Connection) -> Result<Vec<Task>, StoreError> {
    let mut stmt = conn.prepare_cached(SELECT_ALL)?;
    let rows = stmt.query_map([], row_to_task)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let priority: String = row.get(3)?;
    let priority = priority
        .parse::<Priority>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(Task {
        id: TaskId::new(row.get(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        priority,
        category: row.get(4)?,
        is_done: row.get(5)?,
        date_created: row.get(6)?,
    })
}
