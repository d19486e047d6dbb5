//! Task list controller.
//!
//! Mirrors the store's `get_all()` live query into [`TaskListState::tasks`],
//! optionally narrowed by a search query. Exactly one live subscription is
//! held between calls: a new search subscribes first and then stops the
//! running feed, releasing its subscription. If subscribing fails the
//! running feed is kept.
//!
//! Mutating intents only call the store. The list refreshes when the store
//! publishes the change.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use tazq_proto::task::Task;

use super::message_or;
use super::view::{SortOption, filter_tasks, sort_tasks};
use crate::store::{StoreError, Subscription, TaskStore};

/// Observable state of the task list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListState {
    /// Tasks from the latest snapshot, filtered by `query`.
    pub tasks: Vec<Task>,
    /// Active search query. Empty means unfiltered.
    pub query: String,
    /// Last failed store call, until cleared.
    pub error_message: Option<String>,
}

/// Holds the observed task list and dispatches list intents to the store.
pub struct TaskListController<S: TaskStore> {
    store: Arc<S>,
    state: Arc<watch::Sender<TaskListState>>,
    feed: Mutex<Option<JoinHandle<()>>>,
}

impl<S: TaskStore> TaskListController<S> {
    /// Subscribes to every task. The first snapshot is in the state when
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot start the live query.
    pub async fn new(store: Arc<S>) -> Result<Self, StoreError> {
        let controller = Self {
            store,
            state: Arc::new(watch::Sender::new(TaskListState::default())),
            feed: Mutex::new(None),
        };
        controller.follow(String::new()).await?;
        Ok(controller)
    }

    /// Replaces the list with tasks whose title or description contains
    /// `query` (case-insensitive). An empty query restores the full list.
    ///
    /// The previous live subscription is released once the new one is
    /// taken. A store failure is reported in `error_message` and the list
    /// keeps following the previous query.
    pub async fn search_tasks(&self, query: &str) {
        if let Err(e) = self.follow(query.to_string()).await {
            tracing::warn!(query, error = %e, "search failed");
            self.state
                .send_modify(|s| s.error_message = Some(message_or(&e, "Search failed")));
        }
    }

    /// Re-orders the tasks already loaded. No store call is made; the next
    /// snapshot from the store arrives in store order.
    pub fn sort_tasks(&self, option: SortOption) {
        self.state.send_modify(|s| sort_tasks(&mut s.tasks, option));
    }

    /// Deletes `task` from the store.
    pub fn delete_task(&self, task: &Task) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let task = task.clone();
        self.dispatch("delete", async move { store.delete(&task).await })
    }

    /// Replaces the stored row of `task`.
    pub fn update_task(&self, task: &Task) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let task = task.clone();
        self.dispatch("update", async move { store.update(&task).await })
    }

    /// Flips the completion flag of `task`.
    pub fn update_task_status(&self, task: &Task) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let (id, is_done) = (task.id, !task.is_done);
        self.dispatch("status update", async move {
            store.update_task_status(id, is_done).await
        })
    }

    /// Receiver of every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TaskListState> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> TaskListState {
        self.state.borrow().clone()
    }

    /// Copy of the current task list.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.state.borrow().tasks.clone()
    }

    /// Dismisses the current error message.
    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error_message = None);
    }

    /// Stops the feed and waits until its subscription is released.
    pub async fn close(self) {
        let feed = self.feed.lock().take();
        if let Some(feed) = feed {
            stop(feed).await;
        }
    }

    async fn follow(&self, query: String) -> Result<(), StoreError> {
        // The running feed stays in place until the new live query exists.
        let mut subscription = self.store.get_all().await?;
        let previous = self.feed.lock().take();
        if let Some(previous) = previous {
            stop(previous).await;
        }

        if let Some(snapshot) = subscription.try_next() {
            let tasks = filter_tasks(&snapshot, &query);
            self.state.send_modify(|s| {
                s.tasks = tasks;
                s.query.clone_from(&query);
            });
        }
        tracing::debug!(
            subscription = %subscription.id(),
            query = %query,
            "task list feed started"
        );
        let feed = tokio::spawn(run_feed(subscription, query, Arc::clone(&self.state)));
        if let Some(stale) = self.feed.lock().replace(feed) {
            stale.abort();
        }
        Ok(())
    }

    fn dispatch<F>(&self, action: &'static str, op: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Err(e) = op.await {
                tracing::warn!(action, error = %e, "task list intent failed");
                state.send_modify(|s| {
                    s.error_message = Some(message_or(&e, "Task update failed"));
                });
            }
        })
    }
}

impl<S: TaskStore> Drop for TaskListController<S> {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.get_mut().take() {
            feed.abort();
        }
    }
}

async fn run_feed(
    mut subscription: Subscription<Vec<Task>>,
    query: String,
    state: Arc<watch::Sender<TaskListState>>,
) {
    while let Some(snapshot) = subscription.next().await {
        let tasks = filter_tasks(&snapshot, &query);
        state.send_modify(|s| s.tasks = tasks);
    }
}

/// Aborts a feed and waits for it to finish, which drops its subscription.
async fn stop(feed: JoinHandle<()>) {
    feed.abort();
    let _ = feed.await;
}
