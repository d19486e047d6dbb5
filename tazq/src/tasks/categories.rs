//! Per-category task counts.
//!
//! The counts are recomputed in full from every snapshot the store
//! publishes, over a fixed list of known categories.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use tazq_proto::task::Task;

use super::view::category_counts;
use crate::store::{StoreError, Subscription, TaskStore};

/// Observable state of the categories view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoriesState {
    /// Latest snapshot of every task.
    pub tasks: Vec<Task>,
    /// Task count per known category, zero included.
    pub counts: BTreeMap<String, usize>,
}

/// Keeps per-category task counts in step with the store.
pub struct CategoriesController {
    categories: Arc<[String]>,
    state: Arc<watch::Sender<CategoriesState>>,
    feed: Option<JoinHandle<()>>,
}

impl CategoriesController {
    /// Subscribes to every task in `store` and counts them over
    /// `categories`. The first counts are in the state when this returns.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot start the live query.
    pub async fn new<S: TaskStore>(
        store: &S,
        categories: Vec<String>,
    ) -> Result<Self, StoreError> {
        let categories: Arc<[String]> = categories.into();
        let mut subscription = store.get_all().await?;
        let initial = recount(subscription.try_next().unwrap_or_default(), &categories);
        let state = Arc::new(watch::Sender::new(initial));
        let feed = tokio::spawn(run_feed(
            subscription,
            Arc::clone(&categories),
            Arc::clone(&state),
        ));
        Ok(Self {
            categories,
            state,
            feed: Some(feed),
        })
    }

    /// The known category names, in configured order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Copy of the current counts.
    #[must_use]
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        self.state.borrow().counts.clone()
    }

    /// Receiver of every recount.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CategoriesState> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> CategoriesState {
        self.state.borrow().clone()
    }

    /// Stops the feed and waits until its subscription is released.
    pub async fn close(mut self) {
        if let Some(feed) = self.feed.take() {
            feed.abort();
            let _ = feed.await;
        }
    }
}

impl Drop for CategoriesController {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.abort();
        }
    }
}

fn recount(tasks: Vec<Task>, categories: &[String]) -> CategoriesState {
    let counts = category_counts(&tasks, categories);
    CategoriesState { tasks, counts }
}

async fn run_feed(
    mut subscription: Subscription<Vec<Task>>,
    categories: Arc<[String]>,
    state: Arc<watch::Sender<CategoriesState>>,
) {
    while let Some(tasks) = subscription.next().await {
        state.send_replace(recount(tasks, &categories));
    }
}
