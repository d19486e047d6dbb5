//! Integration tests for the task list, task form and categories
//! controllers over an in-memory store.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use tazq::store::{InMemoryTaskStore, StoreError, Subscription, TaskStore};
use tazq::tasks::{CategoriesController, SortOption, TaskFormController, TaskListController};
use tazq_proto::task::{DEFAULT_CATEGORIES, Priority, Task, TaskId};

// ---------------------------------------------------------------------------
// Stubs
// ---------------------------------------------------------------------------

/// In-memory store whose live queries can be made to fail on demand.
#[derive(Default)]
struct FlakyReads {
    inner: InMemoryTaskStore,
    fail_reads: AtomicBool,
}

impl TaskStore for FlakyReads {
    async fn get_all(&self) -> Result<Subscription<Vec<Task>>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read refused".to_string()));
        }
        self.inner.get_all().await
    }

    async fn get(&self, id: TaskId) -> Result<Subscription<Task>, StoreError> {
        self.inner.get(id).await
    }

    async fn insert(&self, task: &Task) -> Result<TaskId, StoreError> {
        self.inner.insert(task).await
    }

    async fn update(&self, task: &Task) -> Result<(), StoreError> {
        self.inner.update(task).await
    }

    async fn delete(&self, task: &Task) -> Result<(), StoreError> {
        self.inner.delete(task).await
    }

    async fn update_task_status(&self, id: TaskId, is_done: bool) -> Result<(), StoreError> {
        self.inner.update_task_status(id, is_done).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Waits until the observed state satisfies `pred`, failing after 5 seconds.
async fn wait_for<T: Clone>(rx: &mut watch::Receiver<T>, pred: impl FnMut(&T) -> bool) -> T {
    let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for state")
        .expect("controller dropped");
    state.clone()
}

fn known_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(ToString::to_string).collect()
}

async fn seeded_store(tasks: &[(&str, &str, Priority, &str)]) -> Arc<InMemoryTaskStore> {
    let store = Arc::new(InMemoryTaskStore::new());
    for (title, description, priority, category) in tasks {
        store
            .insert(&Task::new(*title, *description, *priority, *category))
            .await
            .unwrap();
    }
    store
}

// ---------------------------------------------------------------------------
// Task creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn short_title_never_reaches_the_store() {
    let store = Arc::new(InMemoryTaskStore::new());
    let form = TaskFormController::new(Arc::clone(&store));
    form.update_title("Hi");

    assert!(form.add_task().is_none());
    assert!(store.snapshot().is_empty());
    assert_eq!(
        form.state().error_message.as_deref(),
        Some("Please fix the errors before submitting")
    );
    assert_eq!(
        form.title_error_message().as_deref(),
        Some("Title must be at least 3 characters")
    );
}

#[tokio::test]
async fn long_description_blocks_submission() {
    let store = Arc::new(InMemoryTaskStore::new());
    let form = TaskFormController::new(Arc::clone(&store));
    form.update_title("Buy milk");
    form.update_description(&"d".repeat(501));

    assert!(!form.is_form_valid());
    assert!(form.add_task().is_none());
    assert!(store.snapshot().is_empty());

    form.update_description(&"d".repeat(500));
    assert!(form.is_form_valid());
}

#[tokio::test]
async fn submission_stores_the_form_fields() {
    let store = Arc::new(InMemoryTaskStore::new());
    let form = TaskFormController::new(Arc::clone(&store));
    form.update_title("Buy milk");
    form.update_description("two litres");
    form.update_priority(Priority::Low);
    form.update_category("Work");
    form.clear_error();

    form.add_task().unwrap().await.unwrap();

    let rows = store.snapshot();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Buy milk");
    assert_eq!(rows[0].description, "two litres");
    assert_eq!(rows[0].priority, Priority::Low);
    assert_eq!(rows[0].category, "Work");
    assert!(!rows[0].is_done);

    let state = form.state();
    assert!(state.show_confirmation);
    assert!(!state.is_loading);
    assert!(!state.title_touched);
    assert_eq!(state.priority, Priority::Medium);
}

#[tokio::test]
async fn storage_fault_lands_in_error_message() {
    let store = Arc::new(InMemoryTaskStore::new());
    store.set_unavailable(true);
    let form = TaskFormController::new(Arc::clone(&store));
    form.update_title("Buy milk");

    form.add_task().unwrap().await.unwrap();

    let state = form.state();
    assert!(!state.is_loading);
    assert!(!state.show_confirmation);
    assert!(state.error_message.unwrap().contains("unavailable"));
    // Fields are kept so the user can retry.
    assert_eq!(state.title, "Buy milk");

    form.clear_error();
    assert!(form.state().error_message.is_none());
}

// ---------------------------------------------------------------------------
// Task list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sort_by_priority_ranks_low_to_high() {
    let store = seeded_store(&[
        ("high", "", Priority::High, "Work"),
        ("low", "", Priority::Low, "Work"),
        ("medium", "", Priority::Medium, "Work"),
    ])
    .await;
    let list = TaskListController::new(store).await.unwrap();

    list.sort_tasks(SortOption::Priority);
    let ranks: Vec<_> = list.tasks().iter().map(|t| t.priority).collect();
    assert_eq!(ranks, [Priority::Low, Priority::Medium, Priority::High]);

    list.sort_tasks(SortOption::Category);
    list.sort_tasks(SortOption::Date);
    assert_eq!(list.tasks().len(), 3);
}

#[tokio::test]
async fn list_follows_store_changes() {
    let store = seeded_store(&[("Buy milk", "", Priority::Low, "Personal")]).await;
    let list = TaskListController::new(Arc::clone(&store)).await.unwrap();
    let mut rx = list.subscribe();
    let task = list.tasks()[0].clone();

    list.update_task_status(&task).await.unwrap();
    let state = wait_for(&mut rx, |s| s.tasks.first().is_some_and(|t| t.is_done)).await;
    assert_eq!(state.tasks.len(), 1);

    let mut edited = state.tasks[0].clone();
    edited.title = "Buy oat milk".to_string();
    list.update_task(&edited).await.unwrap();
    wait_for(&mut rx, |s| s.tasks.first().is_some_and(|t| t.title == "Buy oat milk")).await;

    list.delete_task(&edited).await.unwrap();
    wait_for(&mut rx, |s| s.tasks.is_empty()).await;
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn search_keeps_a_single_subscription() {
    let store = seeded_store(&[
        ("Buy milk", "", Priority::Low, "Personal"),
        ("Report", "include MILK prices", Priority::High, "Work"),
        ("Gym", "legs day", Priority::Medium, "Personal"),
    ])
    .await;
    let list = TaskListController::new(Arc::clone(&store)).await.unwrap();
    assert_eq!(store.subscriber_count(), 1);

    for _ in 0..5 {
        list.search_tasks("milk").await;
        assert_eq!(store.subscriber_count(), 1);
    }
    let state = list.state();
    assert_eq!(state.query, "milk");
    let found: Vec<_> = state.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(found, ["Buy milk", "Report"]);

    // New matching rows flow into the filtered view.
    let mut rx = list.subscribe();
    store
        .insert(&Task::new("Milkshake", "", Priority::Low, "Other"))
        .await
        .unwrap();
    wait_for(&mut rx, |s| s.tasks.len() == 3).await;

    list.search_tasks("").await;
    assert_eq!(list.tasks().len(), 4);
    assert_eq!(store.subscriber_count(), 1);

    list.close().await;
    assert_eq!(store.subscriber_count(), 0);
}

#[tokio::test]
async fn failed_intent_sets_error_message() {
    let store = seeded_store(&[("Buy milk", "", Priority::Low, "Personal")]).await;
    let list = TaskListController::new(Arc::clone(&store)).await.unwrap();
    let task = list.tasks()[0].clone();

    store.set_unavailable(true);
    list.delete_task(&task).await.unwrap();
    let message = list.state().error_message.unwrap();
    assert!(message.contains("unavailable"), "{message}");
    assert_eq!(list.tasks().len(), 1);

    list.clear_error();
    assert!(list.state().error_message.is_none());
}

#[tokio::test]
async fn failed_search_keeps_following_the_store() {
    let store = Arc::new(FlakyReads::default());
    let list = TaskListController::new(Arc::clone(&store)).await.unwrap();
    let mut rx = list.subscribe();

    store.fail_reads.store(true, Ordering::SeqCst);
    list.search_tasks("milk").await;
    let state = list.state();
    assert!(state.error_message.unwrap().contains("read refused"));
    assert_eq!(state.query, "");
    assert_eq!(store.inner.subscriber_count(), 1);

    store
        .insert(&Task::new("Buy bread", "", Priority::Low, "Personal"))
        .await
        .unwrap();
    let state = wait_for(&mut rx, |s| s.tasks.len() == 1).await;
    assert_eq!(state.tasks[0].title, "Buy bread");
}

#[tokio::test]
async fn dropping_the_list_releases_its_subscription() {
    let store = Arc::new(InMemoryTaskStore::new());
    let list = TaskListController::new(Arc::clone(&store)).await.unwrap();
    drop(list);
    // The aborted feed drops its subscription once the runtime reaps it.
    tokio::time::timeout(Duration::from_secs(5), async {
        while store.subscriber_count() > 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[tokio::test]
async fn category_counts_cover_known_categories() {
    let store = seeded_store(&[
        ("a", "", Priority::Low, "Work"),
        ("b", "", Priority::Low, "Work"),
        ("c", "", Priority::Low, "Personal"),
    ])
    .await;
    let categories = CategoriesController::new(store.as_ref(), known_categories())
        .await
        .unwrap();

    let counts = categories.category_counts();
    assert_eq!(counts.len(), 3);
    assert_eq!(counts["Personal"], 1);
    assert_eq!(counts["Work"], 2);
    assert_eq!(counts["Other"], 0);
}

#[tokio::test]
async fn category_counts_recompute_on_change() {
    let store = seeded_store(&[("a", "", Priority::Low, "Work")]).await;
    let categories = CategoriesController::new(store.as_ref(), known_categories())
        .await
        .unwrap();
    let mut rx = categories.subscribe();

    store
        .insert(&Task::new("b", "", Priority::Low, "Other"))
        .await
        .unwrap();
    let state = wait_for(&mut rx, |s| s.counts["Other"] == 1).await;
    assert_eq!(state.counts["Work"], 1);
    assert_eq!(state.tasks.len(), 2);

    let gone = state.tasks[0].clone();
    store.delete(&gone).await.unwrap();
    let state = wait_for(&mut rx, |s| s.counts["Work"] == 0).await;
    assert_eq!(state.tasks.len(), 1);

    categories.close().await;
    assert_eq!(store.subscriber_count(), 0);
}
