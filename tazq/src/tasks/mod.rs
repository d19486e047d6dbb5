//! Task controllers.
//!
//! Each controller owns its observable state in a `tokio::sync::watch`
//! channel and mediates between user intents and a [`TaskStore`]:
//! - [`TaskListController`]: the observed task list, search and sort
//! - [`TaskFormController`]: the creation form and its validation
//! - [`CategoriesController`]: per-category task counts
//!
//! Store calls run on spawned tasks; failures land in the controller's
//! `error_message` and never terminate it. Live subscriptions are released
//! on `close()` or drop.
//!
//! [`TaskStore`]: crate::store::TaskStore

pub mod categories;
pub mod form;
pub mod list;
pub mod view;

pub use categories::{CategoriesController, CategoriesState};
pub use form::{TaskForm, TaskFormController};
pub use list::{TaskListController, TaskListState};
pub use view::{SortOption, category_counts, filter_tasks, sort_tasks};

/// Display text of `error`, or `fallback` when that text is empty.
pub(crate) fn message_or(error: &impl std::fmt::Display, fallback: &str) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
