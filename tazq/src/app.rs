//! Application context: the stores and settings every controller is built
//! from.
//!
//! Controllers receive their dependencies explicitly; [`App`] just keeps
//! the shared handles together and hands out new controllers.

use std::sync::Arc;

use tazq_proto::task::DEFAULT_CATEGORIES;

use crate::auth::AuthController;
use crate::identity::{IdentityProvider, IdentityStore, ProfileStore};
use crate::store::{StoreError, TaskStore};
use crate::tasks::{CategoriesController, TaskFormController, TaskListController};

/// Shared handles for one running application.
pub struct App<S: TaskStore, P: IdentityProvider, D: ProfileStore> {
    store: Arc<S>,
    identity: Arc<IdentityStore<P, D>>,
    categories: Vec<String>,
}

impl<S: TaskStore, P: IdentityProvider, D: ProfileStore> App<S, P, D> {
    /// Bundles a task store and an identity store with the built-in
    /// category list.
    #[must_use]
    pub fn new(store: Arc<S>, identity: Arc<IdentityStore<P, D>>) -> Self {
        Self {
            store,
            identity,
            categories: DEFAULT_CATEGORIES.iter().map(ToString::to_string).collect(),
        }
    }

    /// Replaces the known category list.
    #[must_use]
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    /// The shared task store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The shared identity store.
    #[must_use]
    pub const fn identity(&self) -> &Arc<IdentityStore<P, D>> {
        &self.identity
    }

    /// Known categories, in display order.
    #[must_use]
    pub fn category_names(&self) -> &[String] {
        &self.categories
    }

    /// Whether `category` is one of the known categories. Tasks filed
    /// elsewhere are never counted by the categories view.
    #[must_use]
    pub fn is_known_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Builds a task list controller observing every task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the live query cannot start.
    pub async fn task_list(&self) -> Result<TaskListController<S>, StoreError> {
        TaskListController::new(Arc::clone(&self.store)).await
    }

    /// Builds a task creation form with default fields.
    #[must_use]
    pub fn task_form(&self) -> TaskFormController<S> {
        TaskFormController::new(Arc::clone(&self.store))
    }

    /// Builds a categories controller over the configured category list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the live query cannot start.
    pub async fn categories(&self) -> Result<CategoriesController, StoreError> {
        CategoriesController::new(self.store.as_ref(), self.categories.clone()).await
    }

    /// Builds an auth controller in the `Loading` state.
    #[must_use]
    pub fn auth(&self) -> AuthController<P, D> {
        AuthController::new(Arc::clone(&self.identity))
    }
}
