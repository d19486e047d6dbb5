//! Task creation form.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use tazq_proto::task::{
    DEFAULT_CATEGORY, Priority, Task, description_error, is_form_valid, title_error,
    validate_description, validate_title,
};

use super::message_or;
use crate::store::TaskStore;

const INVALID_FORM: &str = "Please fix the errors before submitting";
const INSERT_FALLBACK: &str = "Failed to create task";

/// Observable state of the creation form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    /// Title as typed.
    pub title: String,
    /// Description as typed. May be empty.
    pub description: String,
    /// Chosen priority, `Medium` by default.
    pub priority: Priority,
    /// Chosen category, `Personal` by default.
    pub category: String,
    /// Whether `title` passes validation.
    pub title_valid: bool,
    /// Whether `description` passes validation.
    pub description_valid: bool,
    /// Set once the user has edited the title.
    pub title_touched: bool,
    /// Set once the user has edited the description.
    pub description_touched: bool,
    /// An insert is in flight.
    pub is_loading: bool,
    /// Why the last submission was refused or failed, until cleared.
    pub error_message: Option<String>,
    /// The last submission was stored.
    pub show_confirmation: bool,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            priority: Priority::default(),
            category: DEFAULT_CATEGORY.to_string(),
            title_valid: validate_title(""),
            description_valid: validate_description(""),
            title_touched: false,
            description_touched: false,
            is_loading: false,
            error_message: None,
            show_confirmation: false,
        }
    }
}

/// Drives the creation form and submits it to the store.
pub struct TaskFormController<S: TaskStore> {
    store: Arc<S>,
    state: Arc<watch::Sender<TaskForm>>,
}

impl<S: TaskStore> TaskFormController<S> {
    /// Creates a controller with an empty form.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            state: Arc::new(watch::Sender::new(TaskForm::default())),
        }
    }

    /// Sets the title, marks it touched and re-validates it.
    pub fn update_title(&self, title: &str) {
        self.state.send_modify(|f| {
            f.title = title.to_string();
            f.title_valid = validate_title(title);
            f.title_touched = true;
        });
    }

    /// Sets the description, marks it touched and re-validates it.
    pub fn update_description(&self, description: &str) {
        self.state.send_modify(|f| {
            f.description = description.to_string();
            f.description_valid = validate_description(description);
            f.description_touched = true;
        });
    }

    /// Sets the priority. Always valid.
    pub fn update_priority(&self, priority: Priority) {
        self.state.send_modify(|f| f.priority = priority);
    }

    /// Sets the category. Not checked against the known list.
    pub fn update_category(&self, category: &str) {
        self.state.send_modify(|f| f.category = category.to_string());
    }

    /// Loads the fields of an existing task. Validation re-runs but no
    /// field is marked touched.
    pub fn prefill(&self, task: &Task) {
        self.state.send_modify(|f| {
            f.title.clone_from(&task.title);
            f.description.clone_from(&task.description);
            f.priority = task.priority;
            f.category.clone_from(&task.category);
            f.title_valid = validate_title(&task.title);
            f.description_valid = validate_description(&task.description);
        });
    }

    /// Whether both fields currently validate.
    #[must_use]
    pub fn is_form_valid(&self) -> bool {
        let form = self.state.borrow();
        is_form_valid(form.title_valid, form.description_valid)
    }

    /// Reason the title is rejected, only once the user has edited it.
    #[must_use]
    pub fn title_error_message(&self) -> Option<String> {
        let form = self.state.borrow();
        if !form.title_touched {
            return None;
        }
        title_error(&form.title).map(|e| e.to_string())
    }

    /// Reason the description is rejected, only once the user has edited it.
    #[must_use]
    pub fn description_error_message(&self) -> Option<String> {
        let form = self.state.borrow();
        if !form.description_touched {
            return None;
        }
        description_error(&form.description).map(|e| e.to_string())
    }

    /// Submits the form.
    ///
    /// An invalid form only sets `error_message` and returns `None`; the
    /// store is not called. Otherwise the insert runs on a spawned task
    /// whose handle is returned. On success the fields reset and
    /// `show_confirmation` is set; on failure `error_message` carries the
    /// reason. `is_loading` is cleared either way, including when the task
    /// is aborted.
    pub fn add_task(&self) -> Option<JoinHandle<()>> {
        let form = self.state.borrow().clone();
        if !is_form_valid(form.title_valid, form.description_valid) {
            self.state.send_modify(|f| f.error_message = Some(INVALID_FORM.to_string()));
            return None;
        }

        self.state.send_modify(|f| {
            f.is_loading = true;
            f.error_message = None;
        });
        let task = Task::new(form.title, form.description, form.priority, form.category);
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        Some(tokio::spawn(async move {
            let _loading = LoadingGuard(Arc::clone(&state));
            match store.insert(&task).await {
                Ok(id) => {
                    tracing::debug!(task_id = %id, "task created");
                    state.send_modify(|f| {
                        *f = TaskForm {
                            is_loading: f.is_loading,
                            show_confirmation: true,
                            ..TaskForm::default()
                        };
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "task creation failed");
                    state.send_modify(|f| f.error_message = Some(message_or(&e, INSERT_FALLBACK)));
                }
            }
        }))
    }

    /// Dismisses the "task added" confirmation.
    pub fn hide_confirmation(&self) {
        self.state.send_modify(|f| f.show_confirmation = false);
    }

    /// Dismisses the current error message.
    pub fn clear_error(&self) {
        self.state.send_modify(|f| f.error_message = None);
    }

    /// Receiver of every form change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TaskForm> {
        self.state.subscribe()
    }

    /// Copy of the current form.
    #[must_use]
    pub fn state(&self) -> TaskForm {
        self.state.borrow().clone()
    }
}

/// Clears `is_loading` when the submission task ends, however it ends.
struct LoadingGuard(Arc<watch::Sender<TaskForm>>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.send_modify(|f| f.is_loading = false);
    }
}
