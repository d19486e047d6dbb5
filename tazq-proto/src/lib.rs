//! Shared data model for `Tazq`: tasks, validation, users, and the identity
//! service's JSON bodies.

pub mod identity;
pub mod task;
pub mod user;

pub use task::{Priority, Task, TaskId, ValidationError};
pub use user::{AuthState, User};
