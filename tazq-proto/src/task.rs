//! Task record and form validation rules.
//!
//! A [`Task`] is created in memory by the task form, persisted by a task
//! store (which assigns its [`TaskId`]), then mutated or deleted from the
//! task list. Validation lives here and is applied only before submission;
//! stores never re-validate.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Minimum task title length in characters.
pub const MIN_TITLE_LENGTH: usize = 3;

/// Maximum task description length in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Category assigned to new tasks when the user picks none.
pub const DEFAULT_CATEGORY: &str = "Personal";

/// Built-in category list used when no configuration overrides it.
pub const DEFAULT_CATEGORIES: &[&str] = &["Personal", "Work", "Other"];

/// Row identifier assigned by the task store on insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    /// Identifier of a task that has not been persisted yet.
    pub const UNSAVED: Self = Self(0);

    /// Wraps a raw row id.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw row id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whether a store has assigned this id.
    #[must_use]
    pub const fn is_persisted(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0.to_string())
    }
}

impl FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Task priority. Ordering follows declaration order: `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    /// Can wait.
    Low,
    /// The default for new tasks.
    #[default]
    Medium,
    /// Needs attention first.
    High,
}

impl Priority {
    /// All priorities in rank order.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// The stored name of this priority.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when parsing an unknown priority name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority: {0}")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(UnknownPriority(s.to_string())),
        }
    }
}

/// One user-created to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned id, [`TaskId::UNSAVED`] until inserted.
    pub id: TaskId,
    /// Short title, at least [`MIN_TITLE_LENGTH`] characters when submitted.
    pub title: String,
    /// Free text, at most [`MAX_DESCRIPTION_LENGTH`] characters when submitted.
    pub description: String,
    /// Priority tag.
    pub priority: Priority,
    /// Name of one of the known categories.
    pub category: String,
    /// Completion flag.
    pub is_done: bool,
    /// Creation time in milliseconds since epoch. Only used for sorting.
    pub date_created: i64,
}

impl Task {
    /// Builds an unsaved, not-done task stamped with the current time.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: TaskId::UNSAVED,
            title: title.into(),
            description: description.into(),
            priority,
            category: category.into(),
            is_done: false,
            date_created: now_ms(),
        }
    }
}

/// Current wall-clock time in milliseconds since epoch.
fn now_ms() -> i64 {
    i64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    )
    .unwrap_or(i64::MAX)
}

/// Reasons a form field is not acceptable for submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The title is empty.
    #[error("Title cannot be empty")]
    TitleEmpty,
    /// The title is shorter than [`MIN_TITLE_LENGTH`].
    #[error("Title must be at least 3 characters")]
    TitleTooShort,
    /// The description exceeds [`MAX_DESCRIPTION_LENGTH`].
    #[error("Description must be less than 500 characters")]
    DescriptionTooLong,
}

/// Returns `true` iff `title` is non-empty and at least
/// [`MIN_TITLE_LENGTH`] characters long.
#[must_use]
pub fn validate_title(title: &str) -> bool {
    title_error(title).is_none()
}

/// Returns `true` iff `description` is at most [`MAX_DESCRIPTION_LENGTH`]
/// characters long. Empty is allowed.
#[must_use]
pub fn validate_description(description: &str) -> bool {
    description_error(description).is_none()
}

/// A form is submittable only when every field validates.
#[must_use]
pub const fn is_form_valid(title_valid: bool, description_valid: bool) -> bool {
    title_valid && description_valid
}

/// The reason `title` fails validation, if any.
#[must_use]
pub fn title_error(title: &str) -> Option<ValidationError> {
    if title.is_empty() {
        Some(ValidationError::TitleEmpty)
    } else if title.chars().count() < MIN_TITLE_LENGTH {
        Some(ValidationError::TitleTooShort)
    } else {
        None
    }
}

/// The reason `description` fails validation, if any.
#[must_use]
pub fn description_error(description: &str) -> Option<ValidationError> {
    (description.chars().count() > MAX_DESCRIPTION_LENGTH)
        .then_some(ValidationError::DescriptionTooLong)
}
