//! Pure transforms over loaded task lists: search filter, sort orders and
//! category counts.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tazq_proto::task::Task;

/// Client-side sort orders for the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOption {
    /// Newest first.
    Date,
    /// Lowest priority rank first (`LOW`, `MEDIUM`, `HIGH`).
    Priority,
    /// Category name, lexicographic.
    Category,
}

impl SortOption {
    /// Every sort order.
    pub const ALL: [Self; 3] = [Self::Date, Self::Priority, Self::Category];

    /// Lower-case name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Priority => "priority",
            Self::Category => "category",
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(Self::Date),
            "priority" => Ok(Self::Priority),
            "category" => Ok(Self::Category),
            other => Err(format!(
                "unknown sort option: {other} (expected date, priority or category)"
            )),
        }
    }
}

/// Tasks whose title or description contains `query`, ignoring case.
///
/// An empty query keeps every task. Order is preserved.
#[must_use]
pub fn filter_tasks(tasks: &[Task], query: &str) -> Vec<Task> {
    if query.is_empty() {
        return tasks.to_vec();
    }
    let needle = query.to_lowercase();
    tasks
        .iter()
        .filter(|t| {
            t.title.to_lowercase().contains(&needle)
                || t.description.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Re-orders `tasks` in place. The sort is stable, so ties keep their
/// current relative order.
pub fn sort_tasks(tasks: &mut [Task], option: SortOption) {
    match option {
        SortOption::Date => tasks.sort_by(|a, b| b.date_created.cmp(&a.date_created)),
        SortOption::Priority => tasks.sort_by_key(|t| t.priority),
        SortOption::Category => tasks.sort_by(|a, b| a.category.cmp(&b.category)),
    }
}

/// Number of tasks per known category.
///
/// Every name in `categories` gets an entry, zero included. Tasks whose
/// category is not in the list are not counted.
#[must_use]
pub fn category_counts(tasks: &[Task], categories: &[String]) -> BTreeMap<String, usize> {
    categories
        .iter()
        .map(|name| (name.clone(), tasks.iter().filter(|t| &t.category == name).count()))
        .collect()
}
