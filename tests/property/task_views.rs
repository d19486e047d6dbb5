//! Property-based tests for the task list transforms.
//!
//! Uses proptest to verify:
//! 1. Every sort order is a permutation that respects its key.
//! 2. Search keeps exactly the matching tasks, in order.
//! 3. Category counts cover every known category and never exceed the list.

use proptest::prelude::*;
use tazq::tasks::{SortOption, category_counts, filter_tasks, sort_tasks};
use tazq_proto::task::{Priority, Task, TaskId};

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::Medium), Just(Priority::High)]
}

fn arb_category() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Personal".to_string()),
        Just("Work".to_string()),
        Just("Other".to_string()),
        Just("Garden".to_string()),
    ]
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        1..10_000_i64,
        "[a-zA-Z ]{0,12}",
        "[a-zA-Z ]{0,20}",
        arb_priority(),
        arb_category(),
        any::<bool>(),
        0..1_000_000_i64,
    )
        .prop_map(|(id, title, description, priority, category, is_done, date_created)| Task {
            id: TaskId::new(id),
            title,
            description,
            priority,
            category,
            is_done,
            date_created,
        })
}

fn arb_sort() -> impl Strategy<Value = SortOption> {
    prop_oneof![
        Just(SortOption::Date),
        Just(SortOption::Priority),
        Just(SortOption::Category),
    ]
}

fn sorted_ids(tasks: &[Task]) -> Vec<TaskId> {
    let mut ids: Vec<_> = tasks.iter().map(|t| t.id).collect();
    ids.sort();
    ids
}

proptest! {
    #[test]
    fn sort_is_a_permutation_ordered_by_key(
        tasks in prop::collection::vec(arb_task(), 0..20),
        option in arb_sort(),
    ) {
        let mut sorted = tasks.clone();
        sort_tasks(&mut sorted, option);
        prop_assert_eq!(sorted_ids(&sorted), sorted_ids(&tasks));
        for pair in sorted.windows(2) {
            match option {
                SortOption::Date => prop_assert!(pair[0].date_created >= pair[1].date_created),
                SortOption::Priority => prop_assert!(pair[0].priority <= pair[1].priority),
                SortOption::Category => prop_assert!(pair[0].category <= pair[1].category),
            }
        }
    }

    #[test]
    fn search_keeps_exactly_the_matches(
        tasks in prop::collection::vec(arb_task(), 0..20),
        query in "[a-zA-Z]{0,3}",
    ) {
        let found = filter_tasks(&tasks, &query);
        let needle = query.to_lowercase();
        let expected: Vec<_> = tasks
            .iter()
            .filter(|t| {
                t.title.to_lowercase().contains(&needle)
                    || t.description.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn empty_search_is_identity(tasks in prop::collection::vec(arb_task(), 0..20)) {
        prop_assert_eq!(filter_tasks(&tasks, ""), tasks);
    }

    #[test]
    fn counts_cover_known_categories(tasks in prop::collection::vec(arb_task(), 0..20)) {
        let known: Vec<String> = ["Personal", "Work", "Other"].map(String::from).to_vec();
        let counts = category_counts(&tasks, &known);
        prop_assert_eq!(counts.len(), known.len());
        let total: usize = counts.values().sum();
        let unknown = tasks.iter().filter(|t| t.category == "Garden").count();
        prop_assert_eq!(total + unknown, tasks.len());
    }
}
