//! The read pipeline: filter, staged fuzzy search, then sort.

use std::cmp::Ordering;

use chrono::NaiveDate;
use daybook_core::tasks::{Filter, SortDirection, SortKey, SortState, Task};

use crate::search::fuzzy_match;

/// Caller-held view state driving the pipeline.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub filter: Filter,
    /// Live search text. A non-empty query always produces a match count.
    pub query: String,
    /// The search-activation toggle: rows are narrowed to the matches only
    /// once the search is explicitly applied.
    pub search_applied: bool,
    pub sort: SortState,
}

impl TaskQuery {
    /// Reset the query and the activation toggle together.
    pub fn clear_search(&mut self) {
        self.query.clear();
        self.search_applied = false;
    }
}

/// Pipeline output: the rows to display plus the counts the affordance
/// labels need (active/completed totals, live match count).
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub rows: Vec<Task>,
    pub match_count: Option<usize>,
    pub active: usize,
    pub completed: usize,
}

pub fn run_query(tasks: &[Task], query: &TaskQuery) -> QueryOutcome {
    let active = tasks.iter().filter(|t| !t.completed).count();
    let completed = tasks.len() - active;

    let mut rows: Vec<Task> = tasks
        .iter()
        .filter(|t| query.filter.matches(t))
        .cloned()
        .collect();

    let needle = query.query.trim();
    let match_count = if needle.is_empty() {
        None
    } else {
        let matches: Vec<Task> = rows
            .iter()
            .filter(|t| task_matches(t, needle))
            .cloned()
            .collect();
        let count = matches.len();
        if query.search_applied {
            rows = matches;
        }
        Some(count)
    };

    sort_tasks(&mut rows, query.sort);

    QueryOutcome {
        rows,
        match_count,
        active,
        completed,
    }
}

/// A task matches when the query fuzzily hits its title, description, or
/// any tag.
pub fn task_matches(task: &Task, query: &str) -> bool {
    fuzzy_match(&task.title, query)
        || task
            .description
            .as_deref()
            .is_some_and(|d| fuzzy_match(d, query))
        || task.tags.iter().any(|tag| fuzzy_match(tag, query))
}

pub fn sort_tasks(tasks: &mut [Task], sort: SortState) {
    tasks.sort_by(|a, b| compare(a, b, sort));
}

fn compare(a: &Task, b: &Task, sort: SortState) -> Ordering {
    match sort.key {
        // Case-insensitive lexicographic, not locale-aware collation.
        SortKey::Title => directed(
            a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            sort.direction,
        ),
        SortKey::Created => directed(a.created_at.cmp(&b.created_at), sort.direction),
        SortKey::Priority => directed(
            a.priority.rank().cmp(&b.priority.rank()),
            sort.direction,
        ),
        SortKey::Status => directed(a.completed.cmp(&b.completed), sort.direction),
        // Tasks without a due date sort last regardless of direction.
        SortKey::DueDate => match (a.due_date, b.due_date) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(da), Some(db)) => directed(da.cmp(&db), sort.direction),
        },
    }
}

fn directed(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ord,
        SortDirection::Descending => ord.reverse(),
    }
}

/// Presentation-only overdue flag: a due date strictly before the start of
/// the current day on an incomplete task. `today` is injected so callers
/// and tests agree on what "now" means.
pub fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    !task.completed && task.due_date.is_some_and(|due| due < today)
}

#[cfg(test)]
mod tests {
    use daybook_core::tasks::Priority;

    use super::*;

    fn task(title: &str) -> Task {
        Task::new(title.into(), None, vec![])
    }

    fn titles(rows: &[Task]) -> Vec<&str> {
        rows.iter().map(|t| t.title.as_str()).collect()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("date")
    }

    #[test]
    fn sorts_by_title_and_reverses_on_toggle() {
        let tasks = vec![task("b"), task("a"), task("c")];
        let mut query = TaskQuery::default();

        let outcome = run_query(&tasks, &query);
        assert_eq!(titles(&outcome.rows), vec!["a", "b", "c"]);

        query.sort.select(SortKey::Title);
        let outcome = run_query(&tasks, &query);
        assert_eq!(titles(&outcome.rows), vec!["c", "b", "a"]);
    }

    #[test]
    fn missing_due_date_sorts_last_in_both_directions() {
        let mut with_due = task("due");
        with_due.due_date = Some(date("2026-01-10"));
        let mut later = task("later");
        later.due_date = Some(date("2026-03-01"));
        let without = task("none");

        let tasks = vec![without.clone(), later.clone(), with_due.clone()];
        let mut query = TaskQuery {
            sort: SortState {
                key: SortKey::DueDate,
                direction: SortDirection::Ascending,
            },
            ..TaskQuery::default()
        };

        let outcome = run_query(&tasks, &query);
        assert_eq!(titles(&outcome.rows), vec!["due", "later", "none"]);

        query.sort.direction = SortDirection::Descending;
        let outcome = run_query(&tasks, &query);
        assert_eq!(titles(&outcome.rows), vec!["later", "due", "none"]);
    }

    #[test]
    fn sorts_by_priority_rank() {
        let mut low = task("low");
        low.priority = Priority::Low;
        let mut high = task("high");
        high.priority = Priority::High;
        let medium = task("medium");

        let tasks = vec![low, medium, high];
        let query = TaskQuery {
            sort: SortState {
                key: SortKey::Priority,
                direction: SortDirection::Ascending,
            },
            ..TaskQuery::default()
        };
        let outcome = run_query(&tasks, &query);
        assert_eq!(titles(&outcome.rows), vec!["high", "medium", "low"]);
    }

    #[test]
    fn status_sort_puts_incomplete_first_ascending() {
        let mut done = task("done");
        done.completed = true;
        let open = task("open");

        let tasks = vec![done, open];
        let query = TaskQuery {
            sort: SortState {
                key: SortKey::Status,
                direction: SortDirection::Ascending,
            },
            ..TaskQuery::default()
        };
        let outcome = run_query(&tasks, &query);
        assert_eq!(titles(&outcome.rows), vec!["open", "done"]);
    }

    #[test]
    fn filter_narrows_rows_and_reports_counts() {
        let mut done = task("done");
        done.completed = true;
        let tasks = vec![done, task("open-1"), task("open-2")];

        let query = TaskQuery {
            filter: Filter::Active,
            ..TaskQuery::default()
        };
        let outcome = run_query(&tasks, &query);
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.active, 2);
        assert_eq!(outcome.completed, 1);
    }

    #[test]
    fn typing_counts_matches_without_narrowing_until_applied() {
        let tasks = vec![task("groceries"), task("laundry")];
        let mut query = TaskQuery {
            query: "grocer".into(),
            ..TaskQuery::default()
        };

        let outcome = run_query(&tasks, &query);
        assert_eq!(outcome.match_count, Some(1));
        assert_eq!(outcome.rows.len(), 2, "staged search must not narrow yet");

        query.search_applied = true;
        let outcome = run_query(&tasks, &query);
        assert_eq!(outcome.match_count, Some(1));
        assert_eq!(titles(&outcome.rows), vec!["groceries"]);
    }

    #[test]
    fn search_covers_description_and_tags() {
        let mut by_desc = task("one");
        by_desc.description = Some("call the plumber".into());
        let mut by_tag = task("two");
        by_tag.tags = vec!["errand".into()];
        let tasks = vec![by_desc, by_tag, task("three")];

        let query = TaskQuery {
            query: "plumber".into(),
            search_applied: true,
            ..TaskQuery::default()
        };
        assert_eq!(titles(&run_query(&tasks, &query).rows), vec!["one"]);

        let query = TaskQuery {
            query: "errand".into(),
            search_applied: true,
            ..TaskQuery::default()
        };
        assert_eq!(titles(&run_query(&tasks, &query).rows), vec!["two"]);
    }

    #[test]
    fn clear_search_resets_query_and_toggle() {
        let mut query = TaskQuery {
            query: "x".into(),
            search_applied: true,
            ..TaskQuery::default()
        };
        query.clear_search();
        assert!(query.query.is_empty());
        assert!(!query.search_applied);
        assert_eq!(run_query(&[task("a")], &query).match_count, None);
    }

    #[test]
    fn overdue_requires_past_due_date_and_incomplete() {
        let today = date("2026-08-30");
        let mut t = task("t");
        t.due_date = Some(date("2026-08-29"));
        assert!(is_overdue(&t, today));

        t.completed = true;
        assert!(!is_overdue(&t, today));

        t.completed = false;
        t.due_date = Some(today);
        assert!(!is_overdue(&t, today), "due today is not overdue");

        t.due_date = None;
        assert!(!is_overdue(&t, today));
    }
}
