use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task priority. High ranks before Medium before Low in ascending sorts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Priority {
    /// Numeric rank used by comparators (smaller sorts first ascending).
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Task entity.
///
/// Every field except `title` carries a serde default so records persisted
/// by earlier schema versions (no id, no priority, no due date) normalize on
/// load instead of failing the whole collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl Task {
    pub fn new(title: String, description: Option<String>, tags: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            tags,
            completed: false,
            created_at: Utc::now(),
            priority: Priority::default(),
            due_date: None,
        }
    }
}

/// Completion filter for the displayed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }

    /// Short name used for labels and CLI flags.
    pub fn label(&self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        }
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" | "done" => Ok(Filter::Completed),
            other => Err(format!("unknown filter: {other}")),
        }
    }
}

/// Column the task list is sorted by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    Title,
    Created,
    DueDate,
    Priority,
    Status,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "title" => Ok(SortKey::Title),
            "created" | "date" => Ok(SortKey::Created),
            "due" | "due-date" => Ok(SortKey::DueDate),
            "priority" => Ok(SortKey::Priority),
            "status" => Ok(SortKey::Status),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Persisted sort preference. Re-selecting the current key flips the
/// direction; selecting a different key resets to ascending.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::Title,
            direction: SortDirection::Ascending,
        }
    }
}

impl SortState {
    pub fn select(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.toggled();
        } else {
            self.key = key;
            self.direction = SortDirection::Ascending;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_record_normalizes_with_defaults() {
        let task: Task = serde_json::from_str(r#"{"title":"buy milk"}"#).expect("parse");
        assert_eq!(task.title, "buy milk");
        assert_eq!(task.description, None);
        assert!(task.tags.is_empty());
        assert!(!task.completed);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn normalization_is_idempotent() {
        let task: Task = serde_json::from_str(r#"{"title":"buy milk"}"#).expect("parse");
        let json = serde_json::to_string(&task).expect("serialize");
        let reparsed: Task = serde_json::from_str(&json).expect("reparse");
        assert_eq!(reparsed, task);
    }

    #[test]
    fn priority_rank_orders_high_first() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn filter_partitions_by_completion() {
        let mut task = Task::new("t".into(), None, vec![]);
        assert!(Filter::All.matches(&task));
        assert!(Filter::Active.matches(&task));
        assert!(!Filter::Completed.matches(&task));

        task.completed = true;
        assert!(Filter::All.matches(&task));
        assert!(!Filter::Active.matches(&task));
        assert!(Filter::Completed.matches(&task));
    }

    #[test]
    fn reselecting_sort_key_toggles_direction() {
        let mut state = SortState::default();
        assert_eq!(state.key, SortKey::Title);
        assert_eq!(state.direction, SortDirection::Ascending);

        state.select(SortKey::Title);
        assert_eq!(state.direction, SortDirection::Descending);

        state.select(SortKey::DueDate);
        assert_eq!(state.key, SortKey::DueDate);
        assert_eq!(state.direction, SortDirection::Ascending);
    }
}
