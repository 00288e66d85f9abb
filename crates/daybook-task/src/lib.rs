//! Task store over the `KvStore` contract plus the read pipeline
//! (filter, fuzzy search, sort) consumed by the CLI and the dashboard.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use daybook_core::{
    storage::{KvStore, KvStoreError},
    tasks::{Priority, SortKey, SortState, Task},
};
use tracing::instrument;
use uuid::Uuid;

pub mod query;
pub mod search;

const TASKS_KEY: &str = "tasks";
const SORT_STATE_KEY: &str = "sort-state";

/// Input for `TaskStore::add`. Only the title is required.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Task collection backed by a `KvStore`. Every mutation persists the whole
/// collection immediately, so the stored blob is always current.
///
/// Invalid input (blank title) and unknown ids are silent no-ops surfaced as
/// `None`/`false` returns; only storage failures are errors.
pub struct TaskStore<S: KvStore> {
    store: Arc<S>,
}

impl<S: KvStore> TaskStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    async fn load(&self) -> Result<Vec<Task>> {
        match self.store.get(TASKS_KEY).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(KvStoreError::NotFound { .. }) => Ok(Vec::new()),
            Err(err) => Err(anyhow::anyhow!(err.to_string())),
        }
    }

    async fn save(&self, tasks: &[Task]) -> Result<()> {
        let bytes = serde_json::to_vec(tasks)?;
        self.store
            .put(TASKS_KEY, &bytes)
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Task>> {
        self.load().await
    }

    /// Append a new task. A title that is blank after trimming leaves the
    /// collection unchanged and returns `None`.
    #[instrument(skip(self, draft))]
    pub async fn add(&self, draft: TaskDraft) -> Result<Option<Task>> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Ok(None);
        }

        let description = draft
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let mut task = Task::new(title, description, draft.tags);
        if let Some(priority) = draft.priority {
            task.priority = priority;
        }
        task.due_date = draft.due_date;

        let mut tasks = self.load().await?;
        tasks.push(task.clone());
        self.save(&tasks).await?;
        Ok(Some(task))
    }

    /// Remove the task with the given id. Unknown ids are a no-op.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tasks = self.load().await?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Ok(false);
        }
        self.save(&tasks).await?;
        Ok(true)
    }

    /// Flip completion for the task with the given id.
    #[instrument(skip(self))]
    pub async fn toggle(&self, id: Uuid) -> Result<Option<Task>> {
        let mut tasks = self.load().await?;
        let mut updated: Option<Task> = None;
        for task in &mut tasks {
            if task.id == id {
                task.completed = !task.completed;
                updated = Some(task.clone());
                break;
            }
        }
        if updated.is_some() {
            self.save(&tasks).await?;
        }
        Ok(updated)
    }

    /// Replace the title of the task with the given id. A replacement that
    /// is blank after trimming abandons the edit and keeps the stored title.
    #[instrument(skip(self, new_title))]
    pub async fn rename(&self, id: Uuid, new_title: &str) -> Result<Option<Task>> {
        let mut tasks = self.load().await?;
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };

        let trimmed = new_title.trim();
        if trimmed.is_empty() || trimmed == task.title {
            return Ok(Some(task.clone()));
        }

        task.title = trimmed.to_string();
        let updated = task.clone();
        self.save(&tasks).await?;
        Ok(Some(updated))
    }

    /// Replace the whole collection with an empty one.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<()> {
        self.save(&[]).await
    }

    /// Read the persisted sort preference, defaulting when absent.
    #[instrument(skip(self))]
    pub async fn sort_state(&self) -> Result<SortState> {
        match self.store.get(SORT_STATE_KEY).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(KvStoreError::NotFound { .. }) => Ok(SortState::default()),
            Err(err) => Err(anyhow::anyhow!(err.to_string())),
        }
    }

    /// Select a sort column, toggling direction on reselect, and persist.
    #[instrument(skip(self))]
    pub async fn select_sort(&self, key: SortKey) -> Result<SortState> {
        let mut state = self.sort_state().await?;
        state.select(key);
        let bytes = serde_json::to_vec(&state)?;
        self.store
            .put(SORT_STATE_KEY, &bytes)
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use daybook_core::{
        storage::{InMemoryKvStore, KvStore},
        tasks::{Priority, SortDirection},
    };

    use super::*;

    #[tokio::test]
    async fn adds_and_lists_tasks() {
        let store = TaskStore::new(InMemoryKvStore::new());
        let draft = TaskDraft {
            title: "  Water the plants  ".into(),
            description: Some("front and back".into()),
            tags: vec!["garden".into()],
            ..TaskDraft::default()
        };
        let created = store.add(draft).await.expect("add").expect("created");
        assert_eq!(created.title, "Water the plants");
        assert_eq!(created.priority, Priority::Medium);
        assert!(!created.completed);

        let tasks = store.list().await.expect("list");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, created.id);
        assert_eq!(tasks[0].description.as_deref(), Some("front and back"));
    }

    #[tokio::test]
    async fn blank_title_leaves_collection_unchanged() {
        let store = TaskStore::new(InMemoryKvStore::new());
        let result = store.add(TaskDraft::new("   \t ")).await.expect("add");
        assert!(result.is_none());
        assert!(store.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn blank_description_becomes_none() {
        let store = TaskStore::new(InMemoryKvStore::new());
        let draft = TaskDraft {
            title: "t".into(),
            description: Some("   ".into()),
            ..TaskDraft::default()
        };
        let created = store.add(draft).await.expect("add").expect("created");
        assert_eq!(created.description, None);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_record() {
        let store = TaskStore::new(InMemoryKvStore::new());
        let a = store.add(TaskDraft::new("a")).await.unwrap().unwrap();
        let b = store.add(TaskDraft::new("b")).await.unwrap().unwrap();
        let c = store.add(TaskDraft::new("c")).await.unwrap().unwrap();

        assert!(store.delete(b.id).await.expect("delete"));

        let remaining = store.list().await.expect("list");
        assert_eq!(remaining.len(), 2);
        // The survivors are untouched, only their positions shift.
        assert_eq!(remaining[0], a);
        assert_eq!(remaining[1], c);
    }

    #[tokio::test]
    async fn delete_unknown_id_is_a_no_op() {
        let store = TaskStore::new(InMemoryKvStore::new());
        store.add(TaskDraft::new("a")).await.unwrap();
        assert!(!store.delete(Uuid::new_v4()).await.expect("delete"));
        assert_eq!(store.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn toggle_flips_completion_both_ways() {
        let store = TaskStore::new(InMemoryKvStore::new());
        let task = store.add(TaskDraft::new("a")).await.unwrap().unwrap();

        let toggled = store.toggle(task.id).await.expect("toggle").unwrap();
        assert!(toggled.completed);
        let toggled = store.toggle(task.id).await.expect("toggle").unwrap();
        assert!(!toggled.completed);

        assert!(store.toggle(Uuid::new_v4()).await.expect("toggle").is_none());
    }

    #[tokio::test]
    async fn rename_with_blank_title_keeps_original() {
        let store = TaskStore::new(InMemoryKvStore::new());
        let task = store.add(TaskDraft::new("original")).await.unwrap().unwrap();

        let after = store.rename(task.id, "   ").await.expect("rename").unwrap();
        assert_eq!(after.title, "original");

        let after = store
            .rename(task.id, " updated ")
            .await
            .expect("rename")
            .unwrap();
        assert_eq!(after.title, "updated");
        assert_eq!(store.list().await.unwrap()[0].title, "updated");
    }

    #[tokio::test]
    async fn clear_all_replaces_collection_wholesale() {
        let store = TaskStore::new(InMemoryKvStore::new());
        store.add(TaskDraft::new("a")).await.unwrap();
        store.add(TaskDraft::new("b")).await.unwrap();
        store.clear_all().await.expect("clear");
        assert!(store.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn sort_state_persists_and_toggles() {
        let store = TaskStore::new(InMemoryKvStore::new());
        assert_eq!(store.sort_state().await.expect("default"), SortState::default());

        let state = store.select_sort(SortKey::DueDate).await.expect("select");
        assert_eq!(state.key, SortKey::DueDate);
        assert_eq!(state.direction, SortDirection::Ascending);

        let state = store.select_sort(SortKey::DueDate).await.expect("reselect");
        assert_eq!(state.direction, SortDirection::Descending);

        // Survives a reload through the persisted blob.
        assert_eq!(store.sort_state().await.expect("reload"), state);
    }

    #[tokio::test]
    async fn legacy_records_normalize_on_load() {
        let kv = InMemoryKvStore::new();
        // A record persisted by an earlier schema: no id, priority, or due date.
        kv.put("tasks", br#"[{"title":"old","completed":true}]"#)
            .await
            .expect("seed");

        let store = TaskStore::new(kv);
        let tasks = store.list().await.expect("list");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "old");
        assert!(tasks[0].completed);
        assert_eq!(tasks[0].priority, Priority::Medium);
        assert_eq!(tasks[0].due_date, None);
        assert!(tasks[0].tags.is_empty());
    }
}
