use chrono::Local;
use color_eyre::Result;
use daybook_core::storage::KvStore;
use daybook_core::tasks::{SortDirection, SortState, Task};
use daybook_task::{
    query::{is_overdue, run_query, TaskQuery},
    TaskDraft, TaskStore,
};

use crate::{
    cli::{TaskCommand, ViewArgs},
    config, storage,
};

/// Execute a task subcommand against the file-backed store.
pub async fn handle(cmd: TaskCommand, config: &config::Config) -> Result<()> {
    let store = TaskStore::new(storage::store_from_config(config)?);

    match cmd {
        TaskCommand::List { view } => {
            let tasks = store
                .list()
                .await
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            let query = view_query(&store, &view).await?;
            let outcome = run_query(&tasks, &query);

            if let Some(count) = outcome.match_count {
                println!("{count} match(es) for \"{}\"", query.query.trim());
            }
            if outcome.rows.is_empty() {
                println!("No tasks here. Add one with `daybook task add <title>`.");
                return Ok(());
            }

            println!(
                "{} task(s) shown ({} active, {} completed)",
                outcome.rows.len(),
                outcome.active,
                outcome.completed
            );
            let today = Local::now().date_naive();
            for (row, task) in outcome.rows.iter().enumerate() {
                print_row(row + 1, task, is_overdue(task, today));
            }
        }
        TaskCommand::Add {
            title,
            description,
            tags,
            due,
            priority,
        } => {
            let draft = TaskDraft {
                title,
                description,
                tags,
                priority: Some(priority),
                due_date: due,
            };
            match store
                .add(draft)
                .await
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?
            {
                Some(task) => println!("Created task: {}", task.title),
                None => println!("Nothing added: a task needs a non-empty title."),
            }
        }
        TaskCommand::Done { number, view } => {
            let Some(task) = resolve_row(&store, &view, number).await? else {
                println!("No such row: {number}");
                return Ok(());
            };
            let toggled = store
                .toggle(task.id)
                .await
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            if let Some(task) = toggled {
                if task.completed {
                    println!("Marked done: {}", task.title);
                } else {
                    println!("Reopened: {}", task.title);
                }
            }
        }
        TaskCommand::Edit {
            number,
            title,
            view,
        } => {
            let Some(task) = resolve_row(&store, &view, number).await? else {
                println!("No such row: {number}");
                return Ok(());
            };
            let renamed = store
                .rename(task.id, &title)
                .await
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            if let Some(after) = renamed {
                if after.title == task.title {
                    println!("Title unchanged: {}", after.title);
                } else {
                    println!("Renamed to: {}", after.title);
                }
            }
        }
        TaskCommand::Delete { number, view } => {
            let Some(task) = resolve_row(&store, &view, number).await? else {
                println!("No such row: {number}");
                return Ok(());
            };
            store
                .delete(task.id)
                .await
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            println!("Deleted: {}", task.title);
        }
        TaskCommand::Clear { yes } => {
            if !yes {
                println!("Refusing to delete every task without --yes.");
                return Ok(());
            }
            store
                .clear_all()
                .await
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            println!("Cleared all tasks.");
        }
        TaskCommand::SortBy { key } => {
            let state = store
                .select_sort(key)
                .await
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            println!(
                "Sorting by {:?}, {}.",
                state.key,
                direction_label(state.direction)
            );
        }
    }

    Ok(())
}

/// Build the pipeline query for a set of view flags.
async fn view_query<S: KvStore>(store: &TaskStore<S>, view: &ViewArgs) -> Result<TaskQuery> {
    let sort = match view.sort {
        Some(key) => SortState {
            key,
            direction: SortDirection::Ascending,
        },
        None => store
            .sort_state()
            .await
            .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?,
    };
    Ok(TaskQuery {
        filter: view.filter,
        query: view.search.clone().unwrap_or_default(),
        // An explicit --search flag is an explicit apply.
        search_applied: view.search.is_some(),
        sort,
    })
}

/// Resolve a 1-based row number against the listing the same view flags
/// print, so a row-addressed operation hits the row the user saw.
async fn resolve_row<S: KvStore>(
    store: &TaskStore<S>,
    view: &ViewArgs,
    number: usize,
) -> Result<Option<Task>> {
    if number == 0 {
        return Ok(None);
    }
    let tasks = store
        .list()
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    let query = view_query(store, view).await?;
    let mut outcome = run_query(&tasks, &query);
    if number > outcome.rows.len() {
        return Ok(None);
    }
    Ok(Some(outcome.rows.swap_remove(number - 1)))
}

fn print_row(row: usize, task: &Task, overdue: bool) {
    let status = if task.completed { "[x]" } else { "[ ]" };
    let due = match task.due_date {
        Some(date) if overdue => format!("{date} (overdue)"),
        Some(date) => date.to_string(),
        None => "-".to_string(),
    };
    println!(
        "{row:>3}. {status} {}  due: {due}  priority: {:?}  added: {}",
        task.title,
        task.priority,
        task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
    );
    if let Some(desc) = &task.description {
        println!("       {desc}");
    }
    if !task.tags.is_empty() {
        println!("       tags: {}", task.tags.join(", "));
    }
}

fn direction_label(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Ascending => "ascending",
        SortDirection::Descending => "descending",
    }
}
