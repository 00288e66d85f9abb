use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use daybook_core::tasks::{Filter, Priority, SortKey};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "daybook",
    about = "Local-first task list and weather lookup for your terminal",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Optional subcommand; defaults to launching the dashboard when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Launch the interactive dashboard (press q or Esc to exit).
    Tui,
    /// Print version and exit.
    Version,
    /// Run a health check against the storage backend.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage the task list.
    #[command(subcommand)]
    Task(TaskCommand),
    /// Look up the current weather.
    #[command(subcommand)]
    Weather(WeatherCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

/// View flags shared by `list` and the row-addressed operations. Row
/// numbers are positions in a listing, so the operation resolving one must
/// run the exact listing that printed it.
#[derive(Args, Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewArgs {
    /// all, active, or completed.
    #[arg(long, default_value = "all")]
    pub filter: Filter,
    /// Fuzzy search over titles, descriptions, and tags.
    #[arg(long)]
    pub search: Option<String>,
    /// Sort column for this run (title, created, due, priority, status);
    /// defaults to the persisted preference.
    #[arg(long)]
    pub sort: Option<SortKey>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    /// List tasks, optionally filtered, searched, and sorted.
    List {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Add a task.
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// May be given multiple times.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Due date as YYYY-MM-DD.
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long, default_value = "medium")]
        priority: Priority,
    },
    /// Toggle completion for a row number; repeat the flags used to list it.
    Done {
        number: usize,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Replace the title of a row number; repeat the flags used to list it.
    Edit {
        number: usize,
        title: String,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Delete a row number; repeat the flags used to list it.
    Delete {
        number: usize,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Delete every task.
    Clear {
        /// Confirm; without it nothing is deleted.
        #[arg(long)]
        yes: bool,
    },
    /// Select the sort column. Reselecting the current one flips direction.
    SortBy { key: SortKey },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum WeatherCommand {
    /// Look up by city name.
    City { name: Vec<String> },
    /// Look up by coordinates.
    Coords { lat: f64, lon: f64 },
    /// Detect a position from the network and look that up.
    Locate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_tui_when_missing_subcommand() {
        let cli = Cli::try_parse_from(["daybook"]).expect("parse should succeed");
        assert_eq!(cli.command, None);
    }

    #[test]
    fn parses_health_subcommand() {
        let cli = Cli::try_parse_from(["daybook", "health"]).expect("parse should succeed");
        assert_eq!(cli.command, Some(Command::Health));
    }

    #[test]
    fn parses_task_add_with_flags() {
        let cli = Cli::try_parse_from([
            "daybook", "task", "add", "water plants", "--tag", "garden", "--tag", "home",
            "--due", "2026-09-01", "--priority", "high",
        ])
        .expect("parse should succeed");

        let Some(Command::Task(TaskCommand::Add {
            title,
            tags,
            due,
            priority,
            description,
        })) = cli.command
        else {
            panic!("expected task add");
        };
        assert_eq!(title, "water plants");
        assert_eq!(tags, vec!["garden", "home"]);
        assert_eq!(due, Some("2026-09-01".parse().expect("date")));
        assert_eq!(priority, Priority::High);
        assert_eq!(description, None);
    }

    #[test]
    fn parses_task_list_filters() {
        let cli = Cli::try_parse_from([
            "daybook", "task", "list", "--filter", "active", "--search", "plants", "--sort",
            "due",
        ])
        .expect("parse should succeed");

        let Some(Command::Task(TaskCommand::List { view })) = cli.command else {
            panic!("expected task list");
        };
        assert_eq!(view.filter, Filter::Active);
        assert_eq!(view.search.as_deref(), Some("plants"));
        assert_eq!(view.sort, Some(SortKey::DueDate));
    }

    #[test]
    fn row_operations_take_the_same_view_flags() {
        let cli = Cli::try_parse_from([
            "daybook", "task", "delete", "2", "--filter", "completed",
        ])
        .expect("parse should succeed");

        let Some(Command::Task(TaskCommand::Delete { number, view })) = cli.command else {
            panic!("expected task delete");
        };
        assert_eq!(number, 2);
        assert_eq!(view.filter, Filter::Completed);
        assert_eq!(view.search, None);
    }

    #[test]
    fn weather_city_takes_multiple_words() {
        let cli = Cli::try_parse_from(["daybook", "weather", "city", "New", "York"])
            .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Some(Command::Weather(WeatherCommand::City {
                name: vec!["New".into(), "York".into()]
            }))
        );
    }
}
