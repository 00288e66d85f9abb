use std::{io, sync::Arc, time::Duration};

use chrono::{Local, NaiveDate};
use color_eyre::Result;
use crossterm::{
    event::{self, DisableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use daybook_core::tasks::{Filter, SortDirection, SortKey, Task};
use daybook_storage::JsonFileStore;
use daybook_task::{
    query::{is_overdue, run_query, QueryOutcome, TaskQuery},
    TaskStore,
};
use daybook_weather::{
    debounce::Debouncer, geolocate::GeoLocator, LookupTarget, WeatherClient, WeatherError,
    WeatherReport, MAX_ATTEMPTS,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table},
    Terminal,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

const CITY_DEBOUNCE: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Dashboard: task table on top, weather panel below.
///
/// Keys: `q`/Esc quit, `j`/`k` move, `x` toggle, `d` delete, `f` cycle the
/// filter, `/` staged search, `1`-`5` sort columns, `c` city input,
/// `l` locate, `r` retry a failed lookup.
pub async fn launch(config: &crate::config::Config) -> Result<()> {
    let store = TaskStore::new(crate::storage::store_from_config(config)?);
    let tasks = store
        .list()
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    let sort = store
        .sort_state()
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    let client = crate::weather::resolve_weather_config(config)
        .map(|cfg| Arc::new(WeatherClient::new(cfg)));

    let (tx, rx) = mpsc::unbounded_channel();
    let panel = if client.is_some() {
        WeatherPanel::Idle
    } else {
        WeatherPanel::Unconfigured
    };
    let mut app = App {
        store,
        tasks,
        query: TaskQuery {
            sort,
            ..TaskQuery::default()
        },
        selected: 0,
        mode: InputMode::Normal,
        city_input: String::new(),
        panel,
        attempt: 0,
        position: None,
        client,
        events: tx,
        debouncer: Debouncer::new(),
    };

    // Mirror the page-load behavior: show local weather right away.
    app.locate();

    tokio::task::block_in_place(|| run(app, rx))
}

enum PanelEvent {
    LookupStarted,
    LookupFinished(Result<WeatherReport, WeatherError>),
    Positioned { lat: f64, lon: f64 },
    LocateFailed(String),
}

enum WeatherPanel {
    /// No API key resolved; lookups are disabled.
    Unconfigured,
    Idle,
    Loading,
    Ready(WeatherReport),
    Failed { message: String, retryable: bool },
}

#[derive(PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    City,
}

struct App {
    store: TaskStore<JsonFileStore>,
    tasks: Vec<Task>,
    query: TaskQuery,
    selected: usize,
    mode: InputMode,
    city_input: String,
    panel: WeatherPanel,
    /// Counts manual retries for the current failure; gates the affordance.
    attempt: u32,
    position: Option<(f64, f64)>,
    client: Option<Arc<WeatherClient>>,
    events: UnboundedSender<PanelEvent>,
    debouncer: Debouncer,
}

fn run(mut app: App, mut rx: UnboundedReceiver<PanelEvent>) -> Result<()> {
    let _guard = TerminalGuard::enter()?;
    let mut terminal = _guard.terminal()?;

    loop {
        while let Ok(event) = rx.try_recv() {
            app.apply_panel_event(event);
        }

        let today = Local::now().date_naive();
        let outcome = run_query(&app.tasks, &app.query);
        if app.selected >= outcome.rows.len() {
            app.selected = outcome.rows.len().saturating_sub(1);
        }

        terminal.draw(|frame| draw(frame, &app, &outcome, today))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if !app.handle_key(key.code)? {
                    break;
                }
            }
        }
    }

    Ok(())
}

impl App {
    /// Returns false when the dashboard should exit.
    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        match self.mode {
            InputMode::Normal => match code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(false),
                KeyCode::Down | KeyCode::Char('j') => self.selected = self.selected.saturating_add(1),
                KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
                KeyCode::Char('x') => self.toggle_selected()?,
                KeyCode::Char('d') => self.delete_selected()?,
                KeyCode::Char('f') => self.cycle_filter(),
                KeyCode::Char('/') => self.mode = InputMode::Search,
                KeyCode::Char('c') => self.mode = InputMode::City,
                KeyCode::Char('l') => self.locate(),
                KeyCode::Char('r') => self.retry(),
                KeyCode::Char(c @ '1'..='5') => self.select_sort_column(c)?,
                _ => {}
            },
            InputMode::Search => match code {
                KeyCode::Esc => {
                    self.query.clear_search();
                    self.mode = InputMode::Normal;
                }
                KeyCode::Enter => {
                    // The explicit activation toggle: only now does the
                    // displayed list narrow to the matches.
                    self.query.search_applied = !self.query.query.trim().is_empty();
                    self.mode = InputMode::Normal;
                }
                KeyCode::Backspace => {
                    self.query.query.pop();
                }
                KeyCode::Char(c) => self.query.query.push(c),
                _ => {}
            },
            InputMode::City => match code {
                KeyCode::Esc => {
                    self.debouncer.cancel();
                    self.mode = InputMode::Normal;
                }
                KeyCode::Enter => {
                    // Explicit submit bypasses the quiet period.
                    self.debouncer.cancel();
                    let city = self.city_input.trim().to_string();
                    if !city.is_empty() {
                        self.attempt = 0;
                        self.lookup(LookupTarget::City(city));
                    }
                    self.mode = InputMode::Normal;
                }
                KeyCode::Backspace => {
                    self.city_input.pop();
                    self.schedule_debounced();
                }
                KeyCode::Char(c) => {
                    self.city_input.push(c);
                    self.schedule_debounced();
                }
                _ => {}
            },
        }
        Ok(true)
    }

    fn reload(&mut self) -> Result<()> {
        self.tasks =
            block_on(self.store.list()).map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
        Ok(())
    }

    fn selected_task(&self) -> Option<Task> {
        let outcome = run_query(&self.tasks, &self.query);
        outcome.rows.get(self.selected).cloned()
    }

    fn toggle_selected(&mut self) -> Result<()> {
        if let Some(task) = self.selected_task() {
            block_on(self.store.toggle(task.id))
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            self.reload()?;
        }
        Ok(())
    }

    fn delete_selected(&mut self) -> Result<()> {
        if let Some(task) = self.selected_task() {
            block_on(self.store.delete(task.id))
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            self.reload()?;
        }
        Ok(())
    }

    fn cycle_filter(&mut self) {
        self.query.filter = match self.query.filter {
            Filter::All => Filter::Active,
            Filter::Active => Filter::Completed,
            Filter::Completed => Filter::All,
        };
    }

    fn select_sort_column(&mut self, c: char) -> Result<()> {
        let key = match c {
            '1' => SortKey::Title,
            '2' => SortKey::Created,
            '3' => SortKey::DueDate,
            '4' => SortKey::Priority,
            _ => SortKey::Status,
        };
        self.query.sort = block_on(self.store.select_sort(key))
            .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
        Ok(())
    }

    fn lookup(&mut self, target: LookupTarget) {
        let Some(client) = self.client.clone() else {
            return;
        };
        self.panel = WeatherPanel::Loading;
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = client.current(&target).await;
            let _ = tx.send(PanelEvent::LookupFinished(result));
        });
    }

    fn schedule_debounced(&mut self) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let city = self.city_input.trim().to_string();
        if city.is_empty() {
            self.debouncer.cancel();
            return;
        }
        self.attempt = 0;
        let tx = self.events.clone();
        self.debouncer.schedule(CITY_DEBOUNCE, async move {
            let _ = tx.send(PanelEvent::LookupStarted);
            let result = client.current_by_city(&city).await;
            let _ = tx.send(PanelEvent::LookupFinished(result));
        });
    }

    fn locate(&mut self) {
        let Some(client) = self.client.clone() else {
            return;
        };
        self.attempt = 0;
        self.panel = WeatherPanel::Loading;
        let tx = self.events.clone();
        tokio::spawn(async move {
            match GeoLocator::new().locate().await {
                Ok(position) => {
                    let _ = tx.send(PanelEvent::Positioned {
                        lat: position.lat,
                        lon: position.lon,
                    });
                    let result = client.current_by_coords(position.lat, position.lon).await;
                    let _ = tx.send(PanelEvent::LookupFinished(result));
                }
                Err(err) => {
                    let _ = tx.send(PanelEvent::LocateFailed(err.to_string()));
                }
            }
        });
    }

    /// Re-issue the failed lookup: by the staged position when the city
    /// field is empty, else by the typed city.
    fn retry(&mut self) {
        let WeatherPanel::Failed { retryable, .. } = &self.panel else {
            return;
        };
        if !retryable || self.attempt >= MAX_ATTEMPTS {
            return;
        }

        let city = self.city_input.trim();
        let target = if city.is_empty() {
            match self.position {
                Some((lat, lon)) => LookupTarget::Coords { lat, lon },
                None => return,
            }
        } else {
            LookupTarget::City(city.to_string())
        };
        self.attempt += 1;
        self.lookup(target);
    }

    fn apply_panel_event(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::LookupStarted => self.panel = WeatherPanel::Loading,
            PanelEvent::Positioned { lat, lon } => self.position = Some((lat, lon)),
            PanelEvent::LookupFinished(Ok(report)) => self.panel = WeatherPanel::Ready(report),
            PanelEvent::LookupFinished(Err(err)) => {
                self.panel = WeatherPanel::Failed {
                    retryable: err.retryable(),
                    message: err.to_string(),
                }
            }
            PanelEvent::LocateFailed(message) => {
                // Terminal: direct the user to the manual city search.
                self.panel = WeatherPanel::Failed {
                    message: format!("{message}. Search for a city instead (press c)."),
                    retryable: false,
                }
            }
        }
    }
}

fn draw(
    frame: &mut ratatui::Frame<'_>,
    app: &App,
    outcome: &QueryOutcome,
    today: NaiveDate,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let mut header_spans = vec![
        Span::styled(
            "Daybook",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " — {} active / {} completed — filter: {}",
            outcome.active,
            outcome.completed,
            app.query.filter.label()
        )),
    ];
    if let Some(count) = outcome.match_count {
        header_spans.push(Span::styled(
            format!(" — {count} match(es)"),
            Style::default().fg(Color::Yellow),
        ));
    }
    let header = Paragraph::new(Line::from(header_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    frame.render_widget(header, chunks[0]);

    frame.render_widget(task_table(app, outcome, today), chunks[1]);
    frame.render_widget(weather_panel(app), chunks[2]);
    frame.render_widget(footer(app, outcome), chunks[3]);
}

fn task_table<'a>(app: &'a App, outcome: &'a QueryOutcome, today: NaiveDate) -> Table<'a> {
    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from(column_label("Task", SortKey::Title, app)),
        Cell::from(column_label("Added", SortKey::Created, app)),
        Cell::from(column_label("Due", SortKey::DueDate, app)),
        Cell::from(column_label("Priority", SortKey::Priority, app)),
        Cell::from(column_label("Status", SortKey::Status, app)),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row<'_>> = outcome
        .rows
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let overdue = is_overdue(task, today);
            let mut title = task.title.clone();
            if let Some(desc) = &task.description {
                title.push_str(&format!(" ({desc})"));
            }
            let due = match task.due_date {
                Some(date) => date.to_string(),
                None => "-".to_string(),
            };
            let status = if task.completed { "done" } else { "active" };

            let mut style = Style::default();
            if overdue {
                style = style.fg(Color::Red);
            }
            if task.completed {
                style = style.add_modifier(Modifier::CROSSED_OUT);
            }
            if i == app.selected {
                style = style.add_modifier(Modifier::REVERSED);
            }

            Row::new(vec![
                Cell::from(format!("{}", i + 1)),
                Cell::from(title),
                Cell::from(
                    task.created_at
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M")
                        .to_string(),
                ),
                Cell::from(due),
                Cell::from(format!("{:?}", task.priority)),
                Cell::from(status),
            ])
            .style(style)
        })
        .collect();

    Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(24),
            Constraint::Length(17),
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(7),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("Tasks"))
}

/// Column header with the sort indicator, matching the widget's ▲/▼ marks.
fn column_label(name: &str, key: SortKey, app: &App) -> String {
    if app.query.sort.key != key {
        return name.to_string();
    }
    let arrow = match app.query.sort.direction {
        SortDirection::Ascending => "▲",
        SortDirection::Descending => "▼",
    };
    format!("{name} {arrow}")
}

fn weather_panel(app: &App) -> Paragraph<'_> {
    let lines: Vec<Line<'_>> = match &app.panel {
        WeatherPanel::Unconfigured => vec![Line::from(
            "No weather API key configured. Set [weather].api_key in the config file.",
        )],
        WeatherPanel::Idle => vec![Line::from(
            "Enter a city (press c) or use your location (press l).",
        )],
        WeatherPanel::Loading => vec![Line::from("Loading weather data...")],
        WeatherPanel::Ready(report) => vec![
            Line::from(Span::styled(
                report.location.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("Temperature: {}°C", report.temperature_c)),
            Line::from(format!(
                "Condition: {} ({})",
                report.condition, report.description
            )),
        ],
        WeatherPanel::Failed { message, retryable } => {
            let mut lines = vec![Line::from(Span::styled(
                message.clone(),
                Style::default().fg(Color::Red),
            ))];
            if *retryable && app.attempt < MAX_ATTEMPTS {
                lines.push(Line::from(format!(
                    "Press r to retry ({} of {MAX_ATTEMPTS} retries used).",
                    app.attempt
                )));
            }
            lines
        }
    };
    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Weather"))
}

fn footer<'a>(app: &'a App, outcome: &'a QueryOutcome) -> Paragraph<'a> {
    let line = match app.mode {
        InputMode::Normal => Line::from(
            "q quit · j/k move · x toggle · d delete · f filter · / search · 1-5 sort · c city · l locate · r retry",
        ),
        InputMode::Search => {
            let count = outcome
                .match_count
                .map(|c| format!(" — {c} match(es)"))
                .unwrap_or_default();
            Line::from(format!(
                "search: {}▏{count} · Enter apply · Esc clear",
                app.query.query
            ))
        }
        InputMode::City => Line::from(format!(
            "city: {}▏ · Enter search now · Esc cancel",
            app.city_input
        )),
    };
    Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Controls"))
}

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Handle::current().block_on(fut)
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        // Enter alternate screen to avoid polluting the shell buffer.
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }

    fn terminal(&self) -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
        let backend = CrosstermBackend::new(io::stdout());
        Ok(Terminal::new(backend)?)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Best-effort cleanup; errors are logged but not propagated from Drop.
        if let Err(err) = disable_raw_mode() {
            eprintln!("failed to disable raw mode: {err}");
        }
        if let Err(err) = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture) {
            eprintln!("failed to restore terminal: {err}");
        }
    }
}
