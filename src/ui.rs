use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::mpsc;
use std::time::Duration;
use tokio::runtime::Handle;

use crate::client::SchedulerClient;
use crate::config::Config;
use crate::models::{FetchState, Notification, Severity, TaskRecord};
use crate::view::{self, RenderState, StatusCell, TaskRow};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Completion messages sent back to the event loop by spawned requests.
#[derive(Debug)]
pub enum AppEvent {
    TasksLoaded {
        plugin: String,
        seq: u64,
        result: Result<Vec<TaskRecord>, String>,
    },
    TriggerDone {
        task_id: String,
        outcome: Result<(), String>,
    },
}

/// A task-list fetch the app wants issued. The sequence number lets the app
/// recognize and drop results that arrive after the selection moved on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub plugin: String,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    pub plugin: String,
    pub task_id: String,
}

pub struct App {
    plugins: Vec<String>,
    selected_plugin: Option<usize>,
    can_trigger: bool,
    fetch_seq: u64,
    fetch: FetchState,
    pub table_state: TableState,
    pub notification: Option<Notification>,
    pub should_quit: bool,
    tick: usize,
}

impl App {
    /// Build the app over the configured plugin list. Selection defaults to
    /// the first entry; an empty list means no selection and no fetch.
    pub fn new(plugins: Vec<String>, can_trigger: bool) -> (Self, Option<FetchRequest>) {
        let selected_plugin = if plugins.is_empty() { None } else { Some(0) };
        let mut app = App {
            plugins,
            selected_plugin,
            can_trigger,
            fetch_seq: 0,
            fetch: FetchState::Loading,
            table_state: TableState::default(),
            notification: None,
            should_quit: false,
            tick: 0,
        };
        let request = app.begin_fetch();
        (app, request)
    }

    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_plugin
    }

    pub fn selected_plugin(&self) -> Option<&str> {
        self.selected_plugin.map(|i| self.plugins[i].as_str())
    }

    pub fn can_trigger(&self) -> bool {
        self.can_trigger
    }

    fn begin_fetch(&mut self) -> Option<FetchRequest> {
        let plugin = self.selected_plugin()?.to_string();
        self.fetch_seq += 1;
        self.fetch = FetchState::Loading;
        self.table_state = TableState::default();
        Some(FetchRequest {
            plugin,
            seq: self.fetch_seq,
        })
    }

    pub fn next_plugin(&mut self) -> Option<FetchRequest> {
        let current = self.selected_plugin?;
        if self.plugins.len() < 2 {
            return None;
        }
        self.selected_plugin = Some((current + 1) % self.plugins.len());
        self.begin_fetch()
    }

    pub fn previous_plugin(&mut self) -> Option<FetchRequest> {
        let current = self.selected_plugin?;
        if self.plugins.len() < 2 {
            return None;
        }
        let previous = if current == 0 {
            self.plugins.len() - 1
        } else {
            current - 1
        };
        self.selected_plugin = Some(previous);
        self.begin_fetch()
    }

    pub fn refresh(&mut self) -> Option<FetchRequest> {
        self.begin_fetch()
    }

    /// Apply a completed fetch. Results for a superseded sequence number or
    /// a plugin that is no longer selected are dropped so stale rows can
    /// never render under the wrong plugin.
    pub fn apply_tasks(&mut self, plugin: &str, seq: u64, result: Result<Vec<TaskRecord>, String>) {
        if seq != self.fetch_seq || Some(plugin) != self.selected_plugin() {
            log::debug!("Dropping stale task list for plugin '{}' (seq {})", plugin, seq);
            return;
        }
        self.fetch = match result {
            Ok(tasks) => FetchState::Ready(tasks),
            Err(error) => FetchState::Errored(error),
        };
    }

    /// Post the single notification for one resolved trigger invocation.
    pub fn apply_trigger(&mut self, task_id: &str, outcome: &Result<(), String>) {
        self.notification = Some(view::trigger_notification(task_id, outcome));
    }

    pub fn render_state(&self) -> Option<RenderState> {
        let plugin = self.selected_plugin()?;
        Some(view::resolve(plugin, &self.fetch))
    }

    fn row_count(&self) -> usize {
        match &self.fetch {
            FetchState::Ready(tasks) => tasks.len(),
            _ => 0,
        }
    }

    pub fn next_row(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous_row(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    /// Trigger request for the highlighted row, available only to operators
    /// holding the trigger permission. No de-duplication: firing twice on
    /// the same task produces two independent requests.
    pub fn trigger_request(&self) -> Option<TriggerRequest> {
        if !self.can_trigger {
            return None;
        }
        let plugin = self.selected_plugin()?.to_string();
        let tasks = match &self.fetch {
            FetchState::Ready(tasks) => tasks,
            _ => return None,
        };
        let task = self.table_state.selected().and_then(|i| tasks.get(i))?;
        Some(TriggerRequest {
            plugin,
            task_id: task.task_id.clone(),
        })
    }

    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.tick % SPINNER_FRAMES.len()]
    }
}

pub fn run_tui(config: Config, client: SchedulerClient, handle: Handle) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, config, client, handle);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn spawn_fetch(
    handle: &Handle,
    client: &SchedulerClient,
    tx: &mpsc::Sender<AppEvent>,
    request: FetchRequest,
) {
    let client = client.clone();
    let tx = tx.clone();
    handle.spawn(async move {
        let result = client
            .list_tasks(&request.plugin)
            .await
            .map_err(|e| format!("{:#}", e));
        let _ = tx.send(AppEvent::TasksLoaded {
            plugin: request.plugin,
            seq: request.seq,
            result,
        });
    });
}

fn spawn_trigger(
    handle: &Handle,
    client: &SchedulerClient,
    tx: &mpsc::Sender<AppEvent>,
    request: TriggerRequest,
) {
    let client = client.clone();
    let tx = tx.clone();
    handle.spawn(async move {
        let outcome = client
            .trigger_task(&request.plugin, &request.task_id)
            .await
            .map_err(|e| format!("{:#}", e));
        let _ = tx.send(AppEvent::TriggerDone {
            task_id: request.task_id,
            outcome,
        });
    });
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    config: Config,
    client: SchedulerClient,
    handle: Handle,
) -> Result<()> {
    let (tx, rx) = mpsc::channel::<AppEvent>();
    let (mut app, initial_fetch) = App::new(config.plugins.clone(), config.can_trigger());
    if let Some(request) = initial_fetch {
        spawn_fetch(&handle, &client, &tx, request);
    }

    loop {
        terminal.draw(|f| ui(f, &mut app))?;

        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::TasksLoaded {
                    plugin,
                    seq,
                    result,
                } => app.apply_tasks(&plugin, seq, result),
                AppEvent::TriggerDone { task_id, outcome } => {
                    app.apply_trigger(&task_id, &outcome)
                }
            }
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            app.should_quit = true;
                        }
                        KeyCode::Tab | KeyCode::Right => {
                            if let Some(request) = app.next_plugin() {
                                spawn_fetch(&handle, &client, &tx, request);
                            }
                        }
                        KeyCode::BackTab | KeyCode::Left => {
                            if let Some(request) = app.previous_plugin() {
                                spawn_fetch(&handle, &client, &tx, request);
                            }
                        }
                        KeyCode::Down => {
                            app.next_row();
                        }
                        KeyCode::Up => {
                            app.previous_row();
                        }
                        KeyCode::Char('r') => {
                            if let Some(request) = app.refresh() {
                                spawn_fetch(&handle, &client, &tx, request);
                            }
                        }
                        KeyCode::Char('t') => {
                            if let Some(request) = app.trigger_request() {
                                spawn_trigger(&handle, &client, &tx, request);
                            }
                        }
                        _ => {}
                    }
                }
            }
        } else {
            app.on_tick();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn ui(f: &mut Frame, app: &mut App) {
    // No plugins configured: only the guidance notice renders, never a
    // selector or table.
    if app.plugins().is_empty() {
        render_guidance(f, f.area());
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.area());

    let titles: Vec<Line> = app
        .plugins()
        .iter()
        .map(|name| Line::from(name.as_str()))
        .collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("Plugins"))
        .select(app.selected_index().unwrap_or(0))
        .style(Style::default().fg(Color::Cyan))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::Black),
        );
    f.render_widget(tabs, chunks[0]);

    match app.render_state() {
        Some(RenderState::Loading) => {
            let busy = Paragraph::new(format!("{} Fetching scheduled tasks...", app.spinner()))
                .block(Block::default().borders(Borders::ALL).title("Scheduled Tasks"))
                .style(Style::default().fg(Color::Yellow));
            f.render_widget(busy, chunks[1]);
        }
        Some(RenderState::Errored(message)) => {
            let error = Paragraph::new(format!("Failed to load tasks: {}", message))
                .block(Block::default().borders(Borders::ALL).title("Scheduled Tasks"))
                .wrap(Wrap { trim: false })
                .style(Style::default().fg(Color::Red));
            f.render_widget(error, chunks[1]);
        }
        Some(RenderState::Empty(notice)) => {
            let empty = Paragraph::new(notice)
                .block(Block::default().borders(Borders::ALL).title("Scheduled Tasks"))
                .style(Style::default().fg(Color::White));
            f.render_widget(empty, chunks[1]);
        }
        Some(RenderState::Table(rows)) => {
            render_task_table(f, app, chunks[1], &rows);
        }
        None => {}
    }

    render_notification(f, app, chunks[2]);
    render_footer(f, app, chunks[3]);
}

fn render_guidance(f: &mut Frame, area: Rect) {
    let guidance = Paragraph::new(Config::guidance_message())
        .block(Block::default().borders(Borders::ALL).title("schedview"))
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::Yellow));
    f.render_widget(guidance, area);
}

fn render_task_table(f: &mut Frame, app: &mut App, area: Rect, rows: &[TaskRow]) {
    let spinner = app.spinner();
    let table_rows: Vec<Row> = rows
        .iter()
        .map(|row| {
            let id_cell = if row.failed_last_run {
                Cell::from(Line::from(vec![
                    Span::styled(
                        format!("{} ", view::ERROR_GLYPH),
                        Style::default().fg(Color::Red),
                    ),
                    Span::styled(row.task_id.clone(), Style::default().fg(Color::White)),
                ]))
            } else {
                Cell::from(row.task_id.clone())
            };

            let status_cell = match &row.status {
                StatusCell::Idle => Cell::from(Line::from(vec![
                    Span::styled("● ", Style::default().fg(Color::Green)),
                    Span::raw("Idle"),
                ])),
                StatusCell::Running => Cell::from(Line::from(vec![
                    Span::styled(format!("{} ", spinner), Style::default().fg(Color::Yellow)),
                    Span::styled("Running", Style::default().fg(Color::Yellow)),
                ])),
                StatusCell::Other(raw) => Cell::from(raw.clone()),
                StatusCell::Absent => {
                    Cell::from(Span::styled("N/A", Style::default().fg(Color::DarkGray)))
                }
            };

            Row::new(vec![
                id_cell,
                status_cell,
                Cell::from(row.last_run.clone()),
                Cell::from(row.next_run.clone()),
            ])
        })
        .collect();

    let header = Row::new(vec!["Task", "Status", "Last Run", "Next Run"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let table = Table::new(
        table_rows,
        [
            Constraint::Percentage(40),
            Constraint::Percentage(15),
            Constraint::Percentage(22),
            Constraint::Percentage(23),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("Scheduled Tasks"))
    .highlight_style(
        Style::default()
            .bg(Color::LightGreen)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_notification(f: &mut Frame, app: &App, area: Rect) {
    let Some(notification) = &app.notification else {
        return;
    };
    let color = match notification.severity {
        Severity::Success => Color::Green,
        Severity::Error => Color::Red,
        Severity::Info => Color::Cyan,
    };
    let line = Paragraph::new(notification.message.clone()).style(Style::default().fg(color));
    f.render_widget(line, area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let mut hints = String::from("←/→: Plugin | ↑/↓: Navigate | r: Refresh");
    if app.can_trigger() {
        hints.push_str(" | t: Trigger");
    }
    hints.push_str(" | q: Quit");
    let footer = Paragraph::new(hints).style(Style::default().fg(Color::DarkGray));
    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskState, TaskStatus};

    fn plugins(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn task(task_id: &str) -> TaskRecord {
        TaskRecord {
            task_id: task_id.to_string(),
            task_state: Some(TaskState {
                status: Some(TaskStatus::Idle),
                last_run_ended_at: None,
                last_run_error: None,
                starts_at: None,
            }),
        }
    }

    #[test]
    fn initial_selection_is_first_configured_plugin() {
        let (app, request) = App::new(plugins(&["catalog", "search"]), false);
        assert_eq!(app.selected_plugin(), Some("catalog"));
        let request = request.unwrap();
        assert_eq!(request.plugin, "catalog");
        assert_eq!(request.seq, 1);
    }

    #[test]
    fn empty_plugin_list_issues_no_fetch() {
        let (app, request) = App::new(Vec::new(), true);
        assert!(request.is_none());
        assert_eq!(app.selected_plugin(), None);
        assert!(app.render_state().is_none());
        assert!(app.trigger_request().is_none());
    }

    #[test]
    fn switching_plugins_issues_exactly_one_fetch_for_the_new_selection() {
        let (mut app, _) = App::new(plugins(&["catalog", "search"]), false);
        let request = app.next_plugin().unwrap();
        assert_eq!(request.plugin, "search");
        assert_eq!(request.seq, 2);
        assert_eq!(app.selected_plugin(), Some("search"));
        assert!(matches!(app.render_state(), Some(RenderState::Loading)));
    }

    #[test]
    fn single_plugin_switch_is_a_no_op() {
        let (mut app, _) = App::new(plugins(&["catalog"]), false);
        assert!(app.next_plugin().is_none());
        assert!(app.previous_plugin().is_none());
        assert_eq!(app.selected_plugin(), Some("catalog"));
    }

    #[test]
    fn stale_results_never_render_under_the_new_plugin() {
        let (mut app, first) = App::new(plugins(&["catalog", "search"]), false);
        let first = first.unwrap();
        let second = app.next_plugin().unwrap();

        // The fetch for "catalog" resolves after the selection moved to
        // "search": it must be dropped.
        app.apply_tasks(&first.plugin, first.seq, Ok(vec![task("stale")]));
        assert!(matches!(app.render_state(), Some(RenderState::Loading)));

        app.apply_tasks(&second.plugin, second.seq, Ok(vec![task("fresh")]));
        match app.render_state() {
            Some(RenderState::Table(rows)) => assert_eq!(rows[0].task_id, "fresh"),
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn fetch_error_resolves_to_errored_state() {
        let (mut app, request) = App::new(plugins(&["catalog"]), false);
        let request = request.unwrap();
        app.apply_tasks(&request.plugin, request.seq, Err("timeout".to_string()));
        assert_eq!(
            app.render_state(),
            Some(RenderState::Errored("timeout".to_string()))
        );
    }

    #[test]
    fn trigger_requires_permission_and_a_selected_row() {
        let (mut app, request) = App::new(plugins(&["catalog"]), false);
        let request = request.unwrap();
        app.apply_tasks(&request.plugin, request.seq, Ok(vec![task("t1")]));
        app.next_row();
        assert!(app.trigger_request().is_none());

        let (mut app, request) = App::new(plugins(&["catalog"]), true);
        let request = request.unwrap();
        app.apply_tasks(&request.plugin, request.seq, Ok(vec![task("t1")]));
        assert!(app.trigger_request().is_none());

        app.next_row();
        let trigger = app.trigger_request().unwrap();
        assert_eq!(trigger.plugin, "catalog");
        assert_eq!(trigger.task_id, "t1");
    }

    #[test]
    fn each_trigger_outcome_posts_one_notification() {
        let (mut app, _) = App::new(plugins(&["catalog"]), true);
        app.apply_trigger("t1", &Ok(()));
        let note = app.notification.clone().unwrap();
        assert_eq!(note.message, "Successfully triggered task t1");
        assert_eq!(note.severity, Severity::Success);

        app.apply_trigger("t2", &Err("boom".to_string()));
        let note = app.notification.clone().unwrap();
        assert_eq!(note.message, "Error triggering task t2: boom");
        assert_eq!(note.severity, Severity::Error);
    }

    #[test]
    fn row_navigation_wraps() {
        let (mut app, request) = App::new(plugins(&["catalog"]), false);
        let request = request.unwrap();
        app.apply_tasks(
            &request.plugin,
            request.seq,
            Ok(vec![task("t1"), task("t2")]),
        );
        app.next_row();
        assert_eq!(app.table_state.selected(), Some(0));
        app.next_row();
        assert_eq!(app.table_state.selected(), Some(1));
        app.next_row();
        assert_eq!(app.table_state.selected(), Some(0));
        app.previous_row();
        assert_eq!(app.table_state.selected(), Some(1));
    }
}
