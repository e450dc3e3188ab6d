use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use chrono::NaiveDate;
use std::io;
use std::str::FromStr;

use crate::dates::{due_state, format_date, DueState};
use crate::project::{NewProject, ProjectPatch};
use crate::storage;
use crate::task::{NewTask, Priority, Task, TaskPatch, TaskStatus};
use crate::tracker::Tracker;

const HELP: &str =
    "a/e task  p/P project  enter toggle  d delete  f/s/r filter  c clear  q quit";

/// Cursor and message line; everything else is read from the tracker.
#[derive(Debug, Default)]
struct Board {
    selected: usize,
    message: Option<String>,
}

impl Board {
    fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}

pub fn run_app<B: Backend, S: storage::Backend>(
    terminal: &mut Terminal<B>,
    tracker: &mut Tracker<S>,
) -> io::Result<()> {
    let mut board = Board::default();
    loop {
        board.clamp(tracker.filtered_tasks().len());
        terminal.draw(|f| draw(f, tracker, &board))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        board.message = None;
        let selected_id = tracker
            .filtered_tasks()
            .get(board.selected)
            .map(|t| t.id.clone());

        match key.code {
            KeyCode::Char('q') => return Ok(()),
            KeyCode::Char('a') => add_task(tracker, &mut board, &mut prompt),
            KeyCode::Char('p') => add_project(tracker, &mut board, &mut prompt),
            KeyCode::Char('P') => edit_project(tracker, &mut board, &mut prompt),
            KeyCode::Char('e') => {
                if let Some(id) = selected_id {
                    edit_task(tracker, &mut board, &id, &mut prompt);
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = selected_id {
                    tracker.delete_task(&id);
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(id) = selected_id {
                    tracker.toggle_task_status(&id);
                }
            }
            KeyCode::Char('f') => {
                let next = next_project(tracker, tracker.filter().project_id.as_deref());
                tracker.set_project_filter(next);
            }
            KeyCode::Char('s') => {
                let next = cycle(&TaskStatus::ALL, tracker.filter().status);
                tracker.set_status_filter(next);
            }
            KeyCode::Char('r') => {
                let next = cycle(&Priority::ALL, tracker.filter().priority);
                tracker.set_priority_filter(next);
            }
            KeyCode::Char('c') => tracker.set_filter(Default::default()),
            KeyCode::Up => {
                board.selected = board.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                board.selected += 1;
            }
            _ => {}
        }
    }
}

/// None -> first -> ... -> last -> None
fn cycle<T: Copy + PartialEq>(values: &[T], current: Option<T>) -> Option<T> {
    match current {
        None => values.first().copied(),
        Some(value) => {
            let index = values.iter().position(|v| *v == value)?;
            values.get(index + 1).copied()
        }
    }
}

fn next_project<S: storage::Backend>(tracker: &Tracker<S>, current: Option<&str>) -> Option<String> {
    let ids: Vec<&str> = tracker.projects().iter().map(|p| p.id.as_str()).collect();
    cycle(&ids, current).map(str::to_string)
}

fn draw<S: storage::Backend>(f: &mut Frame, tracker: &Tracker<S>, board: &Board) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let stats = tracker.stats();
    let header = Line::from(vec![
        Span::raw(format!("Total {}  ", stats.total)),
        Span::styled(format!("To do {}  ", stats.todo), Style::default().fg(Color::Yellow)),
        Span::styled(
            format!("In progress {}  ", stats.in_progress),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("Completed {} ({}%)  ", stats.completed, stats.completion_rate()),
            Style::default().fg(Color::Green),
        ),
        Span::styled(format!("Overdue {}", stats.overdue), Style::default().fg(Color::Red)),
    ]);
    f.render_widget(
        Paragraph::new(header).block(Block::default().title("Dashboard").borders(Borders::ALL)),
        chunks[0],
    );

    let filter = tracker.filter();
    let project_label = match filter.project_id.as_deref() {
        None => "All".to_string(),
        Some(id) => tracker
            .project(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string()),
    };
    let filters = Line::from(format!(
        "Project: {}   Status: {}   Priority: {}",
        project_label,
        filter.status.map_or("All", TaskStatus::as_str),
        filter.priority.map_or("All", Priority::as_str),
    ));
    f.render_widget(
        Paragraph::new(filters).block(Block::default().title("Filters").borders(Borders::ALL)),
        chunks[1],
    );

    let tasks = tracker.filtered_tasks();
    let items: Vec<ListItem> = if tasks.is_empty() {
        vec![ListItem::new("No tasks found. Press 'a' to create one.")]
    } else {
        tasks.iter().map(|t| task_line(tracker, t)).collect()
    };
    let mut state = ListState::default();
    if !tasks.is_empty() {
        state.select(Some(board.selected));
    }
    let list = List::new(items)
        .block(Block::default().title("Tasks").borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan));
    f.render_stateful_widget(list, chunks[2], &mut state);

    let footer = match &board.message {
        Some(message) => Line::from(Span::styled(message.as_str(), Style::default().fg(Color::Red))),
        None => Line::from(HELP),
    };
    f.render_widget(Paragraph::new(footer), chunks[3]);
}

fn task_line<'a, S: storage::Backend>(tracker: &'a Tracker<S>, task: &'a Task) -> ListItem<'a> {
    let marker = match task.status {
        TaskStatus::Todo => "[ ] ",
        TaskStatus::InProgress => "[~] ",
        TaskStatus::Completed => "[x] ",
    };
    let title_style = if task.status == TaskStatus::Completed {
        Style::default().add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(Color::White)
    };
    let mut spans = vec![
        Span::raw(marker),
        Span::styled(task.title.as_str(), title_style),
        Span::raw(format!(" ({})", task.priority)),
    ];
    if let Some(project) = tracker.project_for(task) {
        spans.push(Span::styled(
            format!(" #{}", project.name),
            Style::default().fg(Color::Magenta),
        ));
    }
    if let Some(due) = task.due_date {
        spans.push(Span::raw(format!(" (Due: {})", format_date(due))));
    }
    let state = due_state(task);
    if let Some(label) = state.label() {
        let color = match state {
            DueState::Overdue => Color::Red,
            _ => Color::Yellow,
        };
        spans.push(Span::styled(format!(" {label}"), Style::default().fg(color)));
    }
    ListItem::new(Line::from(spans))
}

/// Reads one answer from the user; `None` when input is closed.
type Ask<'a> = dyn FnMut(&str) -> Option<String> + 'a;

/// Typed in place of a value to clear an optional field.
const CLEAR: &str = "-";

fn parse_choice<T: FromStr<Err = String>>(raw: &str) -> Result<Option<T>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some)
}

fn parse_due(raw: &str) -> Result<Option<NaiveDate>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|err| format!("invalid date '{raw}': {err}"))
}

/// Blank keeps the current value, "-" clears it.
fn text_change(raw: String) -> Option<Option<String>> {
    match raw.as_str() {
        "" => None,
        CLEAR => Some(None),
        _ => Some(Some(raw)),
    }
}

fn find_project<S: storage::Backend>(tracker: &Tracker<S>, raw: &str) -> Result<String, String> {
    tracker
        .projects()
        .iter()
        .find(|p| p.id == raw || p.name.eq_ignore_ascii_case(raw))
        .map(|p| p.id.clone())
        .ok_or_else(|| format!("no project '{raw}'"))
}

fn add_task<S: storage::Backend>(tracker: &mut Tracker<S>, board: &mut Board, ask: &mut Ask) {
    let Some(title) = ask("Enter task title") else {
        return;
    };
    let description = ask("Description (blank for none)").filter(|d| !d.is_empty());
    let priority = ask("Priority (low/medium/high, blank for medium)").unwrap_or_default();
    let status = ask("Status (todo/in-progress/completed, blank for todo)").unwrap_or_default();
    let due = ask("Enter due date (YYYY-MM-DD, blank for none)").unwrap_or_default();
    let parsed = parse_choice::<Priority>(&priority).and_then(|priority| {
        Ok((priority, parse_choice::<TaskStatus>(&status)?, parse_due(&due)?))
    });
    let (priority, status, due_date) = match parsed {
        Ok(fields) => fields,
        Err(message) => {
            board.message = Some(message);
            return;
        }
    };
    // new tasks land in the filtered project, or the first one
    let project_id = tracker
        .filter()
        .project_id
        .clone()
        .or_else(|| tracker.projects().first().map(|p| p.id.clone()));
    let input = NewTask {
        title,
        description,
        priority: priority.unwrap_or_default(),
        status: status.unwrap_or_default(),
        due_date,
        project_id,
    };
    if let Err(err) = tracker.create_task(input) {
        board.message = Some(err.to_string());
    }
}

fn add_project<S: storage::Backend>(tracker: &mut Tracker<S>, board: &mut Board, ask: &mut Ask) {
    let Some(name) = ask("Enter project name") else {
        return;
    };
    let mut input = NewProject::named(name);
    input.description = ask("Description (blank for none)").filter(|d| !d.is_empty());
    if let Some(color) = ask("Color (blank for default)").filter(|c| !c.is_empty()) {
        input.color = color;
    }
    if let Err(err) = tracker.create_project(input) {
        board.message = Some(err.to_string());
    }
}

/// Asks for every field of the task, showing the current value.
fn task_patch<S: storage::Backend>(
    tracker: &Tracker<S>,
    task: &Task,
    ask: &mut Ask,
) -> Result<TaskPatch, String> {
    let mut answer = |question: String| ask(&question).unwrap_or_default();
    let title = answer(format!("Title [{}]", task.title));
    let description = answer(format!(
        "Description [{}] (- clears)",
        task.description.as_deref().unwrap_or("")
    ));
    let priority = answer(format!("Priority [{}]", task.priority));
    let status = answer(format!("Status [{}]", task.status));
    let due = answer(format!(
        "Due date [{}] (- clears)",
        task.due_date.map(format_date).unwrap_or_default()
    ));
    let project = answer(format!(
        "Project id or name [{}] (- clears)",
        tracker.project_for(task).map_or("", |p| p.name.as_str())
    ));

    Ok(TaskPatch {
        title: Some(title).filter(|t| !t.is_empty()),
        description: text_change(description),
        priority: parse_choice(&priority)?,
        status: parse_choice(&status)?,
        due_date: match due.as_str() {
            CLEAR => Some(None),
            raw => parse_due(raw)?.map(Some),
        },
        project_id: match text_change(project) {
            Some(Some(raw)) => Some(Some(find_project(tracker, &raw)?)),
            other => other,
        },
    })
}

fn edit_task<S: storage::Backend>(
    tracker: &mut Tracker<S>,
    board: &mut Board,
    id: &str,
    ask: &mut Ask,
) {
    let Some(task) = tracker.task(id).cloned() else {
        return;
    };
    let result = task_patch(tracker, &task, ask).and_then(|patch| {
        if patch.is_empty() {
            return Ok(());
        }
        tracker
            .update_task(id, patch)
            .map(drop)
            .map_err(|err| err.to_string())
    });
    if let Err(message) = result {
        board.message = Some(message);
    }
}

/// Edits the project selected by the project filter.
fn edit_project<S: storage::Backend>(tracker: &mut Tracker<S>, board: &mut Board, ask: &mut Ask) {
    let Some(project) = tracker
        .filter()
        .project_id
        .as_deref()
        .and_then(|id| tracker.project(id))
        .cloned()
    else {
        board.message = Some("filter by a project (f) before editing it".to_string());
        return;
    };
    let mut answer = |question: String| ask(&question).unwrap_or_default();
    let name = answer(format!("Name [{}]", project.name));
    let description = answer(format!(
        "Description [{}] (- clears)",
        project.description.as_deref().unwrap_or("")
    ));
    let color = answer(format!("Color [{}]", project.color));
    let patch = ProjectPatch {
        name: Some(name).filter(|n| !n.is_empty()),
        description: text_change(description),
        color: Some(color).filter(|c| !c.is_empty()),
    };
    if patch.is_empty() {
        return;
    }
    if let Err(err) = tracker.update_project(&project.id, patch) {
        board.message = Some(err.to_string());
    }
}

fn prompt(message: &str) -> Option<String> {
    disable_raw_mode().ok();
    println!("{}", message);
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        enable_raw_mode().ok();
        Some(input.trim().to_string())
    } else {
        enable_raw_mode().ok();
        None
    }
}
