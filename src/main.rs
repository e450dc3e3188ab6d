use anyhow::bail;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

use taskers::config::{project_patch, Cli, Command, Config};
use taskers::dates::{due_state, format_date};
use taskers::storage::FileBackend;
use taskers::{logging, ui, NewProject, NewTask, TaskFilter, Tracker};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_cli(&cli);
    logging::init(&config)?;
    tracing::info!(data_dir = %config.data_dir.display(), "starting");

    let mut tracker = Tracker::open(FileBackend::new(&config.data_dir));

    match cli.command.unwrap_or(Command::Ui) {
        Command::Ui => run_board(&mut tracker)?,
        Command::Add { title, fields } => {
            let task = tracker.create_task(NewTask {
                title,
                description: fields.description,
                priority: fields.priority.unwrap_or_default(),
                status: fields.status.unwrap_or_default(),
                due_date: fields.due,
                project_id: fields.project,
            })?;
            println!("Added task {}", task.id);
        }
        Command::Edit { id, changes } => {
            let patch = changes.into_patch();
            if patch.is_empty() {
                bail!("nothing to change");
            }
            match tracker.update_task(&id, patch)? {
                Some(task) => println!("Updated task {}", task.id),
                None => println!("No task with id {id}"),
            }
        }
        Command::Toggle { id } => match tracker.toggle_task_status(&id) {
            Some(status) => println!("{id} is now {status}"),
            None => println!("No task with id {id}"),
        },
        Command::Rm { id } => {
            if tracker.delete_task(&id) {
                println!("Deleted task {id}");
            } else {
                println!("No task with id {id}");
            }
        }
        Command::ProjectAdd {
            name,
            description,
            color,
        } => {
            let mut input = NewProject::named(name);
            input.description = description;
            if let Some(color) = color {
                input.color = color;
            }
            let project = tracker.create_project(input)?;
            println!("Added project {}", project.id);
        }
        Command::ProjectEdit {
            id,
            name,
            description,
            no_description,
            color,
        } => {
            let patch = project_patch(name, description, no_description, color);
            if patch.is_empty() {
                bail!("nothing to change");
            }
            match tracker.update_project(&id, patch)? {
                Some(project) => println!("Updated project {}", project.id),
                None => println!("No project with id {id}"),
            }
        }
        Command::ProjectRm { id } => {
            if tracker.delete_project(&id) {
                println!("Deleted project {id}");
            } else {
                println!("No project with id {id}");
            }
        }
        Command::Projects => {
            for project in tracker.projects() {
                println!("- [{}] {} ({})", project.id, project.name, project.color);
            }
        }
        Command::List {
            project,
            status,
            priority,
        } => {
            tracker.set_filter(TaskFilter {
                project_id: project,
                status,
                priority,
            });
            let tasks = tracker.filtered_tasks();
            if tasks.is_empty() {
                println!("No tasks found.");
            }
            for task in tasks {
                let project = tracker
                    .project_for(task)
                    .map(|p| format!(" #{}", p.name))
                    .unwrap_or_default();
                let due = task
                    .due_date
                    .map(|d| format!(" due {}", format_date(d)))
                    .unwrap_or_default();
                let flag = due_state(task)
                    .label()
                    .map(|l| format!(" [{l}]"))
                    .unwrap_or_default();
                println!(
                    "- [{}] {} ({}, {}){}{}{}",
                    task.id, task.title, task.status, task.priority, project, due, flag
                );
            }
        }
        Command::Stats => {
            let stats = tracker.stats();
            println!("Total:       {}", stats.total);
            println!("To do:       {}", stats.todo);
            println!("In progress: {}", stats.in_progress);
            println!("Completed:   {} ({}%)", stats.completed, stats.completion_rate());
            println!("Overdue:     {}", stats.overdue);
        }
    }
    Ok(())
}

fn run_board(tracker: &mut Tracker<FileBackend>) -> anyhow::Result<()> {
    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, tracker);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        tracing::error!(%err, "board exited with an error");
        eprintln!("{:?}", err);
    }
    Ok(())
}
