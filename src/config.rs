use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::project::ProjectPatch;
use crate::task::{Priority, TaskPatch, TaskStatus};

pub const DEFAULT_DATA_DIR: &str = ".taskers";
pub const LOG_FILE_NAME: &str = "taskers.log";

#[derive(Debug, Parser)]
#[command(name = "taskers")]
#[command(version, about = "Personal task and project tracker")]
pub struct Cli {
    /// Directory holding tasks.json and projects.json
    #[arg(long, global = true, env = "TASKERS_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log file (defaults to taskers.log inside the data directory)
    #[arg(long, global = true, env = "TASKERS_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "taskers=trace"
    #[arg(long, global = true, env = "TASKERS_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive board (the default)
    Ui,
    /// Add a task
    Add {
        title: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Change fields of a task
    Edit {
        id: String,
        #[command(flatten)]
        changes: TaskEdit,
    },
    /// Advance a task to its next status
    Toggle { id: String },
    /// Delete a task
    Rm { id: String },
    /// Add a project
    ProjectAdd {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Change fields of a project
    ProjectEdit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "no_description")]
        description: Option<String>,
        /// Remove the description
        #[arg(long)]
        no_description: bool,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a project (its tasks are kept)
    ProjectRm { id: String },
    /// List projects
    Projects,
    /// List tasks, optionally filtered
    List {
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        priority: Option<Priority>,
    },
    /// Show task statistics
    Stats,
}

#[derive(Debug, Args)]
pub struct TaskFields {
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub priority: Option<Priority>,
    #[arg(long)]
    pub status: Option<TaskStatus>,
    /// Due date as YYYY-MM-DD
    #[arg(long, value_name = "DATE")]
    pub due: Option<NaiveDate>,
    /// Project id
    #[arg(long)]
    pub project: Option<String>,
}

/// Arguments of `edit`. An empty `--description` or `--project` clears the
/// field, as do the `--no-*` flags.
#[derive(Debug, Args)]
pub struct TaskEdit {
    #[arg(long)]
    pub title: Option<String>,
    #[command(flatten)]
    pub fields: TaskFields,
    /// Remove the description
    #[arg(long, conflicts_with = "description")]
    pub no_description: bool,
    /// Remove the due date
    #[arg(long, conflicts_with = "due")]
    pub no_due: bool,
    /// Detach from its project
    #[arg(long, conflicts_with = "project")]
    pub no_project: bool,
}

fn change(value: Option<String>, clear: bool) -> Option<Option<String>> {
    if clear {
        return Some(None);
    }
    value.map(|v| Some(v).filter(|v| !v.trim().is_empty()))
}

impl TaskEdit {
    pub fn into_patch(self) -> TaskPatch {
        let fields = self.fields;
        TaskPatch {
            title: self.title,
            description: change(fields.description, self.no_description),
            priority: fields.priority,
            status: fields.status,
            due_date: if self.no_due { Some(None) } else { fields.due.map(Some) },
            project_id: change(fields.project, self.no_project),
        }
    }
}

/// Patch for `project-edit`.
pub fn project_patch(
    name: Option<String>,
    description: Option<String>,
    no_description: bool,
    color: Option<String>,
) -> ProjectPatch {
    ProjectPatch {
        name,
        description: change(description, no_description),
        color,
    }
}

/// Settings resolved from the command line and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
    pub log_level: String,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        let data_dir = cli
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let log_file = cli
            .log_file
            .clone()
            .unwrap_or_else(|| data_dir.join(LOG_FILE_NAME));
        Self {
            data_dir,
            log_file,
            log_level: cli.log_level.clone(),
        }
    }
}
