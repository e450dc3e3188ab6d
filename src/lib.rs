//! Personal task and project tracker.
//!
//! The [`Tracker`] owns the task and project collections, persists every
//! change through a [`storage::Backend`] and exposes the derived [`Stats`]
//! and filtered task list. `ui` is a terminal front end over it.

pub mod config;
pub mod dates;
pub mod error;
pub mod logging;
pub mod project;
pub mod stats;
pub mod storage;
pub mod task;
pub mod tracker;
pub mod ui;

pub use error::{StorageError, TrackerError};
pub use project::{NewProject, Project, ProjectPatch};
pub use stats::{compute_stats, filter_tasks, Stats, TaskFilter};
pub use task::{NewTask, Priority, Task, TaskPatch, TaskStatus};
pub use tracker::{Tracker, TrackerView};
