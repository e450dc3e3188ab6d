use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dates::is_overdue_at;
use crate::task::{Priority, Task, TaskStatus};

/// Counts derived from the live task collection. Never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub todo: usize,
    pub overdue: usize,
}

impl Stats {
    /// Percentage of completed tasks, rounded; 0 for an empty collection.
    pub fn completion_rate(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.completed as f64 / self.total as f64 * 100.0).round() as u32
    }
}

pub fn compute_stats_at(tasks: &[Task], now: DateTime<Utc>) -> Stats {
    let mut stats = Stats::default();
    for task in tasks {
        stats.total += 1;
        match task.status {
            TaskStatus::Todo => stats.todo += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::Completed => stats.completed += 1,
        }
        let overdue = task.status != TaskStatus::Completed
            && task.due_date.is_some_and(|due| is_overdue_at(due, now));
        if overdue {
            stats.overdue += 1;
        }
    }
    stats
}

pub fn compute_stats(tasks: &[Task]) -> Stats {
    compute_stats_at(tasks, Utc::now())
}

/// Active equality constraints on the task list. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub project_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
}

impl TaskFilter {
    pub fn is_empty(&self) -> bool {
        self.project_id.is_none() && self.status.is_none() && self.priority.is_none()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(project_id) = &self.project_id {
            if task.project_id.as_ref() != Some(project_id) {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        true
    }
}

/// Tasks passing `filter`, in collection order.
pub fn filter_tasks<'a>(tasks: &'a [Task], filter: &TaskFilter) -> Vec<&'a Task> {
    tasks.iter().filter(|t| filter.matches(t)).collect()
}
