use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::TrackerError;
use crate::project::{seed_projects, NewProject, Project, ProjectPatch};
use crate::stats::{compute_stats, filter_tasks, Stats, TaskFilter};
use crate::storage::{Backend, Persisted, Store};
use crate::task::{NewTask, Priority, Task, TaskPatch, TaskStatus};

pub const TASKS_KEY: &str = "tasks";
pub const PROJECTS_KEY: &str = "projects";

/// What subscribers and renderers see after each change.
#[derive(Debug)]
pub struct TrackerView<'a> {
    pub tasks: &'a [Task],
    pub projects: &'a [Project],
    pub stats: Stats,
    pub filtered: Vec<&'a Task>,
}

type Subscriber = Box<dyn Fn(&TrackerView<'_>)>;

/// Owns the task and project collections and the active filter. Each
/// mutation replaces a whole collection, writes it through to the store and
/// then notifies subscribers.
pub struct Tracker<B> {
    store: Store<B>,
    tasks: Persisted<Vec<Task>>,
    projects: Persisted<Vec<Project>>,
    filter: TaskFilter,
    subscribers: Vec<Subscriber>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// An empty project reference means "no project".
fn project_ref(project_id: Option<String>) -> Option<String> {
    project_id.filter(|id| !id.trim().is_empty())
}

fn require(field: &'static str, value: &str) -> Result<(), TrackerError> {
    if value.trim().is_empty() {
        return Err(TrackerError::Validation { field });
    }
    Ok(())
}

impl<B: Backend> Tracker<B> {
    pub fn open(backend: B) -> Self {
        let store = Store::new(backend);
        let tasks = Persisted::load(&store, TASKS_KEY, Vec::new());
        let projects = Persisted::load(&store, PROJECTS_KEY, seed_projects(Utc::now()));
        debug!(
            tasks = tasks.get().len(),
            projects = projects.get().len(),
            "tracker loaded"
        );
        Self {
            store,
            tasks,
            projects,
            filter: TaskFilter::default(),
            subscribers: Vec::new(),
        }
    }

    pub fn store(&self) -> &Store<B> {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        self.tasks.get()
    }

    pub fn projects(&self) -> &[Project] {
        self.projects.get()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks().iter().find(|t| t.id == id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects().iter().find(|p| p.id == id)
    }

    /// The task's project, or `None` if it has none or it was deleted.
    pub fn project_for(&self, task: &Task) -> Option<&Project> {
        task.project_id.as_deref().and_then(|id| self.project(id))
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn stats(&self) -> Stats {
        compute_stats(self.tasks())
    }

    pub fn filtered_tasks(&self) -> Vec<&Task> {
        filter_tasks(self.tasks(), &self.filter)
    }

    pub fn view(&self) -> TrackerView<'_> {
        TrackerView {
            tasks: self.tasks(),
            projects: self.projects(),
            stats: self.stats(),
            filtered: self.filtered_tasks(),
        }
    }

    pub fn subscribe(&mut self, callback: impl Fn(&TrackerView<'_>) + 'static) {
        self.subscribers.push(Box::new(callback));
    }

    fn notify(&self) {
        if self.subscribers.is_empty() {
            return;
        }
        let view = self.view();
        for subscriber in &self.subscribers {
            subscriber(&view);
        }
    }

    fn replace_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks.set(&mut self.store, tasks);
        self.notify();
    }

    fn replace_projects(&mut self, projects: Vec<Project>) {
        self.projects.set(&mut self.store, projects);
        self.notify();
    }

    pub fn create_task(&mut self, input: NewTask) -> Result<Task, TrackerError> {
        require("title", &input.title)?;
        let task = Task {
            id: new_id(),
            title: input.title,
            description: input.description,
            priority: input.priority,
            status: input.status,
            due_date: input.due_date,
            project_id: project_ref(input.project_id),
            created_at: Utc::now(),
        };
        debug!(id = %task.id, "creating task");
        let mut tasks = self.tasks().to_vec();
        tasks.push(task.clone());
        self.replace_tasks(tasks);
        Ok(task)
    }

    /// `Ok(None)` when no task has `id`; nothing is written in that case.
    pub fn update_task(
        &mut self,
        id: &str,
        mut patch: TaskPatch,
    ) -> Result<Option<Task>, TrackerError> {
        if let Some(title) = &patch.title {
            require("title", title)?;
        }
        patch.project_id = patch.project_id.map(project_ref);
        let Some(index) = self.tasks().iter().position(|t| t.id == id) else {
            debug!(id, "update of unknown task ignored");
            return Ok(None);
        };
        let mut tasks = self.tasks().to_vec();
        patch.apply(&mut tasks[index]);
        let updated = tasks[index].clone();
        debug!(id, "updating task");
        self.replace_tasks(tasks);
        Ok(Some(updated))
    }

    /// Returns whether a task was removed.
    pub fn delete_task(&mut self, id: &str) -> bool {
        if self.task(id).is_none() {
            debug!(id, "delete of unknown task ignored");
            return false;
        }
        let tasks = self.tasks().iter().filter(|t| t.id != id).cloned().collect();
        debug!(id, "deleting task");
        self.replace_tasks(tasks);
        true
    }

    /// Moves the task one step along todo -> in-progress -> completed -> todo.
    pub fn toggle_task_status(&mut self, id: &str) -> Option<TaskStatus> {
        let index = self.tasks().iter().position(|t| t.id == id)?;
        let mut tasks = self.tasks().to_vec();
        let next = tasks[index].status.next();
        tasks[index].status = next;
        debug!(id, status = %next, "toggling task status");
        self.replace_tasks(tasks);
        Some(next)
    }

    pub fn create_project(&mut self, input: NewProject) -> Result<Project, TrackerError> {
        require("name", &input.name)?;
        let project = Project {
            id: new_id(),
            name: input.name,
            description: input.description,
            color: input.color,
            created_at: Utc::now(),
        };
        debug!(id = %project.id, "creating project");
        let mut projects = self.projects().to_vec();
        projects.push(project.clone());
        self.replace_projects(projects);
        Ok(project)
    }

    pub fn update_project(
        &mut self,
        id: &str,
        patch: ProjectPatch,
    ) -> Result<Option<Project>, TrackerError> {
        if let Some(name) = &patch.name {
            require("name", name)?;
        }
        let Some(index) = self.projects().iter().position(|p| p.id == id) else {
            debug!(id, "update of unknown project ignored");
            return Ok(None);
        };
        let mut projects = self.projects().to_vec();
        patch.apply(&mut projects[index]);
        let updated = projects[index].clone();
        debug!(id, "updating project");
        self.replace_projects(projects);
        Ok(Some(updated))
    }

    /// Tasks that reference the project keep their `project_id`.
    pub fn delete_project(&mut self, id: &str) -> bool {
        if self.project(id).is_none() {
            debug!(id, "delete of unknown project ignored");
            return false;
        }
        let projects = self.projects().iter().filter(|p| p.id != id).cloned().collect();
        debug!(id, "deleting project");
        self.replace_projects(projects);
        true
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
        self.notify();
    }

    pub fn set_project_filter(&mut self, project_id: Option<String>) {
        self.filter.project_id = project_id;
        self.notify();
    }

    pub fn set_status_filter(&mut self, status: Option<TaskStatus>) {
        self.filter.status = status;
        self.notify();
    }

    pub fn set_priority_filter(&mut self, priority: Option<Priority>) {
        self.filter.priority = priority;
        self.notify();
    }
}
