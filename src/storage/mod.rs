//! # Storage Layer
//!
//! The dependency engine consumes tasks and edges through the narrow
//! [`TaskEdgeStore`] trait. The host application owns the schema; this
//! module ships two implementations plus the host binary's project layout.
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`MemoryStore`] | Tests, embedding, short-lived sessions |
//! | [`SqliteStore`] | `.taskdag/tasks.db` for the host binary |
//!
//! ## Concurrency Safety
//!
//! - Stores are `Send + Sync`; every call is atomic on its own
//! - [`SqliteStore::insert_edge`] re-checks acyclicity inside an IMMEDIATE
//!   transaction, so writers in other processes cannot slip a cycle past the
//!   engine's in-process lock
//! - Deleting a task cascades to its incident edges in both backends
//!
//! ## Project Structure
//!
//! ```text
//! .taskdag/
//! ├── tasks.db      # SQLite task/edge store
//! ├── config.toml   # Project configuration
//! └── .gitignore    # Ignores the database files
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{DependencyEdge, OwnerId, Task, TaskId};

mod config;
mod memory;
mod project;
mod sqlite;

pub use config::{
    Config, ConfigError, EngineConfig, GlobalConfig, LogSettings, OutputFormat, ProjectConfig,
};
pub use memory::MemoryStore;
pub use project::{Project, ProjectError};
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Dependency already exists: {task} depends on {depends_on}")]
    DuplicateEdge { task: TaskId, depends_on: TaskId },

    #[error("Store rejected {task} -> {depends_on}: the edge would close a dependency cycle")]
    WouldCycle { task: TaskId, depends_on: TaskId },

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Task already exists: {0}")]
    TaskExists(TaskId),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Corrupt record in store: {0}")]
    Corrupt(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Filter for [`TaskEdgeStore::tasks_by_owner`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Leave out tasks that have a parent task
    pub exclude_subtasks: bool,
}

impl TaskQuery {
    /// Top-level tasks only
    pub fn top_level() -> Self {
        Self {
            exclude_subtasks: true,
        }
    }

    /// Every task, subtasks included
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, task: &Task) -> bool {
        !(self.exclude_subtasks && task.is_subtask())
    }
}

/// Durable storage of tasks and dependency edges, scoped per owner
///
/// Implementations must be thread-safe. Results are returned in a stable
/// order (tasks by creation time, edges by insertion) so graph assembly is
/// deterministic for a given store state.
pub trait TaskEdgeStore: Send + Sync {
    /// All tasks of one owner
    fn tasks_by_owner(&self, owner: &OwnerId, query: TaskQuery) -> StoreResult<Vec<Task>>;

    /// A single task, regardless of owner
    fn task_by_id(&self, id: &TaskId) -> StoreResult<Option<Task>>;

    /// Edges where `task` is the dependent (its prerequisites)
    fn edges_by_task(&self, task: &TaskId) -> StoreResult<Vec<DependencyEdge>>;

    /// Edges where `task` is the prerequisite (its dependents)
    fn edges_by_depends_on(&self, task: &TaskId) -> StoreResult<Vec<DependencyEdge>>;

    /// Inserts an edge; fails with [`StoreError::DuplicateEdge`] if present
    fn insert_edge(&self, task: &TaskId, depends_on: &TaskId) -> StoreResult<DependencyEdge>;

    /// Deletes an edge, returning false if it did not exist
    fn delete_edge(&self, task: &TaskId, depends_on: &TaskId) -> StoreResult<bool>;
}

impl<S: TaskEdgeStore + ?Sized> TaskEdgeStore for Arc<S> {
    fn tasks_by_owner(&self, owner: &OwnerId, query: TaskQuery) -> StoreResult<Vec<Task>> {
        (**self).tasks_by_owner(owner, query)
    }

    fn task_by_id(&self, id: &TaskId) -> StoreResult<Option<Task>> {
        (**self).task_by_id(id)
    }

    fn edges_by_task(&self, task: &TaskId) -> StoreResult<Vec<DependencyEdge>> {
        (**self).edges_by_task(task)
    }

    fn edges_by_depends_on(&self, task: &TaskId) -> StoreResult<Vec<DependencyEdge>> {
        (**self).edges_by_depends_on(task)
    }

    fn insert_edge(&self, task: &TaskId, depends_on: &TaskId) -> StoreResult<DependencyEdge> {
        (**self).insert_edge(task, depends_on)
    }

    fn delete_edge(&self, task: &TaskId, depends_on: &TaskId) -> StoreResult<bool> {
        (**self).delete_edge(task, depends_on)
    }
}
