//! Owner-scoped access to the task/edge store
//!
//! Every store round-trip goes through here so the cancellation token is
//! checked before each one, and store-level failures are translated into
//! engine errors in one place.

use tracing::debug;

use super::cancel::CancelToken;
use super::error::{EngineError, EngineResult};
use crate::domain::{DependencyEdge, OwnerId, Task, TaskId};
use crate::storage::{StoreError, TaskEdgeStore, TaskQuery};

pub(crate) struct DependencyRepository<'a, S: ?Sized> {
    store: &'a S,
    cancel: &'a CancelToken,
}

impl<'a, S: TaskEdgeStore + ?Sized> DependencyRepository<'a, S> {
    pub fn new(store: &'a S, cancel: &'a CancelToken) -> Self {
        Self { store, cancel }
    }

    pub fn cancel(&self) -> &CancelToken {
        self.cancel
    }

    /// Looks up a task, treating another owner's task as absent
    pub fn find_owned(&self, owner: &OwnerId, id: &TaskId) -> EngineResult<Option<Task>> {
        self.cancel.check()?;
        let task = self.store.task_by_id(id)?;
        Ok(task.filter(|task| task.is_owned_by(owner)))
    }

    pub fn owned_task(&self, owner: &OwnerId, id: &TaskId) -> EngineResult<Task> {
        self.find_owned(owner, id)?
            .ok_or_else(|| EngineError::NotFound(id.clone()))
    }

    /// Looks up any task by id
    pub fn task(&self, id: &TaskId) -> EngineResult<Option<Task>> {
        self.cancel.check()?;
        Ok(self.store.task_by_id(id)?)
    }

    /// The owner's top-level tasks in store order
    pub fn owner_tasks(&self, owner: &OwnerId) -> EngineResult<Vec<Task>> {
        self.cancel.check()?;
        Ok(self.store.tasks_by_owner(owner, TaskQuery::top_level())?)
    }

    /// Edges naming `task` as the dependent
    pub fn prerequisite_edges(&self, task: &TaskId) -> EngineResult<Vec<DependencyEdge>> {
        self.cancel.check()?;
        Ok(self.store.edges_by_task(task)?)
    }

    /// Ids of the tasks `task` depends on
    pub fn prerequisites(&self, task: &TaskId) -> EngineResult<Vec<TaskId>> {
        Ok(self
            .prerequisite_edges(task)?
            .into_iter()
            .map(|edge| edge.depends_on_task_id)
            .collect())
    }

    /// Ids of the tasks that depend on `task`
    pub fn dependents(&self, task: &TaskId) -> EngineResult<Vec<TaskId>> {
        self.cancel.check()?;
        Ok(self
            .store
            .edges_by_depends_on(task)?
            .into_iter()
            .map(|edge| edge.task_id)
            .collect())
    }

    pub fn edge_exists(&self, task: &TaskId, depends_on: &TaskId) -> EngineResult<bool> {
        Ok(self
            .prerequisite_edges(task)?
            .iter()
            .any(|edge| edge.connects(task, depends_on)))
    }

    /// Writes an edge that has already passed the cycle guard
    ///
    /// A store-side duplicate or cycle at this point means another writer
    /// changed the graph between the check and the write.
    pub fn insert_edge(&self, task: &TaskId, depends_on: &TaskId) -> EngineResult<DependencyEdge> {
        self.cancel.check()?;
        match self.store.insert_edge(task, depends_on) {
            Ok(edge) => Ok(edge),
            Err(StoreError::DuplicateEdge { .. }) | Err(StoreError::WouldCycle { .. }) => {
                debug!(%task, %depends_on, "store rejected a checked edge");
                Err(EngineError::Concurrency {
                    task: task.clone(),
                    depends_on: depends_on.clone(),
                })
            }
            Err(StoreError::TaskNotFound(id)) => Err(EngineError::NotFound(id)),
            Err(other) => Err(other.into()),
        }
    }

    pub fn delete_edge(&self, task: &TaskId, depends_on: &TaskId) -> EngineResult<bool> {
        self.cancel.check()?;
        Ok(self.store.delete_edge(task, depends_on)?)
    }
}
