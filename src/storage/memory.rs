//! In-memory task/edge store
//!
//! Maps behind a single `RwLock`. Edges are indexed in both directions so
//! prerequisite and dependent lookups are O(degree).

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{StoreError, StoreResult, TaskEdgeStore, TaskQuery};
use crate::domain::{DependencyEdge, OwnerId, Task, TaskId, TaskStatus};

#[derive(Debug, Default)]
struct MemoryInner {
    tasks: HashMap<TaskId, Task>,

    /// Edges keyed by dependent
    by_task: HashMap<TaskId, Vec<DependencyEdge>>,

    /// Edges keyed by prerequisite
    by_depends_on: HashMap<TaskId, Vec<DependencyEdge>>,
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryInner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryInner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }

    /// Stores a new task; fails if the id is already taken
    pub fn insert_task(&self, task: Task) -> StoreResult<()> {
        match self.write()?.tasks.entry(task.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::TaskExists(task.id)),
            Entry::Vacant(slot) => {
                slot.insert(task);
                Ok(())
            }
        }
    }

    /// Changes a task's status and returns the updated task
    pub fn set_status(&self, id: &TaskId, status: TaskStatus) -> StoreResult<Task> {
        let mut inner = self.write()?;
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| StoreError::TaskNotFound(id.clone()))?;
        task.set_status(status);
        Ok(task.clone())
    }

    /// Removes a task together with every edge touching it
    pub fn remove_task(&self, id: &TaskId) -> StoreResult<bool> {
        let mut inner = self.write()?;
        if inner.tasks.remove(id).is_none() {
            return Ok(false);
        }

        let outgoing = inner.by_task.remove(id).unwrap_or_default();
        for edge in outgoing {
            if let Some(list) = inner.by_depends_on.get_mut(&edge.depends_on_task_id) {
                list.retain(|e| &e.task_id != id);
            }
        }

        let incoming = inner.by_depends_on.remove(id).unwrap_or_default();
        for edge in incoming {
            if let Some(list) = inner.by_task.get_mut(&edge.task_id) {
                list.retain(|e| &e.depends_on_task_id != id);
            }
        }

        Ok(true)
    }

    /// Total number of stored edges
    pub fn edge_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.by_task.values().map(Vec::len).sum())
    }
}

impl TaskEdgeStore for MemoryStore {
    fn tasks_by_owner(&self, owner: &OwnerId, query: TaskQuery) -> StoreResult<Vec<Task>> {
        let inner = self.read()?;
        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .filter(|task| task.is_owned_by(owner) && query.matches(task))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }

    fn task_by_id(&self, id: &TaskId) -> StoreResult<Option<Task>> {
        Ok(self.read()?.tasks.get(id).cloned())
    }

    fn edges_by_task(&self, task: &TaskId) -> StoreResult<Vec<DependencyEdge>> {
        Ok(self.read()?.by_task.get(task).cloned().unwrap_or_default())
    }

    fn edges_by_depends_on(&self, task: &TaskId) -> StoreResult<Vec<DependencyEdge>> {
        Ok(self
            .read()?
            .by_depends_on
            .get(task)
            .cloned()
            .unwrap_or_default())
    }

    fn insert_edge(&self, task: &TaskId, depends_on: &TaskId) -> StoreResult<DependencyEdge> {
        let mut inner = self.write()?;

        for id in [task, depends_on] {
            if !inner.tasks.contains_key(id) {
                return Err(StoreError::TaskNotFound(id.clone()));
            }
        }

        let exists = inner
            .by_task
            .get(task)
            .is_some_and(|edges| edges.iter().any(|e| e.connects(task, depends_on)));
        if exists {
            return Err(StoreError::DuplicateEdge {
                task: task.clone(),
                depends_on: depends_on.clone(),
            });
        }

        let edge = DependencyEdge::new(task.clone(), depends_on.clone());
        inner
            .by_task
            .entry(task.clone())
            .or_default()
            .push(edge.clone());
        inner
            .by_depends_on
            .entry(depends_on.clone())
            .or_default()
            .push(edge.clone());

        Ok(edge)
    }

    fn delete_edge(&self, task: &TaskId, depends_on: &TaskId) -> StoreResult<bool> {
        let mut inner = self.write()?;

        let removed = match inner.by_task.get_mut(task) {
            Some(edges) => {
                let before = edges.len();
                edges.retain(|e| !e.connects(task, depends_on));
                edges.len() != before
            }
            None => false,
        };

        if removed {
            if let Some(edges) = inner.by_depends_on.get_mut(depends_on) {
                edges.retain(|e| !e.connects(task, depends_on));
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(name: &str) -> OwnerId {
        OwnerId::new(name).unwrap()
    }

    fn seeded() -> (MemoryStore, Task, Task) {
        let store = MemoryStore::new();
        let a = Task::new(owner("alice"), "Draft contract");
        let b = Task::new(owner("alice"), "Review contract");
        store.insert_task(a.clone()).unwrap();
        store.insert_task(b.clone()).unwrap();
        (store, a, b)
    }

    #[test]
    fn insert_and_lookup_edges_both_directions() {
        let (store, a, b) = seeded();

        store.insert_edge(&b.id, &a.id).unwrap();

        let prereqs = store.edges_by_task(&b.id).unwrap();
        assert_eq!(prereqs.len(), 1);
        assert_eq!(prereqs[0].depends_on_task_id, a.id);

        let dependents = store.edges_by_depends_on(&a.id).unwrap();
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].task_id, b.id);
    }

    #[test]
    fn duplicate_edge_is_rejected() {
        let (store, a, b) = seeded();

        store.insert_edge(&b.id, &a.id).unwrap();
        let err = store.insert_edge(&b.id, &a.id).unwrap_err();

        assert!(matches!(err, StoreError::DuplicateEdge { .. }));
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn edge_to_missing_task_is_rejected() {
        let (store, a, _) = seeded();
        let ghost = Task::new(owner("alice"), "Ghost");

        let err = store.insert_edge(&a.id, &ghost.id).unwrap_err();
        assert!(matches!(err, StoreError::TaskNotFound(id) if id == ghost.id));
    }

    #[test]
    fn delete_edge_reports_presence() {
        let (store, a, b) = seeded();

        store.insert_edge(&b.id, &a.id).unwrap();
        assert!(store.delete_edge(&b.id, &a.id).unwrap());
        assert!(!store.delete_edge(&b.id, &a.id).unwrap());
        assert!(store.edges_by_depends_on(&a.id).unwrap().is_empty());
    }

    #[test]
    fn remove_task_cascades_edges() {
        let (store, a, b) = seeded();
        let c = Task::new(owner("alice"), "Sign contract");
        store.insert_task(c.clone()).unwrap();

        store.insert_edge(&b.id, &a.id).unwrap();
        store.insert_edge(&c.id, &b.id).unwrap();

        assert!(store.remove_task(&b.id).unwrap());
        assert_eq!(store.edge_count().unwrap(), 0);
        assert!(store.edges_by_depends_on(&a.id).unwrap().is_empty());
        assert!(store.edges_by_task(&c.id).unwrap().is_empty());
    }

    #[test]
    fn tasks_by_owner_filters_owner_and_subtasks() {
        let (store, a, b) = seeded();
        let sub = Task::new(owner("alice"), "Subtask").with_parent(a.id.clone());
        let foreign = Task::new(owner("bob"), "Other");
        store.insert_task(sub.clone()).unwrap();
        store.insert_task(foreign).unwrap();

        let top = store.tasks_by_owner(&owner("alice"), TaskQuery::top_level()).unwrap();
        let ids: Vec<_> = top.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a.id) && ids.contains(&b.id));

        let all = store.tasks_by_owner(&owner("alice"), TaskQuery::all()).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn set_status_updates_task() {
        let (store, a, _) = seeded();

        let updated = store.set_status(&a.id, TaskStatus::Completed).unwrap();
        assert!(updated.status.is_complete());
        assert!(store.task_by_id(&a.id).unwrap().unwrap().completed_at.is_some());
    }

    #[test]
    fn insert_task_keeps_existing_owner() {
        let (store, a, _) = seeded();
        let taken = Task::with_id(a.id.clone(), owner("bob"), "Collision");

        let err = store.insert_task(taken).unwrap_err();

        assert!(matches!(err, StoreError::TaskExists(id) if id == a.id));
        let kept = store.task_by_id(&a.id).unwrap().unwrap();
        assert_eq!(kept.owner_id, owner("alice"));
    }
}
