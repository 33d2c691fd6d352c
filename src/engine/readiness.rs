//! Ready and blocked task queries
//!
//! A pending task is ready when every one of its prerequisites is
//! completed. Cancelled or in-progress prerequisites still block.

use std::cmp::Reverse;
use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use super::error::EngineResult;
use super::repository::DependencyRepository;
use crate::domain::{OwnerId, Task, TaskId};
use crate::storage::TaskEdgeStore;

/// Whether one task may start, and what is holding it back
#[derive(Debug, Clone, Serialize)]
pub struct StartCheck {
    pub can_start: bool,
    pub blocked_by: Vec<Task>,
}

/// A pending task waiting on unfinished prerequisites
#[derive(Debug, Clone, Serialize)]
pub struct BlockedTask {
    pub task: Task,
    pub blocked_by: Vec<Task>,
}

pub(crate) fn ready_tasks<S: TaskEdgeStore + ?Sized>(
    repo: &DependencyRepository<'_, S>,
    owner: &OwnerId,
) -> EngineResult<Vec<Task>> {
    let (tasks, index) = load_owner(repo, owner)?;

    let mut ready = Vec::new();
    for task in tasks.iter().filter(|task| task.status.is_pending()) {
        if unfinished_prerequisites(repo, task, &index)?.is_empty() {
            ready.push(task.clone());
        }
    }

    sort_by_urgency(&mut ready);
    Ok(ready)
}

pub(crate) fn blocked_tasks<S: TaskEdgeStore + ?Sized>(
    repo: &DependencyRepository<'_, S>,
    owner: &OwnerId,
) -> EngineResult<Vec<BlockedTask>> {
    let (tasks, index) = load_owner(repo, owner)?;

    let mut blocked = Vec::new();
    for task in tasks.iter().filter(|task| task.status.is_pending()) {
        let blocked_by = unfinished_prerequisites(repo, task, &index)?;
        if !blocked_by.is_empty() {
            blocked.push(BlockedTask {
                task: task.clone(),
                blocked_by,
            });
        }
    }

    Ok(blocked)
}

/// Checks one task's prerequisites, whatever the task's own status
pub(crate) fn can_start<S: TaskEdgeStore + ?Sized>(
    repo: &DependencyRepository<'_, S>,
    owner: &OwnerId,
    task_id: &TaskId,
) -> EngineResult<StartCheck> {
    let task = repo.owned_task(owner, task_id)?;
    let blocked_by = unfinished_prerequisites(repo, &task, &HashMap::new())?;

    Ok(StartCheck {
        can_start: blocked_by.is_empty(),
        blocked_by,
    })
}

type TaskIndex = HashMap<TaskId, Task>;

fn load_owner<S: TaskEdgeStore + ?Sized>(
    repo: &DependencyRepository<'_, S>,
    owner: &OwnerId,
) -> EngineResult<(Vec<Task>, TaskIndex)> {
    let tasks = repo.owner_tasks(owner)?;
    let index = tasks
        .iter()
        .map(|task| (task.id.clone(), task.clone()))
        .collect();
    Ok((tasks, index))
}

/// Prerequisites of `task` that are not completed, in edge order
///
/// `known` saves a store lookup for tasks already loaded; anything else is
/// fetched individually.
fn unfinished_prerequisites<S: TaskEdgeStore + ?Sized>(
    repo: &DependencyRepository<'_, S>,
    task: &Task,
    known: &TaskIndex,
) -> EngineResult<Vec<Task>> {
    let mut unfinished = Vec::new();

    for prerequisite in repo.prerequisites(&task.id)? {
        let found = match known.get(&prerequisite) {
            Some(found) => Some(found.clone()),
            None => repo.task(&prerequisite)?,
        };

        match found {
            Some(found) if !found.status.is_complete() => unfinished.push(found),
            Some(_) => {}
            None => {
                warn!(task = %task.id, %prerequisite, "edge points at a missing task; ignoring it");
            }
        }
    }

    Ok(unfinished)
}

fn sort_by_urgency(tasks: &mut [Task]) {
    // Stable sort: equal tasks keep store order
    tasks.sort_by_key(|task| {
        (
            Reverse(task.priority),
            task.due_date.is_none(),
            task.due_date,
        )
    });
}
