//! Edge validation
//!
//! A new edge `task -> depends_on` closes a loop exactly when `task` is
//! already reachable from `depends_on` by following "depends on" edges. The
//! guard answers that with a targeted breadth-first search instead of
//! rebuilding the owner's whole graph, and reports the loop it found.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;
use tracing::debug;

use super::error::{CyclePath, EngineError, EngineResult};
use super::repository::DependencyRepository;
use crate::domain::{DependencyEdge, OwnerId, TaskId};
use crate::storage::TaskEdgeStore;

/// Why a proposed edge is not allowed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum RejectReason {
    SelfLoop,
    Duplicate,
    NotFound { task: TaskId },
    Cycle { path: CyclePath },
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::SelfLoop => "self-loop",
            RejectReason::Duplicate => "duplicate",
            RejectReason::NotFound { .. } => "not-found",
            RejectReason::Cycle { .. } => "cycle",
        }
    }

    pub(crate) fn into_error(self, task: &TaskId, depends_on: &TaskId) -> EngineError {
        match self {
            RejectReason::SelfLoop => EngineError::SelfLoop(task.clone()),
            RejectReason::Duplicate => EngineError::Duplicate {
                task: task.clone(),
                depends_on: depends_on.clone(),
            },
            RejectReason::NotFound { task: missing } => EngineError::NotFound(missing),
            RejectReason::Cycle { path } => EngineError::Cycle {
                task: task.clone(),
                depends_on: depends_on.clone(),
                path,
            },
        }
    }
}

/// Outcome of a dry-run edge check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeCheck {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

impl EdgeCheck {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn rejected(reason: RejectReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Applies every rule to a proposed edge without writing anything
///
/// Rules are checked in a fixed order (self-loop, existence, duplicate,
/// cycle) so a given request always reports the same violation.
pub(crate) fn check_edge<S: TaskEdgeStore + ?Sized>(
    repo: &DependencyRepository<'_, S>,
    owner: &OwnerId,
    task: &TaskId,
    depends_on: &TaskId,
) -> EngineResult<EdgeCheck> {
    if task == depends_on {
        return Ok(EdgeCheck::rejected(RejectReason::SelfLoop));
    }

    for id in [task, depends_on] {
        if repo.find_owned(owner, id)?.is_none() {
            return Ok(EdgeCheck::rejected(RejectReason::NotFound { task: id.clone() }));
        }
    }

    if repo.edge_exists(task, depends_on)? {
        return Ok(EdgeCheck::rejected(RejectReason::Duplicate));
    }

    if let Some(path) = find_cycle(repo, task, depends_on)? {
        return Ok(EdgeCheck::rejected(RejectReason::Cycle { path }));
    }

    Ok(EdgeCheck::allowed())
}

/// Checks a proposed edge and writes it when every rule passes
///
/// The caller must hold the owner's lock so no other in-process writer can
/// change the graph between the check and the write.
pub(crate) fn insert_checked<S: TaskEdgeStore + ?Sized>(
    repo: &DependencyRepository<'_, S>,
    owner: &OwnerId,
    task: &TaskId,
    depends_on: &TaskId,
) -> EngineResult<DependencyEdge> {
    let check = check_edge(repo, owner, task, depends_on)?;
    if let Some(reason) = check.reason {
        debug!(%task, %depends_on, rule = reason.as_str(), "edge rejected");
        return Err(reason.into_error(task, depends_on));
    }

    repo.insert_edge(task, depends_on)
}

/// Searches for `task` among everything `depends_on` transitively depends on
///
/// Returns the loop the new edge would close, as
/// `[task, depends_on, ..., task]`.
pub(crate) fn find_cycle<S: TaskEdgeStore + ?Sized>(
    repo: &DependencyRepository<'_, S>,
    task: &TaskId,
    depends_on: &TaskId,
) -> EngineResult<Option<CyclePath>> {
    let mut visited: HashSet<TaskId> = HashSet::new();
    let mut came_from: HashMap<TaskId, TaskId> = HashMap::new();
    let mut queue = VecDeque::new();

    visited.insert(depends_on.clone());
    queue.push_back(depends_on.clone());

    while let Some(current) = queue.pop_front() {
        repo.cancel().check()?;

        for next in repo.prerequisites(&current)? {
            if !visited.insert(next.clone()) {
                continue;
            }
            came_from.insert(next.clone(), current.clone());

            if &next == task {
                return Ok(Some(trace_loop(&came_from, task, depends_on)));
            }
            queue.push_back(next);
        }
    }

    Ok(None)
}

fn trace_loop(came_from: &HashMap<TaskId, TaskId>, task: &TaskId, depends_on: &TaskId) -> CyclePath {
    // Walk back from `task` to the search root, then reverse
    let mut chain = vec![task.clone()];
    let mut current = task;
    while current != depends_on {
        match came_from.get(current) {
            Some(previous) => {
                chain.push(previous.clone());
                current = previous;
            }
            None => break,
        }
    }
    chain.reverse();

    let mut path = Vec::with_capacity(chain.len() + 1);
    path.push(task.clone());
    path.extend(chain);
    CyclePath::new(path)
}
