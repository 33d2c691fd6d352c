//! Shortest dependency chain between two tasks
//!
//! Searches forward over "is depended on by" edges, so a path from A to B
//! means finishing A is (transitively) required before B.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use super::error::EngineResult;
use super::repository::DependencyRepository;
use crate::domain::{OwnerId, Task, TaskId};
use crate::storage::TaskEdgeStore;

#[derive(Debug, Clone, Serialize)]
pub struct DependencyPath {
    pub has_path: bool,
    pub path: Vec<Task>,
    /// Edge count, or -1 when no path exists
    pub length: i64,
}

impl DependencyPath {
    fn none() -> Self {
        Self {
            has_path: false,
            path: Vec::new(),
            length: -1,
        }
    }

    fn trivial() -> Self {
        Self {
            has_path: true,
            path: Vec::new(),
            length: 0,
        }
    }
}

pub(crate) fn find_path<S: TaskEdgeStore + ?Sized>(
    repo: &DependencyRepository<'_, S>,
    owner: &OwnerId,
    from: &TaskId,
    to: &TaskId,
) -> EngineResult<DependencyPath> {
    repo.owned_task(owner, from)?;
    repo.owned_task(owner, to)?;

    if from == to {
        return Ok(DependencyPath::trivial());
    }

    let Some(ids) = shortest_chain(repo, from, to)? else {
        return Ok(DependencyPath::none());
    };

    let mut path = Vec::with_capacity(ids.len());
    for id in &ids {
        path.push(repo.owned_task(owner, id)?);
    }

    Ok(DependencyPath {
        has_path: true,
        length: i64::try_from(ids.len() - 1).unwrap_or(i64::MAX),
        path,
    })
}

fn shortest_chain<S: TaskEdgeStore + ?Sized>(
    repo: &DependencyRepository<'_, S>,
    from: &TaskId,
    to: &TaskId,
) -> EngineResult<Option<Vec<TaskId>>> {
    let mut visited: HashSet<TaskId> = HashSet::from([from.clone()]);
    let mut came_from: HashMap<TaskId, TaskId> = HashMap::new();
    let mut queue = VecDeque::from([from.clone()]);

    while let Some(current) = queue.pop_front() {
        for next in repo.dependents(&current)? {
            if !visited.insert(next.clone()) {
                continue;
            }
            came_from.insert(next.clone(), current.clone());

            if &next == to {
                let mut chain = vec![next];
                while let Some(previous) = came_from.get(&chain[chain.len() - 1]) {
                    chain.push(previous.clone());
                }
                chain.reverse();
                return Ok(Some(chain));
            }
            queue.push_back(next);
        }
    }

    Ok(None)
}
