//! Execution levels via Kahn's algorithm
//!
//! Level 0 holds tasks with no prerequisites; every other task sits one
//! level above its deepest prerequisite. Tasks on a loop never reach
//! in-degree zero, so they are left out and the result is marked cyclic.

use std::collections::{HashMap, VecDeque};

use petgraph::graph::NodeIndex;
use petgraph::Direction;
use serde::Serialize;
use tracing::warn;

use crate::domain::{DependencyGraph, TaskId};

/// Tasks grouped by execution level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Layering {
    pub levels: Vec<Vec<TaskId>>,
    pub cyclic: bool,
    #[serde(skip)]
    depth: HashMap<TaskId, usize>,
}

impl Layering {
    /// Level of a task, or None if it was not placed
    pub fn level_of(&self, id: &TaskId) -> Option<usize> {
        self.depth.get(id).copied()
    }

    /// Number of tasks that received a level
    pub fn placed(&self) -> usize {
        self.depth.len()
    }
}

/// Computes levels for every task in `graph`
///
/// Within a level, tasks keep the order they were added to the graph.
pub fn layer(graph: &DependencyGraph) -> Layering {
    let arena = graph.arena();
    let count = arena.node_count();

    let mut in_degree: Vec<usize> = arena
        .node_indices()
        .map(|idx| arena.neighbors_directed(idx, Direction::Incoming).count())
        .collect();
    let mut level = vec![0usize; count];
    let mut placed = vec![false; count];

    let mut queue: VecDeque<NodeIndex> = arena
        .node_indices()
        .filter(|idx| in_degree[idx.index()] == 0)
        .collect();

    while let Some(node) = queue.pop_front() {
        placed[node.index()] = true;
        let next_level = level[node.index()] + 1;

        for dependent in arena.neighbors_directed(node, Direction::Outgoing) {
            let d = dependent.index();
            level[d] = level[d].max(next_level);
            in_degree[d] -= 1;
            if in_degree[d] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    let mut layering = Layering::default();
    for idx in arena.node_indices() {
        if !placed[idx.index()] {
            layering.cyclic = true;
            continue;
        }
        let depth = level[idx.index()];
        if layering.levels.len() <= depth {
            layering.levels.resize_with(depth + 1, Vec::new);
        }
        let id = arena[idx].id.clone();
        layering.levels[depth].push(id.clone());
        layering.depth.insert(id, depth);
    }

    if layering.cyclic {
        warn!(
            unplaced = count - layering.placed(),
            "dependency graph contains a cycle; affected tasks have no level"
        );
    }

    layering
}
