//! Builds an owner's dependency graph from the store
//!
//! Nodes are the owner's top-level tasks; only edges whose endpoints are
//! both nodes are kept.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use super::error::EngineResult;
use super::layering::Layering;
use super::repository::DependencyRepository;
use crate::domain::{DependencyEdge, DependencyGraph, OwnerId, Priority, TaskId, TaskStatus};
use crate::storage::TaskEdgeStore;

pub(crate) fn assemble<S: TaskEdgeStore + ?Sized>(
    repo: &DependencyRepository<'_, S>,
    owner: &OwnerId,
    large_graph_threshold: usize,
) -> EngineResult<DependencyGraph> {
    let tasks = repo.owner_tasks(owner)?;

    if large_graph_threshold > 0 && tasks.len() > large_graph_threshold {
        warn!(
            %owner,
            tasks = tasks.len(),
            threshold = large_graph_threshold,
            "assembling a large dependency graph"
        );
    }

    let mut edges = Vec::new();
    for task in &tasks {
        edges.extend(repo.prerequisite_edges(&task.id)?);
    }

    let graph = DependencyGraph::from_parts(tasks, edges);
    debug!(
        %owner,
        nodes = graph.len(),
        edges = graph.edge_count(),
        dropped = graph.dropped_edges(),
        "assembled dependency graph"
    );

    Ok(graph)
}

/// A task as shown in a graph view
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// None for tasks caught in a loop
    pub level: Option<usize>,
}

/// Serializable view of an owner's graph with its layering
#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<DependencyEdge>,
    pub levels: Vec<Vec<TaskId>>,
    pub cyclic: bool,
}

impl GraphView {
    pub fn new(graph: &DependencyGraph, layering: Layering) -> Self {
        let nodes = graph
            .tasks()
            .map(|task| GraphNode {
                id: task.id.clone(),
                title: task.title.clone(),
                status: task.status,
                priority: task.priority,
                due_date: task.due_date,
                level: layering.level_of(&task.id),
            })
            .collect();

        Self {
            nodes,
            edges: graph.edges().cloned().collect(),
            levels: layering.levels,
            cyclic: layering.cyclic,
        }
    }

    pub fn node(&self, id: &TaskId) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }
}
