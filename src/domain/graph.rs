//! Dependency graph for one owner's tasks
//!
//! A query-scoped value rebuilt from the store on every request. Nodes are
//! held in a petgraph arena and referenced by index, so the graph never owns
//! cyclic references even when the stored edges are corrupt.
//!
//! The edge direction is prerequisite -> dependent: an edge from B to A means
//! "B must be completed before A".

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use super::edge::DependencyEdge;
use super::id::TaskId;
use super::task::Task;

/// A dependency graph for tasks
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// The underlying directed graph
    graph: DiGraph<Task, DependencyEdge>,

    /// Map from TaskId to node index
    node_map: HashMap<TaskId, NodeIndex>,

    /// Edges skipped because an endpoint is not a node of this graph
    dropped_edges: usize,
}

impl DependencyGraph {
    /// Creates an empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from tasks and the edges among them
    ///
    /// Edges referencing tasks outside `tasks` are silently dropped.
    pub fn from_parts(
        tasks: impl IntoIterator<Item = Task>,
        edges: impl IntoIterator<Item = DependencyEdge>,
    ) -> Self {
        let mut graph = Self::new();

        for task in tasks {
            graph.add_task(task);
        }

        for edge in edges {
            if !graph.add_edge(edge) {
                graph.dropped_edges += 1;
            }
        }

        graph
    }

    /// Adds a task to the graph, replacing the stored copy if already present
    pub fn add_task(&mut self, task: Task) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&task.id) {
            self.graph[idx] = task;
            return idx;
        }
        let id = task.id.clone();
        let idx = self.graph.add_node(task);
        self.node_map.insert(id, idx);
        idx
    }

    /// Adds an edge if both endpoints are nodes; duplicates collapse into one
    pub fn add_edge(&mut self, edge: DependencyEdge) -> bool {
        let (Some(&dependent), Some(&prerequisite)) = (
            self.node_map.get(&edge.task_id),
            self.node_map.get(&edge.depends_on_task_id),
        ) else {
            return false;
        };

        self.graph.update_edge(prerequisite, dependent, edge);
        true
    }

    /// Returns true if the graph contains the task
    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.node_map.contains_key(task_id)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn dropped_edges(&self) -> usize {
        self.dropped_edges
    }

    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        self.node_map.get(task_id).map(|&idx| &self.graph[idx])
    }

    /// Tasks in insertion order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// Edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.graph.edge_references().map(|edge| edge.weight())
    }

    /// Arena view for the layering and traversal algorithms
    pub(crate) fn arena(&self) -> &DiGraph<Task, DependencyEdge> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OwnerId;

    fn make_task(n: u32) -> Task {
        let id: TaskId = format!("t-{:07x}", n).parse().unwrap();
        Task::with_id(id, OwnerId::new("alice").unwrap(), format!("Task {}", n))
    }

    fn edge(task: &Task, depends_on: &Task) -> DependencyEdge {
        DependencyEdge::new(task.id.clone(), depends_on.id.clone())
    }

    #[test]
    fn empty_graph() {
        let graph = DependencyGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn from_parts_links_tasks() {
        let t1 = make_task(1);
        let t2 = make_task(2);

        // t2 depends on t1
        let graph = DependencyGraph::from_parts([t1.clone(), t2.clone()], [edge(&t2, &t1)]);

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edges().next().unwrap();
        assert!(edge.connects(&t2.id, &t1.id));
    }

    #[test]
    fn edges_to_foreign_tasks_are_dropped() {
        let t1 = make_task(1);
        let outsider = make_task(99);

        let graph = DependencyGraph::from_parts([t1.clone()], [edge(&t1, &outsider)]);

        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.dropped_edges(), 1);
    }

    #[test]
    fn duplicate_edges_collapse() {
        let t1 = make_task(1);
        let t2 = make_task(2);

        let graph = DependencyGraph::from_parts(
            [t1.clone(), t2.clone()],
            [edge(&t2, &t1), edge(&t2, &t1)],
        );

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges().count(), 1);
    }

    #[test]
    fn add_task_replaces_existing_copy() {
        let mut graph = DependencyGraph::new();
        let mut task = make_task(1);
        let first = graph.add_task(task.clone());

        task.complete();
        let second = graph.add_task(task.clone());

        assert_eq!(first, second);
        assert_eq!(graph.len(), 1);
        assert!(graph.task(&task.id).unwrap().status.is_complete());
    }

    #[test]
    fn unknown_task_is_absent() {
        let graph = DependencyGraph::from_parts([make_task(1)], []);
        assert!(graph.task(&make_task(2).id).is_none());
        assert!(!graph.contains(&make_task(2).id));
    }
}
