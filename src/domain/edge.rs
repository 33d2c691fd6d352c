//! Dependency edges between tasks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::id::TaskId;

/// `task_id` cannot start until `depends_on_task_id` is completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The dependent task
    pub task_id: TaskId,

    /// The prerequisite task
    pub depends_on_task_id: TaskId,

    pub created_at: DateTime<Utc>,
}

impl DependencyEdge {
    pub fn new(task_id: TaskId, depends_on_task_id: TaskId) -> Self {
        Self {
            task_id,
            depends_on_task_id,
            created_at: Utc::now(),
        }
    }

    /// Returns true if this edge connects the given ordered pair
    pub fn connects(&self, task_id: &TaskId, depends_on_task_id: &TaskId) -> bool {
        &self.task_id == task_id && &self.depends_on_task_id == depends_on_task_id
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} depends on {}", self.task_id, self.depends_on_task_id)
    }
}
