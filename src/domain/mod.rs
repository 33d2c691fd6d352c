//! Domain models for the dependency engine
//!
//! Contains the core types without any I/O concerns.

mod id;
mod task;
mod edge;
mod graph;

pub use id::{IdError, OwnerId, TaskId};
pub use task::{Priority, Task, TaskFieldError, TaskStatus};
pub use edge::DependencyEdge;
pub use graph::DependencyGraph;
