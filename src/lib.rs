//! taskdag - a dependency engine for personal task lists
//!
//! Lets a user declare that one task must wait for another, refuses any
//! declaration that would create a loop, and answers the questions that
//! follow: what can I work on now, what is blocked and by what, in what
//! order can everything be done, and how is one task connected to another.
//!
//! The [`engine`] works against any [`storage::TaskEdgeStore`]; the
//! `taskdag` binary pairs it with a SQLite store in `.taskdag/`.

pub mod cli;
pub mod domain;
pub mod engine;
pub mod logging;
pub mod storage;

pub use domain::{DependencyEdge, OwnerId, Task, TaskId, TaskStatus};
pub use engine::{DependencyEngine, EngineError, ErrorKind};
