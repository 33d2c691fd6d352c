//! Error types for dependency operations
//!
//! Every failure crosses the engine boundary as a typed [`EngineError`];
//! callers branch on [`EngineError::kind`] instead of matching messages.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::domain::TaskId;
use crate::storage::StoreError;

pub type EngineResult<T> = Result<T, EngineError>;

/// A dependency loop, starting and ending at the same task
///
/// Read left to right as "depends on": `[C, A, B, C]` means C would depend
/// on A, which depends on B, which depends on C.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CyclePath(Vec<TaskId>);

impl CyclePath {
    pub(crate) fn new(tasks: Vec<TaskId>) -> Self {
        Self(tasks)
    }

    pub fn tasks(&self) -> &[TaskId] {
        &self.0
    }

    /// Number of edges in the loop
    pub fn len(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CyclePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", id)?;
        }
        Ok(())
    }
}

/// Closed classification of [`EngineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    NotFound,
    SelfLoop,
    Duplicate,
    Cycle,
    Concurrency,
    Cancelled,
    TimedOut,
    Store,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::SelfLoop => "self-loop",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Cycle => "cycle",
            ErrorKind::Concurrency => "concurrency",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::TimedOut => "timed-out",
            ErrorKind::Store => "store",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Dependency not found: {task} does not depend on {depends_on}")]
    EdgeNotFound { task: TaskId, depends_on: TaskId },

    #[error("A task cannot depend on itself: {0}")]
    SelfLoop(TaskId),

    #[error("Dependency already exists: {task} depends on {depends_on}")]
    Duplicate { task: TaskId, depends_on: TaskId },

    #[error("Adding this dependency would create a loop: {path}")]
    Cycle {
        task: TaskId,
        depends_on: TaskId,
        path: CyclePath,
    },

    #[error("Concurrent change detected while adding {task} -> {depends_on}; retry the operation")]
    Concurrency { task: TaskId, depends_on: TaskId },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound(_) | EngineError::EdgeNotFound { .. } => ErrorKind::NotFound,
            EngineError::SelfLoop(_) => ErrorKind::SelfLoop,
            EngineError::Duplicate { .. } => ErrorKind::Duplicate,
            EngineError::Cycle { .. } => ErrorKind::Cycle,
            EngineError::Concurrency { .. } => ErrorKind::Concurrency,
            EngineError::Cancelled => ErrorKind::Cancelled,
            EngineError::TimedOut(_) => ErrorKind::TimedOut,
            EngineError::Store(_) => ErrorKind::Store,
        }
    }

    /// True when repeating the whole operation once may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Concurrency { .. })
    }

    /// The loop that would have been created, for cycle rejections
    pub fn cycle_path(&self) -> Option<&CyclePath> {
        match self {
            EngineError::Cycle { path, .. } => Some(path),
            _ => None,
        }
    }
}
