//! Task domain model
//!
//! Tasks are created and edited by the host's task-management screens. The
//! dependency engine only reads the fields it needs for display and
//! readiness: `status`, `priority`, `due_date` and `title`, plus
//! `parent_task_id` to leave subtasks out of the graph view.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::id::{OwnerId, TaskId};

#[derive(Debug, Error, PartialEq)]
pub enum TaskFieldError {
    #[error("Unknown task status '{0}' (expected pending, in_progress, blocked, completed or cancelled)")]
    UnknownStatus(String),

    #[error("Unknown priority '{0}' (expected low, medium, high or urgent)")]
    UnknownPriority(String),
}

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Blocked,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
    ];

    /// Returns true if this status satisfies dependents waiting on the task
    pub fn is_complete(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Returns true if this task is not yet started
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskStatus::Pending)
    }

    /// Returns true if this task is currently being worked on
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| TaskFieldError::UnknownStatus(s.to_string()))
    }
}

/// Priority of a task
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == normalized)
            .ok_or_else(|| TaskFieldError::UnknownPriority(s.to_string()))
    }
}

/// A task owned by exactly one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Owning user; edges only connect tasks of the same owner
    pub owner_id: OwnerId,

    /// Human-readable title
    pub title: String,

    /// Current status
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    /// Set on subtasks; subtasks are excluded from the dependency graph view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<TaskId>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,

    /// When the task was completed (if completed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new pending task with a freshly generated ID
    pub fn new(owner_id: OwnerId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        let title = title.into();
        Self::with_id(TaskId::new(&title, now), owner_id, title)
    }

    /// Creates a new pending task with a caller-chosen ID
    pub fn with_id(id: TaskId, owner_id: OwnerId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner_id,
            title: title.into(),
            status: TaskStatus::Pending,
            priority: Priority::default(),
            due_date: None,
            parent_task_id: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Returns true if this task hangs under another task
    pub fn is_subtask(&self) -> bool {
        self.parent_task_id.is_some()
    }

    /// Returns true if the task belongs to `owner`
    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        &self.owner_id == owner
    }

    /// Moves the task to `status`, maintaining `completed_at`
    pub fn set_status(&mut self, status: TaskStatus) {
        if self.status == status {
            return;
        }
        let now = Utc::now();
        self.completed_at = if status.is_complete() { Some(now) } else { None };
        self.status = status;
        self.updated_at = now;
    }

    /// Transitions to completed status
    pub fn complete(&mut self) {
        self.set_status(TaskStatus::Completed);
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_parent(mut self, parent: TaskId) -> Self {
        self.parent_task_id = Some(parent);
        self
    }
}
