//! Task CLI commands

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use tracing::debug;

use super::app::Workspace;
use super::output::Output;
use crate::domain::{Priority, Task, TaskId, TaskStatus};
use crate::storage::{StoreError, TaskEdgeStore, TaskQuery};

/// Fresh ids to try before giving up on a colliding task id
const ID_ATTEMPTS: usize = 8;

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task
    ///
    /// Examples:
    ///   taskdag task add "Call client"
    ///   taskdag task add "Send proposal" --priority high --due 2026-11-01
    ///   taskdag task add "Check pricing" --parent t-1a2b3c4
    Add {
        /// Task title
        title: String,

        /// low, medium, high or urgent
        #[arg(long, short, default_value = "medium")]
        priority: Priority,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,

        /// Make this a subtask of another task
        #[arg(long)]
        parent: Option<TaskId>,
    },

    /// List tasks
    List {
        /// Include subtasks
        #[arg(long)]
        all: bool,

        /// Only tasks with this status
        #[arg(long)]
        status: Option<TaskStatus>,
    },

    /// Show task details and its dependencies
    Show {
        /// Task ID
        id: TaskId,
    },

    /// Set a task's status (pending, in_progress, blocked, completed, cancelled)
    ///
    /// Moving to in_progress requires every prerequisite to be completed.
    Status {
        /// Task ID
        id: TaskId,

        /// New status
        status: TaskStatus,

        /// Start even if prerequisites are unfinished
        #[arg(long)]
        force: bool,
    },

    /// Mark task as in progress
    Start {
        /// Task ID
        id: TaskId,

        /// Start even if prerequisites are unfinished
        #[arg(long)]
        force: bool,
    },

    /// Mark task as completed
    Done {
        /// Task ID
        id: TaskId,
    },

    /// Delete a task and every dependency touching it
    Rm {
        /// Task ID
        id: TaskId,
    },
}

pub fn run(cmd: TaskCommands, output: &Output) -> Result<()> {
    let ws = Workspace::open()?;

    match cmd {
        TaskCommands::Add {
            title,
            priority,
            due,
            parent,
        } => add_task(&ws, output, title, priority, due, parent),
        TaskCommands::List { all, status } => list_tasks(&ws, output, all, status),
        TaskCommands::Show { id } => show_task(&ws, output, &id),
        TaskCommands::Status { id, status, force } => set_status(&ws, output, &id, status, force),
        TaskCommands::Start { id, force } => {
            set_status(&ws, output, &id, TaskStatus::InProgress, force)
        }
        TaskCommands::Done { id } => set_status(&ws, output, &id, TaskStatus::Completed, false),
        TaskCommands::Rm { id } => remove_task(&ws, output, &id),
    }
}

fn add_task(
    ws: &Workspace,
    output: &Output,
    title: String,
    priority: Priority,
    due: Option<NaiveDate>,
    parent: Option<TaskId>,
) -> Result<()> {
    if title.trim().is_empty() {
        anyhow::bail!("Task title cannot be empty");
    }

    let mut task = Task::new(ws.owner.clone(), title).with_priority(priority);
    if let Some(due) = due {
        task = task.with_due_date(due);
    }
    if let Some(parent) = parent {
        let parent = ws.owned_task(&parent)?;
        task = task.with_parent(parent.id);
    }

    let task = store_new_task(ws, task)?;
    debug!(id = %task.id, "task stored");

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("Created task: {} - {}", task.id, task.title));
    }

    Ok(())
}

/// Inserts `task`, drawing a fresh id whenever the current one is taken
fn store_new_task(ws: &Workspace, mut task: Task) -> Result<Task> {
    for _ in 0..ID_ATTEMPTS {
        match ws.store().insert_task(&task) {
            Ok(()) => return Ok(task),
            Err(StoreError::TaskExists(id)) => {
                debug!(%id, "task id collision, regenerating");
                task.id = TaskId::new(&task.title, Utc::now());
            }
            Err(err) => return Err(err.into()),
        }
    }

    anyhow::bail!("Could not allocate a unique task id after {} attempts", ID_ATTEMPTS)
}

fn list_tasks(
    ws: &Workspace,
    output: &Output,
    include_subtasks: bool,
    status: Option<TaskStatus>,
) -> Result<()> {
    let query = if include_subtasks {
        TaskQuery::all()
    } else {
        TaskQuery::top_level()
    };

    let tasks: Vec<Task> = ws
        .store()
        .tasks_by_owner(&ws.owner, query)?
        .into_iter()
        .filter(|task| status.map_or(true, |status| task.status == status))
        .collect();

    if output.is_json() {
        output.data(&tasks);
    } else if tasks.is_empty() {
        println!("No tasks found.");
    } else {
        output.task_table(&format!("Tasks ({}):", tasks.len()), &tasks);
    }

    Ok(())
}

fn show_task(ws: &Workspace, output: &Output, id: &TaskId) -> Result<()> {
    let task = ws.owned_task(id)?;

    let depends_on: Vec<TaskId> = ws
        .store()
        .edges_by_task(&task.id)?
        .into_iter()
        .map(|edge| edge.depends_on_task_id)
        .collect();
    let blocking: Vec<TaskId> = ws
        .store()
        .edges_by_depends_on(&task.id)?
        .into_iter()
        .map(|edge| edge.task_id)
        .collect();
    let start = ws.engine.can_start(&ws.owner, &task.id)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task,
            "depends_on": depends_on,
            "blocking": blocking,
            "can_start": start.can_start,
        }));
        return Ok(());
    }

    println!("ID:       {}", task.id);
    println!("Title:    {}", task.title);
    println!("Status:   {}", task.status);
    println!("Priority: {}", task.priority);
    if let Some(due) = task.due_date {
        println!("Due:      {}", due);
    }
    if let Some(parent) = &task.parent_task_id {
        println!("Parent:   {}", parent);
    }
    println!("Created:  {}", task.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(completed) = task.completed_at {
        println!("Completed: {}", completed.format("%Y-%m-%d %H:%M"));
    }

    if !depends_on.is_empty() {
        println!();
        println!("Depends on:");
        for dep in &depends_on {
            println!("  - {}", dep);
        }
    }

    if !blocking.is_empty() {
        println!();
        println!("Blocking:");
        for dependent in &blocking {
            println!("  - {}", dependent);
        }
    }

    println!();
    if start.can_start {
        println!("Can start: yes");
    } else {
        let ids: Vec<String> = start.blocked_by.iter().map(|t| t.id.to_string()).collect();
        println!("Can start: no (waiting on {})", ids.join(", "));
    }

    Ok(())
}

fn set_status(
    ws: &Workspace,
    output: &Output,
    id: &TaskId,
    status: TaskStatus,
    force: bool,
) -> Result<()> {
    let task = ws.owned_task(id)?;

    if status == TaskStatus::InProgress && task.status != TaskStatus::InProgress && !force {
        let check = ws.engine.can_start(&ws.owner, &task.id)?;
        if !check.can_start {
            let waiting: Vec<String> = check.blocked_by.iter().map(|t| t.id.to_string()).collect();
            anyhow::bail!(
                "Cannot start {}: waiting on {} (use --force to override)",
                task.id,
                waiting.join(", ")
            );
        }
    }

    let updated = ws.store().set_status(&task.id, status)?;

    if output.is_json() {
        output.data(&updated);
    } else {
        output.success(&format!("{}: {} -> {}", updated.id, task.status, updated.status));
    }

    Ok(())
}

fn remove_task(ws: &Workspace, output: &Output, id: &TaskId) -> Result<()> {
    let task = ws.owned_task(id)?;
    ws.store().remove_task(&task.id)?;

    output.success(&format!("Deleted task: {} - {}", task.id, task.title));
    Ok(())
}
