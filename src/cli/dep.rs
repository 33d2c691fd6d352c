//! Dependency CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::app::Workspace;
use super::output::Output;
use crate::domain::TaskId;
use crate::engine::RejectReason;

#[derive(Subcommand)]
pub enum DepCommands {
    /// Make a task depend on another
    ///
    /// Fails with the violated rule (self-loop, duplicate, not-found, cycle)
    /// when the edge is not allowed.
    Add {
        /// Task that will wait
        task: TaskId,

        /// Task that must be completed first
        depends_on: TaskId,
    },

    /// Remove a dependency
    Rm {
        /// Task to unblock
        task: TaskId,

        /// Dependency to remove
        depends_on: TaskId,
    },

    /// Check whether a dependency would be allowed, without adding it
    Check {
        task: TaskId,
        depends_on: TaskId,
    },

    /// Show the shortest dependency chain from one task to another
    Path { from: TaskId, to: TaskId },

    /// Check whether a task's prerequisites are all completed
    CanStart { id: TaskId },
}

pub fn run(cmd: DepCommands, output: &Output) -> Result<()> {
    let ws = Workspace::open()?;

    match cmd {
        DepCommands::Add { task, depends_on } => add(&ws, output, &task, &depends_on),
        DepCommands::Rm { task, depends_on } => remove(&ws, output, &task, &depends_on),
        DepCommands::Check { task, depends_on } => check(&ws, output, &task, &depends_on),
        DepCommands::Path { from, to } => path(&ws, output, &from, &to),
        DepCommands::CanStart { id } => can_start(&ws, output, &id),
    }
}

fn add(ws: &Workspace, output: &Output, task: &TaskId, depends_on: &TaskId) -> Result<()> {
    match ws.engine.try_add_dependency(&ws.owner, task, depends_on) {
        Ok(edge) => {
            if output.is_json() {
                output.data(&edge);
            } else {
                output.success(&format!("{} now depends on {}", task, depends_on));
            }
            Ok(())
        }
        Err(err) => {
            if output.is_json() {
                output.data(&serde_json::json!({
                    "success": false,
                    "rule": err.kind(),
                    "error": err.to_string(),
                    "cycle": err.cycle_path(),
                }));
            }
            let rule = err.kind();
            Err(anyhow::Error::new(err).context(format!("Dependency rejected ({})", rule)))
        }
    }
}

fn remove(ws: &Workspace, output: &Output, task: &TaskId, depends_on: &TaskId) -> Result<()> {
    ws.engine.remove_dependency(&ws.owner, task, depends_on)?;
    output.success(&format!("{} no longer depends on {}", task, depends_on));
    Ok(())
}

fn check(ws: &Workspace, output: &Output, task: &TaskId, depends_on: &TaskId) -> Result<()> {
    let result = ws.engine.can_add_dependency(&ws.owner, task, depends_on)?;

    if output.is_json() {
        output.data(&result);
        return Ok(());
    }

    match &result.reason {
        None => println!("Allowed: {} can depend on {}", task, depends_on),
        Some(RejectReason::Cycle { path }) => {
            println!("Not allowed (cycle): {}", path);
        }
        Some(RejectReason::NotFound { task: missing }) => {
            println!("Not allowed (not-found): {}", missing);
        }
        Some(reason) => println!("Not allowed ({})", reason.as_str()),
    }

    Ok(())
}

fn path(ws: &Workspace, output: &Output, from: &TaskId, to: &TaskId) -> Result<()> {
    let result = ws.engine.find_dependency_path(&ws.owner, from, to)?;

    if output.is_json() {
        output.data(&result);
    } else if !result.has_path {
        println!("No dependency path from {} to {}", from, to);
    } else if result.path.is_empty() {
        println!("{} and {} are the same task", from, to);
    } else {
        println!("Path ({} step(s)):", result.length);
        for (i, task) in result.path.iter().enumerate() {
            let marker = if i == 0 { "   " } else { "-> " };
            println!("  {}{} {}", marker, task.id, task.title);
        }
    }

    Ok(())
}

fn can_start(ws: &Workspace, output: &Output, id: &TaskId) -> Result<()> {
    let result = ws.engine.can_start(&ws.owner, id)?;

    if output.is_json() {
        output.data(&result);
    } else if result.can_start {
        println!("{} can start", id);
    } else {
        output.task_table(&format!("{} is waiting on:", id), &result.blocked_by);
    }

    Ok(())
}
