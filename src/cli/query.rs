//! Query commands (ready, blocked, graph)

use anyhow::Result;

use super::app::Workspace;
use super::output::Output;

/// Show tasks ready to work on
pub fn ready(output: &Output) -> Result<()> {
    let ws = Workspace::open()?;
    let ready = ws.engine.ready_tasks(&ws.owner)?;

    if output.is_json() {
        output.data(&ready);
    } else if ready.is_empty() {
        println!("No tasks ready to work on.");
    } else {
        output.task_table(&format!("Ready tasks ({}):", ready.len()), &ready);
    }

    Ok(())
}

/// Show blocked tasks
pub fn blocked(output: &Output) -> Result<()> {
    let ws = Workspace::open()?;
    let blocked = ws.engine.blocked_tasks(&ws.owner)?;

    if output.is_json() {
        output.data(&blocked);
    } else if blocked.is_empty() {
        println!("No blocked tasks.");
    } else {
        println!("Blocked tasks ({}):", blocked.len());
        println!("{:<12} {:<30} BLOCKED BY", "ID", "TITLE");
        println!("{}", "-".repeat(70));
        for entry in &blocked {
            let blockers: Vec<String> = entry.blocked_by.iter().map(|t| t.id.to_string()).collect();
            println!(
                "{:<12} {:<30} {}",
                entry.task.id,
                entry.task.title,
                blockers.join(", ")
            );
        }
    }

    Ok(())
}

/// Show the dependency graph level by level
pub fn graph(output: &Output) -> Result<()> {
    let ws = Workspace::open()?;
    let view = ws.engine.dependency_graph(&ws.owner)?;

    if output.is_json() {
        output.data(&view);
        return Ok(());
    }

    if view.nodes.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    println!(
        "Dependency graph: {} task(s), {} edge(s)",
        view.nodes.len(),
        view.edges.len()
    );

    for (level, ids) in view.levels.iter().enumerate() {
        println!();
        println!("Level {}:", level);
        for id in ids {
            if let Some(node) = view.node(id) {
                let deps: Vec<String> = view
                    .edges
                    .iter()
                    .filter(|edge| &edge.task_id == id)
                    .map(|edge| edge.depends_on_task_id.to_string())
                    .collect();
                if deps.is_empty() {
                    println!("  {:<12} [{}] {}", node.id, node.status, node.title);
                } else {
                    println!(
                        "  {:<12} [{}] {} (after {})",
                        node.id,
                        node.status,
                        node.title,
                        deps.join(", ")
                    );
                }
            }
        }
    }

    if view.cyclic {
        println!();
        println!("Warning: these tasks are caught in a dependency loop:");
        for node in view.nodes.iter().filter(|node| node.level.is_none()) {
            println!("  {:<12} {}", node.id, node.title);
        }
    }

    Ok(())
}
