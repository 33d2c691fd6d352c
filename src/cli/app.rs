//! Main CLI application structure

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use super::output::Output;
use super::{dep, query, task};
use crate::domain::{OwnerId, Task, TaskId};
use crate::engine::DependencyEngine;
use crate::logging::{init_logging, LogLevel};
use crate::storage::{Config, OutputFormat, Project, SqliteStore, TaskEdgeStore};

#[derive(Parser)]
#[command(name = "taskdag")]
#[command(author, version, about = "Task dependencies without the loops")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config's default_format)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new taskdag project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Manage dependencies between tasks
    #[command(subcommand)]
    Dep(dep::DepCommands),

    /// Show pending tasks whose prerequisites are all completed
    Ready,

    /// Show pending tasks waiting on unfinished prerequisites
    Blocked,

    /// Show the dependency graph grouped by execution level
    Graph,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::find_project_root().and_then(|root| Config::for_project(&root).ok());

    let mut log = config
        .as_ref()
        .map(|config| config.project.log.to_log_config())
        .unwrap_or_default();
    if cli.verbose {
        log.level = LogLevel::Debug;
    }
    init_logging(&log);

    let format = cli
        .format
        .or_else(|| config.as_ref().map(|config| config.global.default_format))
        .unwrap_or_default();
    let output = Output::new(format);

    match cli.command {
        Commands::Init { path } => {
            debug!(%path, "initializing project");
            let project = Project::init(&path)?;
            debug!(data_dir = %project.data_dir().display(), "created data directory");
            output.success(&format!(
                "Initialized taskdag project at {}",
                project.root().display()
            ));
        }

        Commands::Task(cmd) => task::run(cmd, &output)?,
        Commands::Dep(cmd) => dep::run(cmd, &output)?,

        Commands::Ready => query::ready(&output)?,
        Commands::Blocked => query::blocked(&output)?,
        Commands::Graph => query::graph(&output)?,
    }

    debug!("command completed");
    Ok(())
}

/// The current project opened for one command
pub(super) struct Workspace {
    pub engine: DependencyEngine<SqliteStore>,
    pub owner: OwnerId,
}

impl Workspace {
    pub fn open() -> Result<Self> {
        let project = Project::open_current()?;
        let engine = project.engine()?;
        let owner = project.config().effective_owner()?;

        debug!(root = %project.root().display(), %owner, "opened project");

        Ok(Self { engine, owner })
    }

    pub fn store(&self) -> &SqliteStore {
        self.engine.store()
    }

    /// Loads a task, treating other owners' tasks as missing
    pub fn owned_task(&self, id: &TaskId) -> Result<Task> {
        self.store()
            .task_by_id(id)
            .with_context(|| format!("Failed to load task {}", id))?
            .filter(|task| task.is_owned_by(&self.owner))
            .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))
    }
}
