//! Project management
//!
//! Handles project initialization and provides access to the store and
//! a configured engine.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::{Config, SqliteStore};
use crate::engine::DependencyEngine;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a taskdag project. Run 'taskdag init' first.")]
    NotInProject,
}

/// A taskdag project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(".taskdag").is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let data_dir = root.join(".taskdag");

        fs::create_dir_all(&data_dir).with_context(|| {
            format!("Failed to create .taskdag directory: {}", data_dir.display())
        })?;

        let config_path = data_dir.join("config.toml");
        if !config_path.exists() {
            let default_config = r#"# taskdag configuration

# Owner whose tasks this project manages (defaults to $TASKDAG_OWNER, then $USER)
# owner = "alice"

[engine]
# Per-call timeout in milliseconds (0 disables)
timeout_ms = 5000

# Warn when an owner's graph grows beyond this many tasks
large_graph_threshold = 5000

[log]
level = "warn"
format = "pretty"
"#;
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = data_dir.join(".gitignore");
        if !gitignore_path.exists() {
            let gitignore = r#"# SQLite database and its WAL side files
tasks.db
tasks.db-wal
tasks.db-shm
"#;
            fs::write(&gitignore_path, gitignore).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        let project = Self::open(root)?;
        // Creates the schema eagerly so a fresh project is immediately usable
        project.store()?;
        Ok(project)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .taskdag directory path
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(".taskdag")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the database path
    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("tasks.db")
    }

    /// Opens the SQLite store for this project
    pub fn store(&self) -> Result<SqliteStore> {
        let path = self.db_path();
        SqliteStore::open(&path)
            .with_context(|| format!("Failed to open task database: {}", path.display()))
    }

    /// Opens the store and wraps it in an engine configured for this project
    pub fn engine(&self) -> Result<DependencyEngine<SqliteStore>> {
        Ok(DependencyEngine::with_config(
            self.store()?,
            self.config.project.engine.clone(),
        ))
    }
}
