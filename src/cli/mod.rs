//! # Command-Line Interface
//!
//! The `taskdag` host binary: a thin shell over [`crate::engine`] and the
//! project's SQLite store.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project setup | `init` |
//! | Task | Task records | `task add`, `task list`, `task status` |
//! | Dep | Dependency edges | `dep add`, `dep check`, `dep path` |
//! | Query | Graph questions | `ready`, `blocked`, `graph` |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! The default comes from the global config's `default_format`.
//!
//! ## Verbose Mode
//!
//! `--verbose` (or `-v`) raises the log level to debug. Logs go to stderr.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod dep;
mod output;
mod query;
mod task;

pub use app::{run, Cli, Commands};
pub use output::Output;
