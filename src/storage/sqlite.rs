//! SQLite task/edge store
//!
//! The database sits in `.taskdag/tasks.db` for the host binary. The
//! `dependencies` table enforces the structural edge invariants itself:
//! composite primary key (no duplicates), a CHECK against self-loops, and
//! `ON DELETE CASCADE` so removing a task drops its incident edges.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::{StoreError, StoreResult, TaskEdgeStore, TaskQuery};
use crate::domain::{DependencyEdge, OwnerId, Task, TaskId, TaskStatus};

const TASK_COLUMNS: &str = "id, owner_id, title, status, priority, due_date, parent_task_id, \
                            created_at, updated_at, completed_at";

/// SQLite-backed store
pub struct SqliteStore {
    /// Path to the SQLite database (None for in-memory databases)
    db_path: Option<PathBuf>,

    /// Database connection
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Schema version - bump when schema changes
    const SCHEMA_VERSION: i32 = 1;

    /// Creates or opens the store at `path`
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, db_path: Option<PathBuf>) -> StoreResult<Self> {
        // WAL for concurrent readers; foreign keys drive the edge cascade
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let store = Self {
            db_path,
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Returns the database path, if file-backed
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Creates the schema if the database is new
    fn ensure_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version == Self::SCHEMA_VERSION {
            return Ok(());
        }
        if version > Self::SCHEMA_VERSION {
            return Err(StoreError::Corrupt(format!(
                "database schema version {} is newer than supported version {}",
                version,
                Self::SCHEMA_VERSION
            )));
        }

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                due_date TEXT,
                parent_task_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                completed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS dependencies (
                task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                depends_on_task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                PRIMARY KEY (task_id, depends_on_task_id),
                CHECK (task_id <> depends_on_task_id)
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner_id);
            CREATE INDEX IF NOT EXISTS idx_deps_depends_on ON dependencies(depends_on_task_id);
            ",
        )?;

        conn.execute(
            &format!("PRAGMA user_version = {}", Self::SCHEMA_VERSION),
            [],
        )?;

        Ok(())
    }

    /// Stores a new task; an existing row with the same id is left untouched
    pub fn insert_task(&self, task: &Task) -> StoreResult<()> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            &format!(
                "INSERT INTO tasks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO NOTHING",
                TASK_COLUMNS
            ),
            params![
                task.id.to_string(),
                task.owner_id.as_str(),
                task.title,
                task.status.as_str(),
                task.priority.as_str(),
                task.due_date.map(|d| d.to_string()),
                task.parent_task_id.as_ref().map(|p| p.to_string()),
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
                task.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;

        if inserted == 0 {
            return Err(StoreError::TaskExists(task.id.clone()));
        }
        Ok(())
    }

    /// Rewrites a stored task's mutable fields
    ///
    /// The owner is part of the match, never of the update: a task cannot
    /// move to another owner, so its edges always stay within one owner.
    pub fn update_task(&self, task: &Task) -> StoreResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE tasks SET
                title = ?3,
                status = ?4,
                priority = ?5,
                due_date = ?6,
                parent_task_id = ?7,
                updated_at = ?8,
                completed_at = ?9
             WHERE id = ?1 AND owner_id = ?2",
            params![
                task.id.to_string(),
                task.owner_id.as_str(),
                task.title,
                task.status.as_str(),
                task.priority.as_str(),
                task.due_date.map(|d| d.to_string()),
                task.parent_task_id.as_ref().map(|p| p.to_string()),
                task.updated_at.to_rfc3339(),
                task.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;

        if updated == 0 {
            return Err(StoreError::TaskNotFound(task.id.clone()));
        }
        Ok(())
    }

    /// Changes a task's status and returns the updated task
    pub fn set_status(&self, id: &TaskId, status: TaskStatus) -> StoreResult<Task> {
        let mut task = self
            .task_by_id(id)?
            .ok_or_else(|| StoreError::TaskNotFound(id.clone()))?;
        task.set_status(status);
        self.update_task(&task)?;
        Ok(task)
    }

    /// Removes a task; its edges go with it through the foreign-key cascade
    pub fn remove_task(&self, id: &TaskId) -> StoreResult<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])?;
        Ok(removed > 0)
    }

    /// Total number of stored edges
    pub fn edge_count(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM dependencies", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query_edges(&self, sql: &str, task: &TaskId) -> StoreResult<Vec<DependencyEdge>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![task.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(task_id, depends_on, created_at)| {
                Ok(DependencyEdge {
                    task_id: parse_id(&task_id)?,
                    depends_on_task_id: parse_id(&depends_on)?,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }
}

impl TaskEdgeStore for SqliteStore {
    fn tasks_by_owner(&self, owner: &OwnerId, query: TaskQuery) -> StoreResult<Vec<Task>> {
        let conn = self.conn()?;
        let sql = if query.exclude_subtasks {
            format!(
                "SELECT {} FROM tasks WHERE owner_id = ?1 AND parent_task_id IS NULL
                 ORDER BY created_at, id",
                TASK_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM tasks WHERE owner_id = ?1 ORDER BY created_at, id",
                TASK_COLUMNS
            )
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![owner.as_str()], TaskRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(TaskRow::into_task).collect()
    }

    fn task_by_id(&self, id: &TaskId) -> StoreResult<Option<Task>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                params![id.to_string()],
                TaskRow::from_row,
            )
            .optional()?;

        row.map(TaskRow::into_task).transpose()
    }

    fn edges_by_task(&self, task: &TaskId) -> StoreResult<Vec<DependencyEdge>> {
        self.query_edges(
            "SELECT task_id, depends_on_task_id, created_at FROM dependencies
             WHERE task_id = ?1 ORDER BY rowid",
            task,
        )
    }

    fn edges_by_depends_on(&self, task: &TaskId) -> StoreResult<Vec<DependencyEdge>> {
        self.query_edges(
            "SELECT task_id, depends_on_task_id, created_at FROM dependencies
             WHERE depends_on_task_id = ?1 ORDER BY rowid",
            task,
        )
    }

    fn insert_edge(&self, task: &TaskId, depends_on: &TaskId) -> StoreResult<DependencyEdge> {
        let mut conn = self.conn()?;
        // IMMEDIATE takes the write lock up front so the re-check and the
        // insert see the same edge set as any other writer.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let task_str = task.to_string();
        let depends_on_str = depends_on.to_string();

        for (id, id_str) in [(task, &task_str), (depends_on, &depends_on_str)] {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1)",
                params![id_str],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(StoreError::TaskNotFound(id.clone()));
            }
        }

        let duplicate: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM dependencies
                           WHERE task_id = ?1 AND depends_on_task_id = ?2)",
            params![task_str, depends_on_str],
            |row| row.get(0),
        )?;
        if duplicate {
            return Err(StoreError::DuplicateEdge {
                task: task.clone(),
                depends_on: depends_on.clone(),
            });
        }

        // `task` reachable from `depends_on` means the new edge closes a loop
        let closes_cycle: bool = tx.query_row(
            "WITH RECURSIVE reach(id) AS (
                 SELECT ?1
                 UNION
                 SELECT d.depends_on_task_id FROM dependencies d JOIN reach r ON d.task_id = r.id
             )
             SELECT EXISTS(SELECT 1 FROM reach WHERE id = ?2)",
            params![depends_on_str, task_str],
            |row| row.get(0),
        )?;
        if closes_cycle {
            return Err(StoreError::WouldCycle {
                task: task.clone(),
                depends_on: depends_on.clone(),
            });
        }

        let edge = DependencyEdge::new(task.clone(), depends_on.clone());
        tx.execute(
            "INSERT INTO dependencies (task_id, depends_on_task_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![task_str, depends_on_str, edge.created_at.to_rfc3339()],
        )?;
        tx.commit()?;

        Ok(edge)
    }

    fn delete_edge(&self, task: &TaskId, depends_on: &TaskId) -> StoreResult<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM dependencies WHERE task_id = ?1 AND depends_on_task_id = ?2",
            params![task.to_string(), depends_on.to_string()],
        )?;
        Ok(removed > 0)
    }
}

/// Raw column values; parsed outside the rusqlite row closure
struct TaskRow {
    id: String,
    owner_id: String,
    title: String,
    status: String,
    priority: String,
    due_date: Option<String>,
    parent_task_id: Option<String>,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            status: row.get(3)?,
            priority: row.get(4)?,
            due_date: row.get(5)?,
            parent_task_id: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            completed_at: row.get(9)?,
        })
    }

    fn into_task(self) -> StoreResult<Task> {
        Ok(Task {
            id: parse_id(&self.id)?,
            owner_id: OwnerId::new(self.owner_id)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            title: self.title,
            status: self
                .status
                .parse()
                .map_err(|e: crate::domain::TaskFieldError| StoreError::Corrupt(e.to_string()))?,
            priority: self
                .priority
                .parse()
                .map_err(|e: crate::domain::TaskFieldError| StoreError::Corrupt(e.to_string()))?,
            due_date: self
                .due_date
                .map(|d| {
                    d.parse::<NaiveDate>()
                        .map_err(|e| StoreError::Corrupt(format!("due_date '{}': {}", d, e)))
                })
                .transpose()?,
            parent_task_id: self.parent_task_id.as_deref().map(parse_id).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            completed_at: self.completed_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

fn parse_id(value: &str) -> StoreResult<TaskId> {
    value
        .parse()
        .map_err(|e: crate::domain::IdError| StoreError::Corrupt(e.to_string()))
}

fn parse_timestamp(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{}': {}", value, e)))
}
