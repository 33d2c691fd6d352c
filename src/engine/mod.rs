//! # Dependency Engine
//!
//! Validates and answers questions about "task A depends on task B"
//! relationships for one owner at a time.
//!
//! | Component | Responsibility |
//! |-----------|----------------|
//! | `repository` | Owner-scoped store access, cancellation checks |
//! | `cycle_guard` | Rule checks for new edges, loop detection |
//! | `assembler` | Owner graph from the store |
//! | [`layering`] | Execution levels |
//! | `readiness` | Ready, blocked and can-start queries |
//! | `path` | Shortest dependency chain |
//!
//! Every operation takes the owner explicitly. A task id that exists but
//! belongs to another owner is reported as not found.
//!
//! ## Concurrency
//!
//! Adding an edge checks the rules and writes under a per-owner mutex, so
//! concurrent adds for one owner cannot jointly create a loop. Reads take no
//! lock and see whatever the store returns at that moment.
//!
//! ## Cancellation
//!
//! Each call runs under a [`CancelToken`]. The plain methods on
//! [`DependencyEngine`] use a token with the configured timeout; use
//! [`DependencyEngine::with_cancel`] to supply your own.

mod assembler;
mod cancel;
mod cycle_guard;
mod error;
pub mod layering;
mod locks;
mod path;
mod readiness;
mod repository;

use tracing::{debug, info};

use crate::domain::{DependencyEdge, DependencyGraph, OwnerId, Task, TaskId};
use crate::storage::{EngineConfig, TaskEdgeStore};

pub use assembler::{GraphNode, GraphView};
pub use cancel::CancelToken;
pub use cycle_guard::{EdgeCheck, RejectReason};
pub use error::{CyclePath, EngineError, EngineResult, ErrorKind};
pub use layering::Layering;
pub use path::DependencyPath;
pub use readiness::{BlockedTask, StartCheck};

use locks::OwnerLocks;
use repository::DependencyRepository;

/// Entry point for dependency operations over a [`TaskEdgeStore`]
pub struct DependencyEngine<S> {
    store: S,
    locks: OwnerLocks,
    config: EngineConfig,
}

impl<S: TaskEdgeStore> DependencyEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            locks: OwnerLocks::new(),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A session bounded by the configured timeout
    pub fn session(&self) -> Session<'_, S> {
        self.with_cancel(CancelToken::from_timeout(self.config.timeout()))
    }

    /// A session bounded by the caller's token
    pub fn with_cancel(&self, cancel: CancelToken) -> Session<'_, S> {
        Session {
            engine: self,
            cancel,
        }
    }

    pub fn can_add_dependency(
        &self,
        owner: &OwnerId,
        task: &TaskId,
        depends_on: &TaskId,
    ) -> EngineResult<EdgeCheck> {
        self.session().can_add_dependency(owner, task, depends_on)
    }

    pub fn try_add_dependency(
        &self,
        owner: &OwnerId,
        task: &TaskId,
        depends_on: &TaskId,
    ) -> EngineResult<DependencyEdge> {
        self.session().try_add_dependency(owner, task, depends_on)
    }

    pub fn remove_dependency(
        &self,
        owner: &OwnerId,
        task: &TaskId,
        depends_on: &TaskId,
    ) -> EngineResult<()> {
        self.session().remove_dependency(owner, task, depends_on)
    }

    pub fn dependency_graph(&self, owner: &OwnerId) -> EngineResult<GraphView> {
        self.session().dependency_graph(owner)
    }

    pub fn ready_tasks(&self, owner: &OwnerId) -> EngineResult<Vec<Task>> {
        self.session().ready_tasks(owner)
    }

    pub fn blocked_tasks(&self, owner: &OwnerId) -> EngineResult<Vec<BlockedTask>> {
        self.session().blocked_tasks(owner)
    }

    pub fn can_start(&self, owner: &OwnerId, task: &TaskId) -> EngineResult<StartCheck> {
        self.session().can_start(owner, task)
    }

    pub fn find_dependency_path(
        &self,
        owner: &OwnerId,
        from: &TaskId,
        to: &TaskId,
    ) -> EngineResult<DependencyPath> {
        self.session().find_dependency_path(owner, from, to)
    }
}

/// Engine operations sharing one cancellation token
pub struct Session<'e, S> {
    engine: &'e DependencyEngine<S>,
    cancel: CancelToken,
}

impl<S: TaskEdgeStore> Session<'_, S> {
    fn repo(&self) -> DependencyRepository<'_, S> {
        DependencyRepository::new(&self.engine.store, &self.cancel)
    }

    /// Reports whether an edge would be accepted, without writing it
    pub fn can_add_dependency(
        &self,
        owner: &OwnerId,
        task: &TaskId,
        depends_on: &TaskId,
    ) -> EngineResult<EdgeCheck> {
        cycle_guard::check_edge(&self.repo(), owner, task, depends_on)
    }

    /// Checks every rule and writes the edge atomically with respect to
    /// other adds for the same owner
    pub fn try_add_dependency(
        &self,
        owner: &OwnerId,
        task: &TaskId,
        depends_on: &TaskId,
    ) -> EngineResult<DependencyEdge> {
        // Self-loops need no store access and no lock
        if task == depends_on {
            return Err(EngineError::SelfLoop(task.clone()));
        }

        let lock = self.engine.locks.for_owner(owner);
        let _guard = OwnerLocks::acquire(&lock, &self.cancel)?;

        let edge = cycle_guard::insert_checked(&self.repo(), owner, task, depends_on)?;
        info!(%owner, %task, %depends_on, "dependency added");
        Ok(edge)
    }

    pub fn remove_dependency(
        &self,
        owner: &OwnerId,
        task: &TaskId,
        depends_on: &TaskId,
    ) -> EngineResult<()> {
        let repo = self.repo();
        repo.owned_task(owner, task)?;
        repo.owned_task(owner, depends_on)?;

        if !repo.delete_edge(task, depends_on)? {
            return Err(EngineError::EdgeNotFound {
                task: task.clone(),
                depends_on: depends_on.clone(),
            });
        }

        info!(%owner, %task, %depends_on, "dependency removed");
        Ok(())
    }

    /// The owner's raw graph, without layering
    pub fn graph(&self, owner: &OwnerId) -> EngineResult<DependencyGraph> {
        assembler::assemble(&self.repo(), owner, self.engine.config.large_graph_threshold)
    }

    pub fn dependency_graph(&self, owner: &OwnerId) -> EngineResult<GraphView> {
        let graph = self.graph(owner)?;
        let layering = layering::layer(&graph);
        debug!(%owner, levels = layering.levels.len(), cyclic = layering.cyclic, "graph layered");
        Ok(GraphView::new(&graph, layering))
    }

    pub fn ready_tasks(&self, owner: &OwnerId) -> EngineResult<Vec<Task>> {
        readiness::ready_tasks(&self.repo(), owner)
    }

    pub fn blocked_tasks(&self, owner: &OwnerId) -> EngineResult<Vec<BlockedTask>> {
        readiness::blocked_tasks(&self.repo(), owner)
    }

    pub fn can_start(&self, owner: &OwnerId, task: &TaskId) -> EngineResult<StartCheck> {
        readiness::can_start(&self.repo(), owner, task)
    }

    pub fn find_dependency_path(
        &self,
        owner: &OwnerId,
        from: &TaskId,
        to: &TaskId,
    ) -> EngineResult<DependencyPath> {
        path::find_path(&self.repo(), owner, from, to)
    }
}
