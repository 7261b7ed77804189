//! victor-pool: run detection jobs on a fixed set of execution units.
//!
//! [`WorkerPool::submit`] returns a [`TaskHandle`] future immediately.
//! Inputs wait in a FIFO queue until a unit is idle; each unit runs one
//! job at a time and reports back by task id, so results may arrive in
//! any order without being mixed up.
//!
//! The queue is unbounded. Submitting faster than the units can drain it
//! grows memory without limit; callers that need back-pressure should
//! watch [`WorkerPool::stats`].
//!
//! There is no cancellation and no timeout. A runner that never returns
//! holds its unit forever and, once every unit is stuck, queued tasks
//! never start.

pub mod config;
pub mod pool;
pub mod protocol;
pub mod scheduler;
pub mod unit;

pub use config::PoolConfig;
pub use pool::{TaskHandle, WorkerPool};
pub use protocol::{JobMessage, JobOutcome, ResultMessage, TaskId, UnitId};
pub use scheduler::{PoolStats, Scheduler, UnitState};
pub use unit::{DetectAndStitch, JobRunner};

/// Errors constructing a [`WorkerPool`].
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// A pool needs at least one execution unit.
    #[error("worker pool size must be at least 1")]
    ZeroSize,

    /// The OS refused to start a thread.
    #[error("failed to spawn pool thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Why a [`TaskHandle`] resolved without a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The unit reported a failure for this task, including a panicking
    /// runner.
    #[error("{0}")]
    Detection(String),

    /// The unit assigned to this task could no longer receive jobs.
    #[error("execution unit stopped before the task could start")]
    UnitLost,

    /// The pool was dropped before this task resolved.
    #[error("worker pool closed before the task finished")]
    PoolClosed,
}
