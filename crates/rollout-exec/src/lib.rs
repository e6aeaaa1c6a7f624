//! Distributed experience collection
//!
//! A `RolloutWorker` couples one environment with one agent and turns
//! workload requests into compressed, post-processed sample batches. Workers
//! run as tokio tasks behind `WorkerHandle`s; a `WorkerPool` owns them and an
//! `Executor` dispatches workloads over the pool and merges the results.
//!
//! ```no_run
//! use rollout_core::{AgentConfig, EnvSpec};
//! use rollout_exec::{Executor, ExecutorConfig, SyncExecutor, Workload, WorkerBlueprint};
//!
//! # async fn run() -> rollout_core::Result<()> {
//! let blueprint = WorkerBlueprint::new(AgentConfig::new("random"), EnvSpec::new("cartpole"));
//! let mut executor = SyncExecutor::new(ExecutorConfig::new(blueprint, 4))?;
//! executor.setup_execution().await?;
//! let summary = executor.execute_workload(&Workload::episodes(10)).await?;
//! println!("collected {} transitions", summary.batch_size());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod executor;
pub mod handle;
pub mod history;
pub mod pool;
pub mod postprocess;
pub mod stats;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ExecutorConfig;
pub use executor::{
    AsyncExecutor, Executor, SyncExecutor, Workload, WorkloadSummary, WorkloadTarget,
};
pub use handle::{spawn_worker, WorkerHandle};
pub use history::{EpisodeHistory, RollingWindow, ThroughputHistory};
pub use pool::{WorkerBlueprint, WorkerPool, DEFAULT_MAILBOX_CAPACITY};
pub use postprocess::BatchPostProcessor;
pub use stats::{AggregateStatistics, WorkloadStatistics};
pub use worker::{sample_exploration, RolloutWorker};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AsyncExecutor, Executor, ExecutorConfig, RolloutWorker, SyncExecutor, WorkerBlueprint,
        WorkerPool, Workload,
    };
    pub use rollout_core::prelude::*;
}
