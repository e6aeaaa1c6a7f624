//! Pull-based asynchronous executor

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use rollout_core::{PolicyWeights, Result, RolloutError};

use super::{Executor, Workload, WorkloadProgress, WorkloadSummary};
use crate::config::ExecutorConfig;
use crate::handle::WorkerHandle;
use crate::pool::{join_error, WorkerPool};
use crate::stats::AggregateStatistics;

/// Keeps one task in flight per worker and re-dispatches a worker as soon
/// as its task completes.
///
/// Samples are consumed in completion order. Dispatch stops once the
/// collected plus in-flight timesteps reach the target; an episode target
/// keeps dispatching until enough episodes were collected.
pub struct AsyncExecutor {
    config: ExecutorConfig,
    pool: Option<WorkerPool>,
}

impl AsyncExecutor {
    /// Create an executor; workers are built by `setup_execution`
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, pool: None })
    }

    /// Executor settings
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Worker pool, once set up
    #[must_use]
    pub fn pool(&self) -> Option<&WorkerPool> {
        self.pool.as_ref()
    }

    fn ready_pool(&self) -> Result<&WorkerPool> {
        self.pool.as_ref().ok_or_else(|| {
            RolloutError::Config("setup_execution must run before dispatch".to_string())
        })
    }

    /// Send new policy weights to every worker
    pub async fn broadcast_policy_weights(&self, weights: PolicyWeights) -> Result<()> {
        self.ready_pool()?.broadcast_policy_weights(weights).await
    }

    /// Statistics merged over every worker
    pub async fn aggregate_statistics(&self) -> Result<AggregateStatistics> {
        self.ready_pool()?.aggregate_statistics().await
    }

    /// Stop every worker
    pub async fn shutdown(self) {
        if let Some(pool) = self.pool {
            pool.shutdown().await;
        }
    }
}

#[async_trait]
impl Executor for AsyncExecutor {
    async fn setup_execution(&mut self) -> Result<()> {
        if self.pool.is_some() {
            warn!("setup_execution called twice; keeping existing workers");
            return Ok(());
        }
        let pool = self
            .create_remote_workers(&self.config.blueprint, self.config.num_workers)
            .await?;
        self.pool = Some(pool);
        Ok(())
    }

    async fn execute_workload(&mut self, workload: &Workload) -> Result<WorkloadSummary> {
        workload.validate()?;
        let pool = self.ready_pool()?;
        let steps_per_task = self.config.steps_per_task;
        let task = workload.worker_workload(steps_per_task);
        let mut progress = WorkloadProgress::new(workload.target);

        let mut idle: Vec<WorkerHandle> = pool.handles().iter().rev().cloned().collect();
        let mut in_flight = JoinSet::new();
        let mut dispatched = 0usize;

        loop {
            while progress.wants_more(in_flight.len() * steps_per_task) {
                let Some(handle) = idle.pop() else {
                    break;
                };
                dispatched += 1;
                in_flight.spawn(async move {
                    let result = handle.execute_and_get_timesteps(task).await;
                    (handle, result)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let (handle, result) = joined.map_err(join_error)?;
            let sample = result?;
            debug!(
                worker = handle.index(),
                timesteps = sample.metrics().timesteps_executed,
                "task complete"
            );
            progress.record(sample);
            idle.push(handle);
        }

        let summary = progress.into_summary();
        info!(
            tasks = dispatched,
            timesteps = summary.timesteps,
            episodes = summary.episodes,
            timesteps_per_second = summary.timesteps_per_second,
            "workload complete"
        );
        Ok(summary)
    }
}
