//! Synchronous fan-out/fan-in executor

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use rollout_core::{PolicyWeights, Result, RolloutError};

use super::{Executor, Workload, WorkloadProgress, WorkloadSummary};
use crate::config::ExecutorConfig;
use crate::pool::{join_error, WorkerPool};
use crate::stats::AggregateStatistics;

/// Dispatches one task to every worker per round and waits for all of
/// them before starting the next round.
///
/// Samples of a round are ordered by worker index, so runs with seeded
/// environments and agents are reproducible.
pub struct SyncExecutor {
    config: ExecutorConfig,
    pool: Option<WorkerPool>,
}

impl SyncExecutor {
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
impl Executor for SyncExecutor {
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
        let task = workload.worker_workload(self.config.steps_per_task);
        let mut progress = WorkloadProgress::new(workload.target);
        let mut rounds = 0usize;

        while !progress.is_complete() {
            let mut round = JoinSet::new();
            for handle in pool.handles() {
                let handle = handle.clone();
                round.spawn(async move { (handle.index(), handle.execute_and_get_timesteps(task).await) });
            }

            let mut results = Vec::with_capacity(pool.len());
            while let Some(joined) = round.join_next().await {
                let (index, sample) = joined.map_err(join_error)?;
                results.push((index, sample?));
            }
            results.sort_by_key(|(index, _)| *index);
            for (_, sample) in results {
                progress.record(sample);
            }
            rounds += 1;
            debug!(round = rounds, workers = pool.len(), "round complete");
        }

        let summary = progress.into_summary();
        info!(
            rounds,
            timesteps = summary.timesteps,
            episodes = summary.episodes,
            timesteps_per_second = summary.timesteps_per_second,
            "workload complete"
        );
        Ok(summary)
    }
}
