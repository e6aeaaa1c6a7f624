//! Pools of remote rollout workers

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use rollout_core::{AgentConfig, EnvSpec, PolicyWeights, Result, RolloutError, WorkerSpec};

use crate::handle::{spawn_worker, WorkerHandle};
use crate::stats::{AggregateStatistics, WorkloadStatistics};
use crate::worker::RolloutWorker;

/// Mailbox slots per worker
pub const DEFAULT_MAILBOX_CAPACITY: usize = 32;

/// Everything needed to build one rollout worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerBlueprint {
    /// Agent to build in every worker
    pub agent_config: AgentConfig,
    /// Environment to build in every worker
    pub env_spec: EnvSpec,
    /// Worker settings
    #[serde(default)]
    pub worker_spec: WorkerSpec,
    /// Action repeats per decision point
    #[serde(default = "default_frameskip")]
    pub frameskip: usize,
}

fn default_frameskip() -> usize {
    1
}

pub(crate) fn join_error(err: JoinError) -> RolloutError {
    RolloutError::WorkerUnavailable(format!("task failed: {err}"))
}

impl WorkerBlueprint {
    /// Blueprint with default worker settings and a frameskip of 1
    #[must_use]
    pub fn new(agent_config: AgentConfig, env_spec: EnvSpec) -> Self {
        Self {
            agent_config,
            env_spec,
            worker_spec: WorkerSpec::default(),
            frameskip: 1,
        }
    }

    /// Set the worker settings
    #[must_use]
    pub fn with_worker_spec(mut self, worker_spec: WorkerSpec) -> Self {
        self.worker_spec = worker_spec;
        self
    }

    /// Set the frameskip
    #[must_use]
    pub fn with_frameskip(mut self, frameskip: usize) -> Self {
        self.frameskip = frameskip;
        self
    }

    /// Build one local worker from this blueprint
    pub async fn build(&self) -> Result<RolloutWorker> {
        RolloutWorker::new(
            self.agent_config.clone(),
            &self.env_spec,
            &self.worker_spec,
            self.frameskip,
        )
        .await
    }
}

/// Fixed set of workers, each running on its own task
pub struct WorkerPool {
    handles: Vec<WorkerHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Build `count` workers from `blueprint` and spawn them.
    ///
    /// Workers are constructed concurrently; any construction error fails
    /// the whole pool before a task is spawned.
    pub async fn create_remote_workers(blueprint: &WorkerBlueprint, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(RolloutError::Config("a worker pool needs at least one worker".to_string()));
        }

        let mut builds = JoinSet::new();
        for index in 0..count {
            let blueprint = blueprint.clone();
            builds.spawn(async move { (index, blueprint.build().await) });
        }

        let mut workers: Vec<(usize, RolloutWorker)> = Vec::with_capacity(count);
        while let Some(joined) = builds.join_next().await {
            let (index, built) = joined.map_err(join_error)?;
            workers.push((index, built?));
        }
        workers.sort_by_key(|(index, _)| *index);

        let pool = Self::from_workers(workers.into_iter().map(|(_, worker)| worker).collect());
        info!(
            workers = pool.len(),
            env = %blueprint.env_spec.env_type,
            agent = %blueprint.agent_config.agent_type,
            "worker pool created"
        );
        Ok(pool)
    }

    /// Spawn already built workers
    #[must_use]
    pub fn from_workers(workers: Vec<RolloutWorker>) -> Self {
        let (handles, tasks) = workers
            .into_iter()
            .enumerate()
            .map(|(index, worker)| spawn_worker(worker, index, DEFAULT_MAILBOX_CAPACITY))
            .unzip();
        Self { handles, tasks }
    }

    /// Number of workers
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Check if the pool has no workers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Worker handles in pool order
    #[must_use]
    pub fn handles(&self) -> &[WorkerHandle] {
        &self.handles
    }

    /// Send the same weights snapshot to every worker
    pub async fn broadcast_policy_weights(&self, weights: PolicyWeights) -> Result<()> {
        let weights = Arc::new(weights);
        let mut pending = JoinSet::new();
        for handle in &self.handles {
            let handle = handle.clone();
            let weights = Arc::clone(&weights);
            pending.spawn(async move { handle.set_policy_weights(weights).await });
        }
        while let Some(joined) = pending.join_next().await {
            joined.map_err(join_error)??;
        }
        debug!(workers = self.len(), parameters = weights.num_parameters(), "weights broadcast");
        Ok(())
    }

    /// Copy the weights of worker `source` to every worker
    pub async fn sync_policy_weights(&self, source: usize) -> Result<()> {
        let handle = self.handles.get(source).ok_or_else(|| {
            RolloutError::Config(format!("no worker {source} in a pool of {}", self.len()))
        })?;
        let weights = handle.get_policy_weights().await?;
        self.broadcast_policy_weights(weights).await
    }

    /// Statistics of every worker that has finished an episode
    pub async fn collect_statistics(&self) -> Result<Vec<WorkloadStatistics>> {
        let mut stats = Vec::with_capacity(self.len());
        for handle in &self.handles {
            match handle.get_workload_statistics().await {
                Ok(worker_stats) => stats.push(worker_stats),
                Err(RolloutError::NoCompletedEpisodes) => {
                    debug!(worker_id = %handle.id(), "no completed episodes yet");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(stats)
    }

    /// Statistics merged over the pool
    pub async fn aggregate_statistics(&self) -> Result<AggregateStatistics> {
        AggregateStatistics::from_workers(&self.collect_statistics().await?)
    }

    /// Close every mailbox and wait for the workers to stop.
    ///
    /// Handles cloned out of the pool keep their worker running until they
    /// are dropped.
    pub async fn shutdown(self) {
        let Self { handles, tasks } = self;
        drop(handles);
        for task in tasks {
            if let Err(err) = task.await {
                warn!(%err, "worker task ended abnormally");
            }
        }
        info!("worker pool shut down");
    }
}
