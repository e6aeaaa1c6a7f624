//! Executors: dispatch workloads over a worker pool and gather the results

mod async_executor;
mod sync_executor;

pub use async_executor::AsyncExecutor;
pub use sync_executor::SyncExecutor;

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use rollout_core::{EnvironmentSample, Result, RolloutError, WorkerWorkload};

use crate::pool::{WorkerBlueprint, WorkerPool};
use crate::worker::guarded_runtime;

/// Executor-level amount of work to collect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count", rename_all = "snake_case")]
pub enum WorkloadTarget {
    /// Decision points summed over every sample
    Timesteps(usize),
    /// Completed episodes summed over every sample
    Episodes(usize),
}

/// Work requested from an executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    /// When to stop dispatching
    pub target: WorkloadTarget,
    /// Episode truncation limit; 0 is unlimited
    #[serde(default)]
    pub max_timesteps_per_episode: usize,
    /// Whether agents explore
    #[serde(default = "default_true")]
    pub use_exploration: bool,
}

fn default_true() -> bool {
    true
}

impl Workload {
    /// Collect at least `n` decision points
    #[must_use]
    pub fn timesteps(n: usize) -> Self {
        Self {
            target: WorkloadTarget::Timesteps(n),
            max_timesteps_per_episode: 0,
            use_exploration: true,
        }
    }

    /// Collect samples until at least `n` episodes completed
    #[must_use]
    pub fn episodes(n: usize) -> Self {
        Self {
            target: WorkloadTarget::Episodes(n),
            ..Self::timesteps(0)
        }
    }

    /// Set the episode truncation limit
    #[must_use]
    pub fn with_max_timesteps_per_episode(mut self, max_timesteps: usize) -> Self {
        self.max_timesteps_per_episode = max_timesteps;
        self
    }

    /// Set the exploration flag
    #[must_use]
    pub fn with_exploration(mut self, use_exploration: bool) -> Self {
        self.use_exploration = use_exploration;
        self
    }

    /// Reject empty targets
    pub fn validate(&self) -> Result<()> {
        match self.target {
            WorkloadTarget::Timesteps(0) | WorkloadTarget::Episodes(0) => Err(
                RolloutError::Config("workload target must be positive".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Per-task workload for one worker call
    pub(crate) fn worker_workload(&self, steps_per_task: usize) -> WorkerWorkload {
        WorkerWorkload::timesteps(steps_per_task)
            .with_max_timesteps_per_episode(self.max_timesteps_per_episode)
            .with_exploration(self.use_exploration)
    }
}

/// Everything an executor collected for one workload
#[derive(Debug, Clone)]
pub struct WorkloadSummary {
    /// Samples in the order they were consumed
    pub samples: Vec<EnvironmentSample>,
    /// Decision points executed
    pub timesteps: usize,
    /// Episodes completed
    pub episodes: usize,
    /// Raw environment frames stepped, frameskip included
    pub env_frames: usize,
    /// Wall-clock seconds for the whole workload
    pub runtime: f64,
    /// Decision points per wall-clock second
    pub timesteps_per_second: f64,
    /// Environment frames per wall-clock second, scaled by each
    /// environment's internal frame multiplier
    pub env_frames_per_second: f64,
}

impl WorkloadSummary {
    /// Transitions across all samples
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.samples.iter().map(EnvironmentSample::batch_size).sum()
    }
}

/// Running totals while a workload is executed
pub(crate) struct WorkloadProgress {
    target: WorkloadTarget,
    samples: Vec<EnvironmentSample>,
    timesteps: usize,
    episodes: usize,
    env_frames: usize,
    scaled_env_frames: usize,
    start: Instant,
}

impl WorkloadProgress {
    pub(crate) fn new(target: WorkloadTarget) -> Self {
        Self {
            target,
            samples: Vec::new(),
            timesteps: 0,
            episodes: 0,
            env_frames: 0,
            scaled_env_frames: 0,
            start: Instant::now(),
        }
    }

    pub(crate) fn record(&mut self, sample: EnvironmentSample) {
        let metrics = sample.metrics();
        self.timesteps += metrics.timesteps_executed;
        self.episodes += metrics.episodes_completed;
        self.env_frames += metrics.env_frames;
        self.scaled_env_frames += metrics.scaled_env_frames();
        self.samples.push(sample);
    }

    /// Whether more work should be dispatched given the timesteps already
    /// in flight
    pub(crate) fn wants_more(&self, in_flight_timesteps: usize) -> bool {
        match self.target {
            WorkloadTarget::Timesteps(n) => self.timesteps + in_flight_timesteps < n,
            WorkloadTarget::Episodes(n) => self.episodes < n,
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        !self.wants_more(0)
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn into_summary(self) -> WorkloadSummary {
        let runtime = guarded_runtime(self.start.elapsed().as_secs_f64());
        WorkloadSummary {
            timesteps_per_second: self.timesteps as f64 / runtime,
            env_frames_per_second: self.scaled_env_frames as f64 / runtime,
            samples: self.samples,
            timesteps: self.timesteps,
            episodes: self.episodes,
            env_frames: self.env_frames,
            runtime,
        }
    }
}

/// Drives a pool of rollout workers.
///
/// `setup_execution` runs once before any dispatch; `execute_workload`
/// collects samples until the workload target is met. Both are extension
/// points that fail with `NotImplemented` unless overridden.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Build `count` workers from `blueprint`, each on its own task
    async fn create_remote_workers(
        &self,
        blueprint: &WorkerBlueprint,
        count: usize,
    ) -> Result<WorkerPool> {
        WorkerPool::create_remote_workers(blueprint, count).await
    }

    /// Prepare workers before the first workload
    async fn setup_execution(&mut self) -> Result<()> {
        Err(RolloutError::NotImplemented("setup_execution"))
    }

    /// Collect samples until `workload` is satisfied
    async fn execute_workload(&mut self, _workload: &Workload) -> Result<WorkloadSummary> {
        Err(RolloutError::NotImplemented("execute_workload"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rollout_core::{SampleBatch, SampleMetrics};

    struct BareExecutor;

    impl Executor for BareExecutor {}

    #[tokio::test]
    async fn test_base_executor_is_not_implemented() {
        let mut executor = BareExecutor;

        let setup = executor.setup_execution().await.unwrap_err();
        let execute = executor
            .execute_workload(&Workload::timesteps(10))
            .await
            .unwrap_err();

        assert!(matches!(setup, RolloutError::NotImplemented("setup_execution")));
        assert!(matches!(execute, RolloutError::NotImplemented("execute_workload")));
    }

    #[test]
    fn test_empty_target_is_rejected() {
        assert!(Workload::timesteps(0).validate().is_err());
        assert!(Workload::episodes(0).validate().is_err());
        assert!(Workload::episodes(1).validate().is_ok());
    }

    #[test]
    fn test_timestep_target_counts_in_flight_work() {
        let progress = WorkloadProgress::new(WorkloadTarget::Timesteps(100));

        assert!(progress.wants_more(50));
        assert!(!progress.wants_more(100));
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_summary_frame_rate_applies_frame_multiplier() {
        let mut progress = WorkloadProgress::new(WorkloadTarget::Timesteps(4));
        let metrics = SampleMetrics {
            timesteps_executed: 2,
            env_frames: 4,
            frame_multiplier: 3,
            ..SampleMetrics::default()
        };
        progress.record(EnvironmentSample::new(SampleBatch::default(), 0, metrics, "w0".to_string()));

        let summary = progress.into_summary();

        assert_eq!(summary.env_frames, 4);
        assert_relative_eq!(
            summary.env_frames_per_second / summary.timesteps_per_second,
            6.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_workload_from_json() {
        let workload: Workload =
            serde_json::from_str(r#"{"target": {"kind": "episodes", "count": 3}}"#).unwrap();

        assert_eq!(workload, Workload::episodes(3));
    }

    #[test]
    fn test_worker_workload_carries_settings() {
        let workload = Workload::timesteps(1000)
            .with_max_timesteps_per_episode(50)
            .with_exploration(false)
            .worker_workload(25);

        assert_eq!(workload.num_timesteps, 25);
        assert_eq!(workload.max_timesteps_per_episode, 50);
        assert!(!workload.use_exploration);
        assert!(!workload.break_on_terminal);
    }
}
