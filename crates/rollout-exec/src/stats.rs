//! Per-worker and pool-wide workload statistics

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rollout_core::{Result, RolloutError};

/// Statistics reported by one worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadStatistics {
    /// Reporting worker
    pub worker_id: String,
    /// Recent episode lengths, oldest first
    pub episode_timesteps: Vec<usize>,
    /// Recent episode rewards, oldest first
    pub episode_rewards: Vec<f64>,
    /// Lowest episode reward seen
    pub min_episode_reward: f64,
    /// Highest episode reward seen
    pub max_episode_reward: f64,
    /// Mean reward over every completed episode
    pub mean_episode_reward: f64,
    /// Reward of the latest completed episode
    pub final_episode_reward: f64,
    /// Completed episodes
    pub episodes_executed: usize,
    /// Decision points executed across all calls
    pub worker_steps: usize,
    /// Decision points per second across all calls
    pub mean_worker_ops_per_second: f64,
    /// Raw environment frames per second across all calls
    pub mean_worker_env_frames_per_second: f64,
}

/// Statistics merged over many workers.
///
/// Merging is order-independent: sums and extrema are commutative and the
/// mean reward is weighted by each worker's episode count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStatistics {
    /// Workers that reported
    pub num_workers: usize,
    /// Episodes completed across workers
    pub episodes_executed: usize,
    /// Decision points across workers
    pub worker_steps: usize,
    /// Lowest episode reward across workers
    pub min_episode_reward: f64,
    /// Highest episode reward across workers
    pub max_episode_reward: f64,
    /// Episode-weighted mean reward
    pub mean_episode_reward: f64,
    /// Summed decision points per second
    pub total_ops_per_second: f64,
    /// Summed environment frames per second
    pub total_env_frames_per_second: f64,
    /// Latest episode reward per worker id
    pub final_episode_rewards: BTreeMap<String, f64>,
}

impl AggregateStatistics {
    /// Merge per-worker statistics
    #[allow(clippy::cast_precision_loss)]
    pub fn from_workers(stats: &[WorkloadStatistics]) -> Result<Self> {
        if stats.is_empty() {
            return Err(RolloutError::NoCompletedEpisodes);
        }

        let mut aggregate = Self {
            num_workers: stats.len(),
            episodes_executed: 0,
            worker_steps: 0,
            min_episode_reward: f64::INFINITY,
            max_episode_reward: f64::NEG_INFINITY,
            mean_episode_reward: 0.0,
            total_ops_per_second: 0.0,
            total_env_frames_per_second: 0.0,
            final_episode_rewards: BTreeMap::new(),
        };
        let mut reward_sum = 0.0;

        for worker in stats {
            aggregate.episodes_executed += worker.episodes_executed;
            aggregate.worker_steps += worker.worker_steps;
            aggregate.min_episode_reward = aggregate.min_episode_reward.min(worker.min_episode_reward);
            aggregate.max_episode_reward = aggregate.max_episode_reward.max(worker.max_episode_reward);
            aggregate.total_ops_per_second += worker.mean_worker_ops_per_second;
            aggregate.total_env_frames_per_second += worker.mean_worker_env_frames_per_second;
            reward_sum += worker.mean_episode_reward * worker.episodes_executed as f64;
            aggregate
                .final_episode_rewards
                .insert(worker.worker_id.clone(), worker.final_episode_reward);
        }

        if aggregate.episodes_executed > 0 {
            aggregate.mean_episode_reward = reward_sum / aggregate.episodes_executed as f64;
        }
        Ok(aggregate)
    }

    /// Mean decision points per second per worker
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_ops_per_second(&self) -> f64 {
        self.total_ops_per_second / self.num_workers as f64
    }
}
