//! Sample batches returned by workers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Action, CompressedState};

/// Training-ready batch in its transport form.
///
/// Field names and per-field alignment are part of the wire contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleBatch {
    /// Independently compressed preprocessed states
    pub states: Vec<CompressedState>,
    /// Actions
    pub actions: Vec<Action>,
    /// Rewards, after any n-step correction
    pub rewards: Vec<f64>,
    /// Terminal flags
    pub terminals: Vec<bool>,
    /// Per-transition importance weights
    pub importance_weights: Vec<f64>,
}

impl SampleBatch {
    /// Number of transitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Check if the batch is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Whether every column has the same length
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        let n = self.len();
        self.states.len() == n
            && self.actions.len() == n
            && self.terminals.len() == n
            && self.importance_weights.len() == n
    }
}

/// Throughput metrics of one worker call
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleMetrics {
    /// Wall-clock seconds spent in the call
    pub runtime: f64,
    /// Decision points executed
    pub timesteps_executed: usize,
    /// Decision points per second
    pub ops_per_second: f64,
    /// Raw environment steps taken, frameskip included
    pub env_frames: usize,
    /// Internal frames the environment advances per raw step
    #[serde(default = "default_frame_multiplier")]
    pub frame_multiplier: usize,
    /// Episodes that ended during the call
    pub episodes_completed: usize,
}

fn default_frame_multiplier() -> usize {
    1
}

impl SampleMetrics {
    /// Environment frames including the environment's internal multiplier
    #[must_use]
    pub fn scaled_env_frames(&self) -> usize {
        self.env_frames * self.frame_multiplier.max(1)
    }
}

/// Immutable result of one worker call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentSample {
    sample_batch: SampleBatch,
    batch_size: usize,
    metrics: SampleMetrics,
    worker_id: String,
    collected_at: DateTime<Utc>,
}

impl EnvironmentSample {
    /// Create a sample stamped with the current time
    #[must_use]
    pub fn new(
        sample_batch: SampleBatch,
        batch_size: usize,
        metrics: SampleMetrics,
        worker_id: impl Into<String>,
    ) -> Self {
        Self {
            sample_batch,
            batch_size,
            metrics,
            worker_id: worker_id.into(),
            collected_at: Utc::now(),
        }
    }

    /// The post-processed batch
    #[must_use]
    pub fn sample_batch(&self) -> &SampleBatch {
        &self.sample_batch
    }

    /// Number of transitions in the batch
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Metrics of the call that produced the sample
    #[must_use]
    pub fn metrics(&self) -> &SampleMetrics {
        &self.metrics
    }

    /// Id of the producing worker
    #[must_use]
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// When the sample was produced
    #[must_use]
    pub fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }

    /// Take the batch out of the sample
    #[must_use]
    pub fn into_batch(self) -> SampleBatch {
        self.sample_batch
    }
}
