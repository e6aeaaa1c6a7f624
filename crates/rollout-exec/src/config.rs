//! Executor configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use rollout_core::{Result, RolloutError};

use crate::pool::WorkerBlueprint;

fn default_num_workers() -> usize {
    1
}

fn default_steps_per_task() -> usize {
    100
}

/// Configuration shared by every executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Workers in the pool
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    /// Decision points per worker task
    #[serde(default = "default_steps_per_task")]
    pub steps_per_task: usize,
    /// How every worker is built
    #[serde(flatten)]
    pub blueprint: WorkerBlueprint,
}

impl ExecutorConfig {
    /// Config for `num_workers` workers built from `blueprint`
    #[must_use]
    pub fn new(blueprint: WorkerBlueprint, num_workers: usize) -> Self {
        Self {
            num_workers,
            steps_per_task: default_steps_per_task(),
            blueprint,
        }
    }

    /// Set the decision points per worker task
    #[must_use]
    pub fn with_steps_per_task(mut self, steps_per_task: usize) -> Self {
        self.steps_per_task = steps_per_task;
        self
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    /// Reject settings no executor could run with
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(RolloutError::Config("num_workers must be at least 1".to_string()));
        }
        if self.steps_per_task == 0 {
            return Err(RolloutError::Config("steps_per_task must be at least 1".to_string()));
        }
        if self.blueprint.frameskip == 0 {
            return Err(RolloutError::Config("frameskip must be at least 1".to_string()));
        }
        self.blueprint
            .worker_spec
            .validate(self.blueprint.agent_config.discount)
    }
}
