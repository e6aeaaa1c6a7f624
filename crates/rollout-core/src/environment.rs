//! Environment trait and step types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Action, Space, State};

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step {
    /// State reached after the action
    pub next_state: State,
    /// Reward signal
    pub reward: f64,
    /// Whether the episode ended
    pub terminal: bool,
    /// Additional info from the environment
    pub info: StepInfo,
}

/// Additional information from a step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepInfo {
    /// Custom fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Simulation driven by a rollout worker.
///
/// Implementations wrap an external simulator. Errors returned from
/// `reset` or `step` abort the worker call that issued them.
#[async_trait]
pub trait Environment: Send + Sync {
    /// Space of states returned by `reset` and `step`
    fn state_space(&self) -> Space;

    /// Space of actions accepted by `step`
    fn action_space(&self) -> Space;

    /// Raw simulator frames advanced by one call to `step`.
    fn frame_multiplier(&self) -> usize {
        1
    }

    /// Reset the environment and return the initial state
    async fn reset(&mut self) -> crate::Result<State>;

    /// Take a step in the environment
    async fn step(&mut self, action: &Action) -> crate::Result<Step>;

    /// Close the environment
    async fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }
}
