//! Agent trait and the values exchanged with it

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Action, Space, State, TransitionBatch};

/// Action selected for a state, with the state as the agent preprocessed it
#[derive(Debug, Clone)]
pub struct ActionOutput {
    /// Selected action
    pub action: Action,
    /// Agent-side view of the input state
    pub preprocessed_state: State,
}

/// Result of a learning update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Aggregate loss of the update
    pub loss: f64,
    /// Loss for each transition of the batch, in batch order
    pub loss_per_item: Vec<f64>,
}

/// Named policy parameter tensors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyWeights {
    /// Parameter tensors by name
    pub tensors: BTreeMap<String, State>,
}

impl PolicyWeights {
    /// Create an empty weight set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a named tensor
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, tensor: State) -> Self {
        self.tensors.insert(name.into(), tensor);
        self
    }

    /// Total number of scalar parameters
    #[must_use]
    pub fn num_parameters(&self) -> usize {
        self.tensors.values().map(|tensor| tensor.len()).sum()
    }
}

/// Learning agent driven by a rollout worker.
///
/// The numerics behind `get_action` and `update` live outside this crate;
/// the worker treats both as opaque calls.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Select an action for `state`
    async fn get_action(&mut self, state: &State, use_exploration: bool) -> crate::Result<ActionOutput>;

    /// Reset per-episode internal state
    fn reset(&mut self) {}

    /// Run one learning update on `batch`
    async fn update(&mut self, batch: &TransitionBatch) -> crate::Result<UpdateOutcome>;

    /// Apply the agent's preprocessing to a raw state
    fn preprocess_state(&self, state: &State) -> crate::Result<State> {
        Ok(state.clone())
    }

    /// Space of preprocessed states
    fn preprocessed_state_space(&self) -> Space;

    /// Replace the policy parameters
    fn set_policy_weights(&mut self, weights: &PolicyWeights) -> crate::Result<()>;

    /// Snapshot of the current policy parameters
    fn policy_weights(&self) -> PolicyWeights;
}
