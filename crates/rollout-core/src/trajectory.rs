//! Raw trajectories and aligned transition batches

use serde::{Deserialize, Serialize};

use crate::{Action, State};

/// Decision points recorded by a worker during one call, in order.
///
/// States are stored as the agent preprocessed them. Successor states are
/// implied by the order and only materialised by [`Trajectory::into_transitions`].
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    /// Preprocessed state at each decision point
    pub states: Vec<State>,
    /// Action taken at each decision point
    pub actions: Vec<Action>,
    /// Reward summed over the frames the action was repeated for
    pub rewards: Vec<f64>,
    /// Whether the decision point ended its episode with a terminal
    pub terminals: Vec<bool>,
}

impl Trajectory {
    /// Create an empty trajectory with room for `capacity` decision points
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            states: Vec::with_capacity(capacity),
            actions: Vec::with_capacity(capacity),
            rewards: Vec::with_capacity(capacity),
            terminals: Vec::with_capacity(capacity),
        }
    }

    /// Record the state and action of a new decision point
    pub fn push_decision(&mut self, state: State, action: Action) {
        self.states.push(state);
        self.actions.push(action);
    }

    /// Record the outcome of the most recent decision point
    pub fn push_outcome(&mut self, reward: f64, terminal: bool) {
        self.rewards.push(reward);
        self.terminals.push(terminal);
    }

    /// Number of decision points
    #[must_use]
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Check if trajectory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Build aligned transitions.
    ///
    /// `next_states[i]` is `states[i + 1]`; the last successor is
    /// `final_successor`. Importance weights start at 1.0.
    #[must_use]
    pub fn into_transitions(self, final_successor: State) -> TransitionBatch {
        let mut next_states: Vec<State> = self.states.iter().skip(1).cloned().collect();
        if !self.states.is_empty() {
            next_states.push(final_successor);
        }
        let importance_weights = vec![1.0; self.rewards.len()];

        TransitionBatch {
            states: self.states,
            actions: self.actions,
            rewards: self.rewards,
            terminals: self.terminals,
            next_states,
            importance_weights,
        }
    }
}

/// Column-wise batch of transitions handed to `Agent::update`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionBatch {
    /// States
    pub states: Vec<State>,
    /// Actions
    pub actions: Vec<Action>,
    /// Rewards
    pub rewards: Vec<f64>,
    /// Terminal flags
    pub terminals: Vec<bool>,
    /// Successor states
    pub next_states: Vec<State>,
    /// Per-transition importance weights
    pub importance_weights: Vec<f64>,
}

impl TransitionBatch {
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
            && self.next_states.len() == n
            && self.importance_weights.len() == n
    }

    /// Keep only the first `len` transitions of every column
    pub fn truncate(&mut self, len: usize) {
        self.states.truncate(len);
        self.actions.truncate(len);
        self.rewards.truncate(len);
        self.terminals.truncate(len);
        self.next_states.truncate(len);
        self.importance_weights.truncate(len);
    }
}
