//! Serializable configuration for agents, environments, workers and workloads

use serde::{Deserialize, Serialize};

use crate::{RolloutError, Space};

fn default_discount() -> f64 {
    0.99
}

fn default_one() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_history_capacity() -> usize {
    1000
}

/// Configuration for agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Registered agent type name
    #[serde(rename = "type")]
    pub agent_type: String,
    /// Discount factor
    #[serde(default = "default_discount")]
    pub discount: f64,
    /// State space, filled in from the environment by the worker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_space: Option<Space>,
    /// Action space, filled in from the environment by the worker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_space: Option<Space>,
    /// Exploration settings
    #[serde(default, rename = "exploration_spec", skip_serializing_if = "Option::is_none")]
    pub exploration: Option<ExplorationSpec>,
    /// Additional parameters
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl AgentConfig {
    /// Create a config for the given agent type with default settings
    pub fn new(agent_type: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            discount: default_discount(),
            state_space: None,
            action_space: None,
            exploration: None,
            params: serde_json::Map::new(),
        }
    }

    /// Set the discount factor
    #[must_use]
    pub fn with_discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    /// Set the exploration spec
    #[must_use]
    pub fn with_exploration(mut self, exploration: ExplorationSpec) -> Self {
        self.exploration = Some(exploration);
        self
    }

    /// Starting epsilon of the decay schedule, if one is configured
    #[must_use]
    pub fn epsilon_decay_from(&self) -> Option<f64> {
        self.exploration
            .as_ref()
            .and_then(|exploration| exploration.epsilon_spec.decay_spec.as_ref())
            .map(|decay| decay.from)
    }
}

/// Exploration settings of an agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplorationSpec {
    /// Epsilon-greedy settings
    #[serde(default)]
    pub epsilon_spec: EpsilonSpec,
}

/// Epsilon-greedy settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpsilonSpec {
    /// Decay schedule for epsilon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay_spec: Option<DecaySpec>,
    /// Additional parameters
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Decay schedule endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecaySpec {
    /// Initial value
    pub from: f64,
    /// Final value
    pub to: f64,
    /// Timesteps over which the value decays
    #[serde(default)]
    pub num_timesteps: usize,
}

/// Environment specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvSpec {
    /// Registered environment type name
    #[serde(rename = "type")]
    pub env_type: String,
    /// Frames the environment advances internally per step
    #[serde(default = "default_one")]
    pub frameskip: usize,
    /// Random seed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Additional parameters
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl EnvSpec {
    /// Create a spec for the given environment type
    pub fn new(env_type: impl Into<String>) -> Self {
        Self {
            env_type: env_type.into(),
            frameskip: 1,
            seed: None,
            params: serde_json::Map::new(),
        }
    }

    /// Set a free-form parameter
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Read an unsigned integer parameter
    #[must_use]
    pub fn param_usize(&self, key: &str) -> Option<usize> {
        self.params
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .and_then(|value| usize::try_from(value).ok())
    }

    /// Read a float parameter
    #[must_use]
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(serde_json::Value::as_f64)
    }
}

/// Worker-specific settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Compute priority weights from the agent's per-item loss
    #[serde(default = "default_true")]
    pub worker_computes_weights: bool,
    /// Steps folded into each transition's reward
    #[serde(default = "default_one")]
    pub n_step_adjustment: usize,
    /// Randomise the agent's initial exploration epsilon
    #[serde(default)]
    pub sample_exploration: bool,
    /// Lower bound for the sampled initial epsilon
    #[serde(default)]
    pub exploration_min_value: f64,
    /// Entries kept in each rolling history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for WorkerSpec {
    fn default() -> Self {
        Self {
            worker_computes_weights: true,
            n_step_adjustment: 1,
            sample_exploration: false,
            exploration_min_value: 0.0,
            history_capacity: default_history_capacity(),
        }
    }
}

impl WorkerSpec {
    /// Check the spec against the discount it will be used with
    pub fn validate(&self, discount: f64) -> crate::Result<()> {
        if self.n_step_adjustment == 0 {
            return Err(RolloutError::Config(
                "n_step_adjustment must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&discount) {
            return Err(RolloutError::Config(format!(
                "discount must lie in [0, 1], got {discount}"
            )));
        }
        if self.history_capacity == 0 {
            return Err(RolloutError::Config(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Work requested from a single worker call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerWorkload {
    /// Decision points to collect; 0 runs until a terminal
    pub num_timesteps: usize,
    /// Episode truncation limit; 0 is unlimited
    #[serde(default)]
    pub max_timesteps_per_episode: usize,
    /// Whether the agent explores
    #[serde(default = "default_true")]
    pub use_exploration: bool,
    /// Stop the call at the first terminal
    #[serde(default)]
    pub break_on_terminal: bool,
}

impl Default for WorkerWorkload {
    fn default() -> Self {
        Self {
            num_timesteps: 0,
            max_timesteps_per_episode: 0,
            use_exploration: true,
            break_on_terminal: false,
        }
    }
}

impl WorkerWorkload {
    /// Collect exactly `num_timesteps` decision points
    #[must_use]
    pub fn timesteps(num_timesteps: usize) -> Self {
        Self {
            num_timesteps,
            ..Self::default()
        }
    }

    /// Run until the current episode hits a terminal
    #[must_use]
    pub fn until_terminal() -> Self {
        Self {
            break_on_terminal: true,
            ..Self::default()
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

    /// Set the terminal-break policy
    #[must_use]
    pub fn with_break_on_terminal(mut self, break_on_terminal: bool) -> Self {
        self.break_on_terminal = break_on_terminal;
        self
    }

    /// Reject workloads that could never finish
    pub fn validate(&self) -> crate::Result<()> {
        if self.num_timesteps == 0 && !self.break_on_terminal {
            return Err(RolloutError::Config(
                "num_timesteps of 0 requires break_on_terminal".to_string(),
            ));
        }
        Ok(())
    }
}
