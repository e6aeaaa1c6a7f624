//! Core traits and types for distributed rollout collection
//!
//! This crate defines the capability interfaces a rollout worker drives
//! (`Environment`, `Agent`), the records it produces (`Trajectory`,
//! `SampleBatch`, `EnvironmentSample`) and the configuration and registry
//! plumbing used to build workers by name.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod compress;
pub mod config;
pub mod environment;
pub mod error;
pub mod registry;
pub mod sample;
pub mod space;
pub mod trajectory;

// Re-export core traits and types
pub use agent::{ActionOutput, Agent, PolicyWeights, UpdateOutcome};
pub use compress::{compress, decompress, CompressedState};
pub use config::{
    AgentConfig, DecaySpec, EnvSpec, EpsilonSpec, ExplorationSpec, WorkerSpec, WorkerWorkload,
};
pub use environment::{Environment, Step, StepInfo};
pub use error::{Result, RolloutError};
pub use registry::{
    build_agent_from_config, build_env_from_config, list_agents, list_envs, register_agent,
    register_env, AgentRegistry, Constructor, EnvRegistry, Registry,
};
pub use sample::{EnvironmentSample, SampleBatch, SampleMetrics};
pub use space::{Action, Space, State};
pub use trajectory::{Trajectory, TransitionBatch};

/// Floor added to priority weights so no transition gets a zero weight.
pub const SMALL_NUMBER: f64 = 1e-6;

/// Denominator substituted for a zero elapsed runtime.
pub const RUNTIME_EPSILON: f64 = 1e-10;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, Agent, AgentConfig, EnvSpec, Environment, EnvironmentSample, Result,
        RolloutError, Space, State, Step, WorkerSpec, WorkerWorkload,
    };
}
