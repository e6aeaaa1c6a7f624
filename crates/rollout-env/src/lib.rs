//! Built-in environments for rollout collection
//!
//! - `CartPoleEnv`: classic pole balancing
//! - `ChainEnv`: deterministic fixed-length episodes, handy for smoke runs

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cartpole;
pub mod chain;

pub use cartpole::CartPoleEnv;
pub use chain::ChainEnv;

// Re-export core types
pub use rollout_core::{Action, EnvSpec, Environment, Space, State, Step, StepInfo};

/// Register the built-in environments under `"cartpole"` and `"chain"`
pub fn register_builtin_envs() {
    rollout_core::register_env("cartpole", |spec: &EnvSpec| {
        Ok(Box::new(CartPoleEnv::new(spec)?) as Box<dyn Environment>)
    });
    rollout_core::register_env("chain", |spec: &EnvSpec| {
        Ok(Box::new(ChainEnv::new(spec)?) as Box<dyn Environment>)
    });
    tracing::debug!("registered built-in environments");
}
