//! Baseline agents for rollout collection
//!
//! Learning agents wrap an external ML framework and register themselves
//! through `rollout_core::register_agent`; this crate only ships the
//! uniform-random baseline.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod random;

pub use random::RandomAgent;

use rollout_core::{Agent, AgentConfig};

/// Register the built-in agents under `"random"`
pub fn register_builtin_agents() {
    rollout_core::register_agent("random", |config: &AgentConfig| {
        Ok(Box::new(RandomAgent::from_config(config)?) as Box<dyn Agent>)
    });
    tracing::debug!("registered built-in agents");
}
