//! Name-to-constructor registries for environments and agents

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::{Agent, AgentConfig, EnvSpec, Environment, RolloutError};

/// Boxed constructor building a `T` from its spec
pub type Constructor<S, T> = Box<dyn Fn(&S) -> crate::Result<Box<T>> + Send + Sync>;

/// Registry of environment constructors keyed by `EnvSpec::env_type`
pub type EnvRegistry = Registry<EnvSpec, dyn Environment>;

/// Registry of agent constructors keyed by `AgentConfig::agent_type`
pub type AgentRegistry = Registry<AgentConfig, dyn Agent>;

lazy_static::lazy_static! {
    static ref ENV_REGISTRY: RwLock<EnvRegistry> = RwLock::new(Registry::new("environment"));
    static ref AGENT_REGISTRY: RwLock<AgentRegistry> = RwLock::new(Registry::new("agent"));
}

/// Mapping from a type name to a constructor
pub struct Registry<S, T: ?Sized> {
    kind: &'static str,
    constructors: HashMap<String, Constructor<S, T>>,
}

impl<S, T: ?Sized> Registry<S, T> {
    /// Create an empty registry; `kind` names the registered things in errors
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            constructors: HashMap::new(),
        }
    }

    /// Register a constructor, replacing any previous one under `name`
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&S) -> crate::Result<Box<T>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.constructors.insert(name.clone(), Box::new(constructor)).is_some() {
            tracing::debug!(kind = self.kind, %name, "replaced registered constructor");
        }
    }

    /// Build an instance of the type registered under `name`
    pub fn make(&self, name: &str, spec: &S) -> crate::Result<Box<T>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| RolloutError::UnknownType {
                kind: self.kind,
                name: name.to_string(),
            })?;
        constructor(spec)
    }

    /// Whether a constructor is registered under `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// List registered names
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Register an environment globally
pub fn register_env<F>(name: impl Into<String>, constructor: F)
where
    F: Fn(&EnvSpec) -> crate::Result<Box<dyn Environment>> + Send + Sync + 'static,
{
    ENV_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(name, constructor);
}

/// Register an agent globally
pub fn register_agent<F>(name: impl Into<String>, constructor: F)
where
    F: Fn(&AgentConfig) -> crate::Result<Box<dyn Agent>> + Send + Sync + 'static,
{
    AGENT_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(name, constructor);
}

/// Build an environment from its spec using the global registry
pub fn build_env_from_config(spec: &EnvSpec) -> crate::Result<Box<dyn Environment>> {
    ENV_REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .make(&spec.env_type, spec)
}

/// Build an agent from its config using the global registry
pub fn build_agent_from_config(config: &AgentConfig) -> crate::Result<Box<dyn Agent>> {
    AGENT_REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .make(&config.agent_type, config)
}

/// List all globally registered environments
#[must_use]
pub fn list_envs() -> Vec<String> {
    ENV_REGISTRY.read().unwrap_or_else(PoisonError::into_inner).list()
}

/// List all globally registered agents
#[must_use]
pub fn list_agents() -> Vec<String> {
    AGENT_REGISTRY.read().unwrap_or_else(PoisonError::into_inner).list()
}
