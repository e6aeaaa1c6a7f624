//! Deterministic chain walk

use async_trait::async_trait;
use ndarray::arr1;

use rollout_core::{Action, EnvSpec, Environment, Result, Space, State, Step, StepInfo};

/// Walks one position per step along a chain and pays a fixed reward.
///
/// The episode ends with a terminal once `length` steps were taken; a
/// `length` of 0 never terminates. Actions are accepted but ignored.
#[derive(Debug, Clone)]
pub struct ChainEnv {
    length: usize,
    reward: f64,
    position: usize,
}

impl ChainEnv {
    /// Create a chain from the `length` and `reward` spec parameters
    pub fn new(spec: &EnvSpec) -> Result<Self> {
        Ok(Self::with_length(
            spec.param_usize("length").unwrap_or(10),
            spec.param_f64("reward").unwrap_or(1.0),
        ))
    }

    /// Create a chain directly
    #[must_use]
    pub fn with_length(length: usize, reward: f64) -> Self {
        Self {
            length,
            reward,
            position: 0,
        }
    }

    /// Steps taken since the last reset
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[allow(clippy::cast_precision_loss)]
    fn observation(&self) -> State {
        arr1(&[self.position as f32]).into_dyn()
    }
}

#[async_trait]
impl Environment for ChainEnv {
    #[allow(clippy::cast_precision_loss)]
    fn state_space(&self) -> Space {
        let high = if self.length == 0 { f32::MAX } else { self.length as f32 };
        Space::Continuous {
            low: vec![0.0],
            high: vec![high],
        }
    }

    fn action_space(&self) -> Space {
        Space::Discrete { n: 2 }
    }

    async fn reset(&mut self) -> Result<State> {
        self.position = 0;
        Ok(self.observation())
    }

    async fn step(&mut self, _action: &Action) -> Result<Step> {
        self.position += 1;
        Ok(Step {
            next_state: self.observation(),
            reward: self.reward,
            terminal: self.length > 0 && self.position >= self.length,
            info: StepInfo::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_terminal_after_length_steps() {
        let spec = EnvSpec::new("chain").with_param("length", json!(3));
        let mut env = ChainEnv::new(&spec).unwrap();
        env.reset().await.unwrap();

        let mut flags = Vec::new();
        for _ in 0..3 {
            flags.push(env.step(&Action::Discrete(0)).await.unwrap().terminal);
        }

        assert_eq!(flags, vec![false, false, true]);
        assert_eq!(env.position(), 3);
    }

    #[tokio::test]
    async fn test_zero_length_never_terminates() {
        let mut env = ChainEnv::with_length(0, 0.5);
        env.reset().await.unwrap();
        for _ in 0..100 {
            let step = env.step(&Action::Discrete(1)).await.unwrap();
            assert!(!step.terminal);
            approx::assert_relative_eq!(step.reward, 0.5);
        }
    }

    #[tokio::test]
    async fn test_reset_returns_to_origin() {
        let mut env = ChainEnv::with_length(5, 1.0);
        env.reset().await.unwrap();
        env.step(&Action::Discrete(0)).await.unwrap();

        let state = env.reset().await.unwrap();

        assert_eq!(state, arr1(&[0.0f32]).into_dyn());
    }
}
