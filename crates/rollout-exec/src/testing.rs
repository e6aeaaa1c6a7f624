//! Scripted environment and recording agent for unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ndarray::arr1;
use rollout_core::{
    Action, ActionOutput, Agent, Environment, PolicyWeights, Result, RolloutError, Space, State,
    Step, StepInfo, TransitionBatch, UpdateOutcome,
};

/// Pays `rewards[k % len]` on the k-th step of an episode and reports a
/// terminal after `episode_length` steps, if set. The observation is the
/// step index within the episode.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEnv {
    pub rewards: Vec<f64>,
    pub episode_length: Option<usize>,
    pub fail_on_step: Option<usize>,
    pub frame_multiplier: usize,
    pub position: usize,
    pub total_steps: usize,
    pub resets: Arc<AtomicUsize>,
}

impl ScriptedEnv {
    pub fn constant(reward: f64) -> Self {
        Self {
            rewards: vec![reward],
            frame_multiplier: 1,
            ..Self::default()
        }
    }

    pub fn with_episode_length(mut self, length: usize) -> Self {
        self.episode_length = Some(length);
        self
    }

    pub fn with_rewards(mut self, rewards: Vec<f64>) -> Self {
        self.rewards = rewards;
        self
    }

    #[allow(clippy::cast_precision_loss)]
    fn observation(&self) -> State {
        arr1(&[self.position as f32]).into_dyn()
    }
}

#[async_trait]
impl Environment for ScriptedEnv {
    fn state_space(&self) -> Space {
        Space::Continuous {
            low: vec![0.0],
            high: vec![f32::MAX],
        }
    }

    fn action_space(&self) -> Space {
        Space::Discrete { n: 2 }
    }

    fn frame_multiplier(&self) -> usize {
        self.frame_multiplier
    }

    async fn reset(&mut self) -> Result<State> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.position = 0;
        Ok(self.observation())
    }

    async fn step(&mut self, _action: &Action) -> Result<Step> {
        self.total_steps += 1;
        if self.fail_on_step == Some(self.total_steps) {
            return Err(RolloutError::Environment("scripted failure".to_string()));
        }
        let reward = self.rewards[self.position % self.rewards.len()];
        self.position += 1;
        Ok(Step {
            next_state: self.observation(),
            reward,
            terminal: self.episode_length.is_some_and(|len| self.position >= len),
            info: StepInfo::default(),
        })
    }
}

/// Agent that always picks action 0 and records every update batch
#[derive(Debug, Clone, Default)]
pub struct RecordingAgent {
    losses: Option<Vec<f64>>,
    updates: Arc<Mutex<Vec<TransitionBatch>>>,
    resets: Arc<AtomicUsize>,
    weights: PolicyWeights,
}

impl RecordingAgent {
    pub fn with_losses(losses: Vec<f64>) -> Self {
        Self {
            losses: Some(losses),
            ..Self::default()
        }
    }

    pub fn updates(&self) -> Arc<Mutex<Vec<TransitionBatch>>> {
        Arc::clone(&self.updates)
    }

    pub fn resets(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.resets)
    }
}

#[async_trait]
impl Agent for RecordingAgent {
    async fn get_action(&mut self, state: &State, _use_exploration: bool) -> Result<ActionOutput> {
        Ok(ActionOutput {
            action: Action::Discrete(0),
            preprocessed_state: state.clone(),
        })
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    async fn update(&mut self, batch: &TransitionBatch) -> Result<UpdateOutcome> {
        self.updates.lock().unwrap().push(batch.clone());
        let loss_per_item = self.losses.clone().unwrap_or_else(|| vec![0.0; batch.len()]);
        Ok(UpdateOutcome {
            loss: loss_per_item.iter().sum(),
            loss_per_item,
        })
    }

    fn preprocessed_state_space(&self) -> Space {
        Space::Continuous {
            low: vec![0.0],
            high: vec![f32::MAX],
        }
    }

    fn set_policy_weights(&mut self, weights: &PolicyWeights) -> Result<()> {
        self.weights = weights.clone();
        Ok(())
    }

    fn policy_weights(&self) -> PolicyWeights {
        self.weights.clone()
    }
}
