//! Random agent for baseline comparisons

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;

use rollout_core::{
    ActionOutput, Agent, AgentConfig, PolicyWeights, Result, RolloutError, Space, State,
    TransitionBatch, UpdateOutcome,
};

/// Random agent that selects actions uniformly at random.
///
/// It performs no learning: updates report zero loss for every item, and
/// policy weights are stored verbatim so weight broadcasts can be observed.
pub struct RandomAgent {
    /// Action space
    action_space: Space,
    /// State space
    state_space: Space,
    /// Last weights received
    weights: PolicyWeights,
    /// Updates applied so far
    updates: usize,
    rng: StdRng,
}

impl RandomAgent {
    /// Create a new random agent
    #[must_use]
    pub fn new(state_space: Space, action_space: Space) -> Self {
        Self {
            action_space,
            state_space,
            weights: PolicyWeights::new(),
            updates: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Build from a config whose spaces were filled in by the worker.
    ///
    /// An optional integer `seed` parameter makes action sampling
    /// reproducible.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let action_space = config
            .action_space
            .clone()
            .ok_or_else(|| RolloutError::Config("random agent needs an action space".to_string()))?;
        let state_space = config
            .state_space
            .clone()
            .ok_or_else(|| RolloutError::Config("random agent needs a state space".to_string()))?;

        let mut agent = Self::new(state_space, action_space);
        if let Some(seed) = config.params.get("seed").and_then(serde_json::Value::as_u64) {
            agent.rng = StdRng::seed_from_u64(seed);
        }
        Ok(agent)
    }

    /// Number of updates applied
    #[must_use]
    pub fn updates(&self) -> usize {
        self.updates
    }
}

#[async_trait]
impl Agent for RandomAgent {
    async fn get_action(&mut self, state: &State, _use_exploration: bool) -> Result<ActionOutput> {
        Ok(ActionOutput {
            action: self.action_space.sample(&mut self.rng),
            preprocessed_state: state.clone(),
        })
    }

    async fn update(&mut self, batch: &TransitionBatch) -> Result<UpdateOutcome> {
        self.updates += 1;
        Ok(UpdateOutcome {
            loss: 0.0,
            loss_per_item: vec![0.0; batch.len()],
        })
    }

    fn preprocessed_state_space(&self) -> Space {
        self.state_space.clone()
    }

    fn set_policy_weights(&mut self, weights: &PolicyWeights) -> Result<()> {
        self.weights = weights.clone();
        Ok(())
    }

    fn policy_weights(&self) -> PolicyWeights {
        self.weights.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;
    use serde_json::json;

    fn config() -> AgentConfig {
        let mut config = AgentConfig::new("random");
        config.state_space = Some(Space::Continuous {
            low: vec![-1.0],
            high: vec![1.0],
        });
        config.action_space = Some(Space::Discrete { n: 3 });
        config
    }

    #[tokio::test]
    async fn test_actions_stay_in_space() {
        let mut agent = RandomAgent::from_config(&config()).unwrap();
        let state = arr1(&[0.5f32]).into_dyn();

        for _ in 0..20 {
            let output = agent.get_action(&state, true).await.unwrap();
            assert!(matches!(output.action.as_discrete(), Some(a) if a < 3));
            assert_eq!(output.preprocessed_state, state);
        }
    }

    #[tokio::test]
    async fn test_seed_makes_actions_reproducible() {
        let mut config = config();
        config.params.insert("seed".to_string(), json!(7));
        let mut first = RandomAgent::from_config(&config).unwrap();
        let mut second = RandomAgent::from_config(&config).unwrap();
        let state = arr1(&[0.0f32]).into_dyn();

        for _ in 0..10 {
            let a = first.get_action(&state, true).await.unwrap().action;
            let b = second.get_action(&state, true).await.unwrap().action;
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_missing_action_space_is_config_error() {
        let err = RandomAgent::from_config(&AgentConfig::new("random")).err().unwrap();
        assert!(matches!(err, RolloutError::Config(_)));
    }

    #[tokio::test]
    async fn test_update_reports_zero_loss_per_item() {
        let mut agent = RandomAgent::from_config(&config()).unwrap();
        let batch = TransitionBatch {
            rewards: vec![1.0, 2.0],
            ..TransitionBatch::default()
        };

        let outcome = agent.update(&batch).await.unwrap();

        assert_eq!(outcome.loss_per_item, vec![0.0, 0.0]);
        assert_eq!(agent.updates(), 1);
    }

    #[test]
    fn test_weights_round_trip() {
        let mut agent = RandomAgent::from_config(&config()).unwrap();
        let weights = PolicyWeights::new().with("dense/kernel", arr1(&[1.0f32, 2.0]).into_dyn());

        agent.set_policy_weights(&weights).unwrap();

        assert_eq!(agent.policy_weights(), weights);
    }
}
