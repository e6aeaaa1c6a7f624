//! Turning raw trajectories into training-ready sample batches

use rollout_core::{
    compress, Agent, CompressedState, Result, RolloutError, SampleBatch, TransitionBatch,
    WorkerSpec, SMALL_NUMBER,
};

/// Applies n-step reward folding, priority weighting and state compression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchPostProcessor {
    n_step: usize,
    discount: f64,
    compute_weights: bool,
}

impl BatchPostProcessor {
    /// Create a post-processor
    pub fn new(n_step: usize, discount: f64, compute_weights: bool) -> Result<Self> {
        if n_step == 0 {
            return Err(RolloutError::Config("n_step must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&discount) {
            return Err(RolloutError::Config(format!(
                "discount must lie in [0, 1], got {discount}"
            )));
        }
        Ok(Self {
            n_step,
            discount,
            compute_weights,
        })
    }

    /// Create the post-processor a worker with `spec` uses
    pub fn from_spec(spec: &WorkerSpec, discount: f64) -> Result<Self> {
        Self::new(spec.n_step_adjustment, discount, spec.worker_computes_weights)
    }

    /// Steps folded into each reward
    #[must_use]
    pub fn n_step(&self) -> usize {
        self.n_step
    }

    /// Fold the next `n - 1` discounted rewards into each transition.
    ///
    /// Successor and terminal flag move to the last folded step; folding
    /// stops at a terminal. The trailing `n - 1` transitions lack a full
    /// horizon and are dropped.
    pub fn adjust_n_step(&self, batch: &mut TransitionBatch) {
        let n = self.n_step;
        if n <= 1 {
            return;
        }
        let len = batch.len();
        if len >= n {
            for i in 0..=len - n {
                if batch.terminals[i] {
                    continue;
                }
                let mut factor = 1.0;
                for j in 1..n {
                    factor *= self.discount;
                    batch.rewards[i] += factor * batch.rewards[i + j];
                    batch.next_states[i] = batch.next_states[i + j].clone();
                    batch.terminals[i] = batch.terminals[i + j];
                    if batch.terminals[i + j] {
                        break;
                    }
                }
            }
        }
        batch.truncate(len.saturating_sub(n - 1));
    }

    /// Priority weights `|loss| + SMALL_NUMBER`, one per transition
    pub async fn priority_weights(
        &self,
        batch: &TransitionBatch,
        agent: &mut dyn Agent,
    ) -> Result<Vec<f64>> {
        let outcome = agent.update(batch).await?;
        if outcome.loss_per_item.len() != batch.len() {
            return Err(RolloutError::Agent(format!(
                "update returned {} losses for {} transitions",
                outcome.loss_per_item.len(),
                batch.len()
            )));
        }
        Ok(outcome
            .loss_per_item
            .iter()
            .map(|loss| loss.abs() + SMALL_NUMBER)
            .collect())
    }

    /// Post-process `batch` into a compressed sample batch.
    ///
    /// Returns the batch together with its transition count.
    pub async fn process(
        &self,
        mut batch: TransitionBatch,
        agent: &mut dyn Agent,
    ) -> Result<(SampleBatch, usize)> {
        self.adjust_n_step(&mut batch);

        if self.compute_weights && !batch.is_empty() {
            batch.importance_weights = self.priority_weights(&batch, agent).await?;
        }

        let states = batch
            .states
            .iter()
            .map(compress)
            .collect::<Result<Vec<CompressedState>>>()?;
        let size = batch.len();

        Ok((
            SampleBatch {
                states,
                actions: batch.actions,
                rewards: batch.rewards,
                terminals: batch.terminals,
                importance_weights: batch.importance_weights,
            },
            size,
        ))
    }
}
