//! Bounded rolling histories with incremental all-time aggregates

use std::collections::VecDeque;

use rollout_core::RUNTIME_EPSILON;

/// Fixed-capacity window that evicts its oldest entry when full
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RollingWindow<T> {
    /// Create an empty window holding at most `capacity` entries
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest one if the window is full
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Number of retained entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the window is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Most recent entry
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// Retained entries, oldest first
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

/// Completed-episode rewards and lengths.
///
/// The windows keep recent episodes only; count, sum, min and max cover
/// every episode ever recorded.
#[derive(Debug, Clone)]
pub struct EpisodeHistory {
    rewards: RollingWindow<f64>,
    timesteps: RollingWindow<usize>,
    count: usize,
    reward_sum: f64,
    min_reward: f64,
    max_reward: f64,
}

impl EpisodeHistory {
    /// Create an empty history keeping `capacity` recent episodes
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            rewards: RollingWindow::new(capacity),
            timesteps: RollingWindow::new(capacity),
            count: 0,
            reward_sum: 0.0,
            min_reward: f64::INFINITY,
            max_reward: f64::NEG_INFINITY,
        }
    }

    /// Record a completed episode
    pub fn record(&mut self, reward: f64, timesteps: usize) {
        self.rewards.push(reward);
        self.timesteps.push(timesteps);
        self.count += 1;
        self.reward_sum += reward;
        self.min_reward = self.min_reward.min(reward);
        self.max_reward = self.max_reward.max(reward);
    }

    /// Episodes recorded so far
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean reward over all episodes
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_reward(&self) -> Option<f64> {
        (self.count > 0).then(|| self.reward_sum / self.count as f64)
    }

    /// Lowest reward over all episodes
    #[must_use]
    pub fn min_reward(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min_reward)
    }

    /// Highest reward over all episodes
    #[must_use]
    pub fn max_reward(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max_reward)
    }

    /// Reward of the latest episode
    #[must_use]
    pub fn latest_reward(&self) -> Option<f64> {
        self.rewards.last().copied()
    }

    /// Recent episode rewards, oldest first
    #[must_use]
    pub fn recent_rewards(&self) -> Vec<f64> {
        self.rewards.to_vec()
    }

    /// Recent episode lengths, oldest first
    #[must_use]
    pub fn recent_timesteps(&self) -> Vec<usize> {
        self.timesteps.to_vec()
    }
}

/// All-time sample time, decision counts and environment frames
#[derive(Debug, Clone, Default)]
pub struct ThroughputHistory {
    total_time: f64,
    total_steps: usize,
    total_env_frames: usize,
}

impl ThroughputHistory {
    /// Create an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one worker call
    pub fn record(&mut self, runtime: f64, steps: usize, env_frames: usize) {
        self.total_time += runtime;
        self.total_steps += steps;
        self.total_env_frames += env_frames;
    }

    /// Decision points per second over all calls
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ops_per_second(&self) -> f64 {
        self.total_steps as f64 / self.total_time.max(RUNTIME_EPSILON)
    }

    /// Raw environment frames per second, scaled by the environment's
    /// internal frame multiplier
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn env_frames_per_second(&self, frame_multiplier: usize) -> f64 {
        (self.total_env_frames * frame_multiplier) as f64 / self.total_time.max(RUNTIME_EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = RollingWindow::new(2);
        window.push(1);
        window.push(2);
        window.push(3);

        assert_eq!(window.to_vec(), vec![2, 3]);
        assert_eq!(window.last(), Some(&3));
    }

    #[test]
    fn test_aggregates_cover_evicted_episodes() {
        let mut history = EpisodeHistory::new(2);
        history.record(-5.0, 10);
        history.record(1.0, 3);
        history.record(4.0, 7);

        assert_eq!(history.count(), 3);
        assert_eq!(history.recent_rewards(), vec![1.0, 4.0]);
        assert_eq!(history.recent_timesteps(), vec![3, 7]);
        assert_eq!(history.min_reward(), Some(-5.0));
        assert_eq!(history.max_reward(), Some(4.0));
        assert_eq!(history.latest_reward(), Some(4.0));
        assert_relative_eq!(history.mean_reward().unwrap(), 0.0);
    }

    #[test]
    fn test_empty_history_has_no_aggregates() {
        let history = EpisodeHistory::new(4);
        assert_eq!(history.mean_reward(), None);
        assert_eq!(history.min_reward(), None);
        assert_eq!(history.latest_reward(), None);
    }

    #[test]
    fn test_throughput_uses_totals() {
        let mut history = ThroughputHistory::new();
        history.record(1.0, 100, 400);
        history.record(3.0, 300, 1200);

        assert_relative_eq!(history.ops_per_second(), 100.0);
        assert_relative_eq!(history.env_frames_per_second(4), 1600.0);
    }

    #[test]
    fn test_zero_time_does_not_divide_by_zero() {
        let mut history = ThroughputHistory::new();
        history.record(0.0, 10, 10);

        assert!(history.ops_per_second().is_finite());
    }
}
