//! States, actions and the spaces they live in

use ndarray::ArrayD;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Environment state or preprocessed agent input.
pub type State = ArrayD<f32>;

/// Action chosen by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Index into a discrete action set
    Discrete(usize),
    /// Real-valued action vector
    Continuous(Vec<f32>),
}

impl Action {
    /// Convert action to a vector representation
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_vec(&self) -> Vec<f32> {
        match self {
            Self::Discrete(index) => vec![*index as f32],
            Self::Continuous(values) => values.clone(),
        }
    }

    /// Discrete index, if this is a discrete action
    #[must_use]
    pub fn as_discrete(&self) -> Option<usize> {
        match self {
            Self::Discrete(index) => Some(*index),
            Self::Continuous(_) => None,
        }
    }
}

/// Description of a state or action space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Space {
    /// `n` discrete choices
    Discrete {
        /// Number of discrete choices
        n: usize,
    },
    /// Bounded real vector
    Continuous {
        /// Lower bounds for each dimension
        low: Vec<f32>,
        /// Upper bounds for each dimension
        high: Vec<f32>,
    },
}

impl Space {
    /// Create a bounded continuous space
    pub fn continuous(low: Vec<f32>, high: Vec<f32>) -> crate::Result<Self> {
        if low.len() != high.len() {
            return Err(crate::RolloutError::DimensionMismatch {
                expected: low.len(),
                actual: high.len(),
            });
        }
        Ok(Self::Continuous { low, high })
    }

    /// Shape of a single element of this space
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Discrete { .. } => vec![1],
            Self::Continuous { low, .. } => vec![low.len()],
        }
    }

    /// Sample a random action from the space
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        match self {
            Self::Discrete { n } => Action::Discrete(rng.gen_range(0..(*n).max(1))),
            Self::Continuous { low, high } => Action::Continuous(
                low.iter()
                    .zip(high)
                    .map(|(l, h)| sample_interval(rng, *l, *h))
                    .collect(),
            ),
        }
    }

    /// Check if an action is valid within this space
    #[must_use]
    pub fn contains(&self, action: &Action) -> bool {
        match (self, action) {
            (Self::Discrete { n }, Action::Discrete(index)) => index < n,
            (Self::Continuous { low, high }, Action::Continuous(values)) => {
                values.len() == low.len()
                    && values
                        .iter()
                        .zip(low)
                        .zip(high)
                        .all(|((x, l), h)| x >= l && x <= h)
            }
            _ => false,
        }
    }

    /// Zero-valued state with the shape of this space
    #[must_use]
    pub fn zeros(&self) -> State {
        State::zeros(self.shape())
    }
}

/// Uniform draw from `[low, high)`; unbounded sides are clamped to the
/// finite `f32` range
fn sample_interval<R: Rng + ?Sized>(rng: &mut R, low: f32, high: f32) -> f32 {
    if low.is_nan() || high.is_nan() || low >= high {
        return low;
    }
    let (low, high) = (low.max(f32::MIN), high.min(f32::MAX));
    if (high - low).is_finite() {
        return rng.gen_range(low..high);
    }
    // Width overflows f32, so draw around the midpoint in half-widths
    let mid = low * 0.5 + high * 0.5;
    let half = high * 0.5 - low * 0.5;
    (mid + half * rng.gen_range(-1.0f32..1.0)).clamp(low, high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_discrete_sample_is_contained() {
        let space = Space::Discrete { n: 3 };
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let action = space.sample(&mut rng);
            assert!(space.contains(&action));
        }
    }

    #[test]
    fn test_continuous_rejects_mismatched_bounds() {
        let err = Space::continuous(vec![0.0, 0.0], vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            crate::RolloutError::DimensionMismatch { expected: 2, actual: 1 }
        ));
    }

    #[test]
    fn test_kind_mismatch_is_not_contained() {
        let space = Space::Discrete { n: 2 };
        assert!(!space.contains(&Action::Continuous(vec![0.0])));
    }

    #[test]
    fn test_unbounded_continuous_sample_is_finite() {
        let space = Space::Continuous {
            low: vec![-f32::MAX, f32::NEG_INFINITY, 0.0],
            high: vec![f32::MAX, f32::INFINITY, f32::INFINITY],
        };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let action = space.sample(&mut rng);
            let Action::Continuous(values) = &action else {
                panic!("expected a continuous action");
            };
            assert!(values.iter().all(|v| v.is_finite()));
            assert!(space.contains(&action));
        }
    }

    proptest! {
        #[test]
        fn prop_continuous_sample_is_contained(
            bounds in prop::collection::vec((-100.0f32..100.0, 0.0f32..50.0), 1..8),
            seed in any::<u64>(),
        ) {
            let low: Vec<f32> = bounds.iter().map(|(l, _)| *l).collect();
            let high: Vec<f32> = bounds.iter().map(|(l, w)| l + w).collect();
            let space = Space::continuous(low, high).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);

            let action = space.sample(&mut rng);

            prop_assert!(space.contains(&action));
            let zeros = space.zeros();
            prop_assert_eq!(zeros.shape(), &[bounds.len()][..]);
        }
    }
}
