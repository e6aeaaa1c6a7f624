//! Classic cart-pole balancing

use async_trait::async_trait;
use ndarray::arr1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rollout_core::{
    Action, EnvSpec, Environment, Result, RolloutError, Space, State, Step, StepInfo,
};

/// CartPole environment.
///
/// `EnvSpec::frameskip` physics ticks are simulated per `step`; the
/// reward is 1 per surviving tick.
pub struct CartPoleEnv {
    /// Current state
    state: CartPoleState,
    /// Configuration
    config: CartPoleConfig,
    /// Step count
    steps: usize,
    /// Physics ticks per step
    frameskip: usize,
    rng: StdRng,
}

#[derive(Debug, Clone, Default)]
struct CartPoleState {
    x: f64,         // Cart position
    x_dot: f64,     // Cart velocity
    theta: f64,     // Pole angle
    theta_dot: f64, // Pole angular velocity
}

#[derive(Debug, Clone)]
struct CartPoleConfig {
    gravity: f64,
    mass_cart: f64,
    mass_pole: f64,
    length: f64,
    force_mag: f64,
    tau: f64,
    max_steps: usize,
    x_threshold: f64,
    theta_threshold: f64,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            mass_cart: 1.0,
            mass_pole: 0.1,
            length: 0.5,
            force_mag: 10.0,
            tau: 0.02,
            max_steps: 500,
            x_threshold: 2.4,
            theta_threshold: 0.209, // ~12 degrees
        }
    }
}

impl CartPoleEnv {
    /// Create a new CartPole environment.
    ///
    /// Reads `max_steps` from the spec parameters.
    pub fn new(spec: &EnvSpec) -> Result<Self> {
        if spec.frameskip == 0 {
            return Err(RolloutError::Config("cartpole frameskip must be at least 1".to_string()));
        }
        let mut config = CartPoleConfig::default();
        if let Some(max_steps) = spec.param_usize("max_steps") {
            config.max_steps = max_steps;
        }
        let rng = match spec.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            state: CartPoleState::default(),
            config,
            steps: 0,
            frameskip: spec.frameskip,
            rng,
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn observation(&self) -> State {
        arr1(&[
            self.state.x as f32,
            self.state.x_dot as f32,
            self.state.theta as f32,
            self.state.theta_dot as f32,
        ])
        .into_dyn()
    }

    fn is_done(&self) -> bool {
        self.state.x.abs() > self.config.x_threshold
            || self.state.theta.abs() > self.config.theta_threshold
            || self.steps >= self.config.max_steps
    }

    fn tick(&mut self, force: f64) {
        let cos_theta = self.state.theta.cos();
        let sin_theta = self.state.theta.sin();

        let total_mass = self.config.mass_cart + self.config.mass_pole;
        let pole_mass_length = self.config.mass_pole * self.config.length;

        let temp = (force + pole_mass_length * self.state.theta_dot.powi(2) * sin_theta) / total_mass;
        let theta_acc = (self.config.gravity * sin_theta - cos_theta * temp)
            / (self.config.length
                * (4.0 / 3.0 - self.config.mass_pole * cos_theta.powi(2) / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        let dt = self.config.tau;
        self.state.x += dt * self.state.x_dot;
        self.state.x_dot += dt * x_acc;
        self.state.theta += dt * self.state.theta_dot;
        self.state.theta_dot += dt * theta_acc;
        self.steps += 1;
    }
}

#[async_trait]
impl Environment for CartPoleEnv {
    #[allow(clippy::cast_possible_truncation)]
    fn state_space(&self) -> Space {
        let high = vec![
            (self.config.x_threshold * 2.0) as f32,
            f32::MAX,
            (self.config.theta_threshold * 2.0) as f32,
            f32::MAX,
        ];
        let low = high.iter().map(|x| -x).collect();
        Space::Continuous { low, high }
    }

    fn action_space(&self) -> Space {
        Space::Discrete { n: 2 } // 0: push left, 1: push right
    }

    fn frame_multiplier(&self) -> usize {
        self.frameskip
    }

    async fn reset(&mut self) -> Result<State> {
        self.state = CartPoleState {
            x: self.rng.gen_range(-0.05..0.05),
            x_dot: self.rng.gen_range(-0.05..0.05),
            theta: self.rng.gen_range(-0.05..0.05),
            theta_dot: self.rng.gen_range(-0.05..0.05),
        };
        self.steps = 0;

        Ok(self.observation())
    }

    async fn step(&mut self, action: &Action) -> Result<Step> {
        let force = match action {
            Action::Discrete(0) => -self.config.force_mag,
            Action::Discrete(1) => self.config.force_mag,
            other => return Err(RolloutError::InvalidAction(format!("cartpole got {other:?}"))),
        };

        let mut reward = 0.0;
        let mut done = false;
        for _ in 0..self.frameskip {
            self.tick(force);
            reward += 1.0;
            done = self.is_done();
            if done {
                break;
            }
        }

        Ok(Step {
            next_state: self.observation(),
            reward,
            terminal: done,
            info: StepInfo::default(),
        })
    }
}
