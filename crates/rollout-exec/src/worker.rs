//! Rollout worker: one environment, one agent, one sampling loop

use std::time::Instant;

use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use rollout_core::{
    build_agent_from_config, build_env_from_config, ActionOutput, Agent, AgentConfig, EnvSpec,
    Environment, EnvironmentSample, PolicyWeights, Result, RolloutError, SampleMetrics, State,
    Trajectory, WorkerSpec, WorkerWorkload, RUNTIME_EPSILON,
};

use crate::history::{EpisodeHistory, ThroughputHistory};
use crate::postprocess::BatchPostProcessor;
use crate::stats::WorkloadStatistics;

/// Owns an environment and an agent and turns workload requests into
/// post-processed sample batches.
///
/// Episodes carry over between calls: a call that runs out of timesteps
/// mid-episode resumes that episode on the next call.
pub struct RolloutWorker {
    id: String,
    environment: Box<dyn Environment>,
    agent: Box<dyn Agent>,
    post_processor: BatchPostProcessor,
    frameskip: usize,
    env_frame_multiplier: usize,

    last_state: State,
    last_ep_reward: f64,
    last_ep_timestep: usize,
    last_terminal: bool,

    total_worker_steps: usize,
    episodes: EpisodeHistory,
    throughput: ThroughputHistory,
}

impl RolloutWorker {
    /// Build a worker from registered environment and agent types.
    ///
    /// The environment's spaces are written into the agent config before
    /// the agent is built, and the initial exploration epsilon is sampled
    /// when the worker spec asks for it.
    pub async fn new(
        mut agent_config: AgentConfig,
        env_spec: &EnvSpec,
        worker_spec: &WorkerSpec,
        frameskip: usize,
    ) -> Result<Self> {
        worker_spec.validate(agent_config.discount)?;

        let environment = build_env_from_config(env_spec)?;
        agent_config.state_space = Some(environment.state_space());
        agent_config.action_space = Some(environment.action_space());
        sample_exploration(&mut agent_config, worker_spec)?;
        let agent = build_agent_from_config(&agent_config)?;

        Self::from_parts(environment, agent, worker_spec, agent_config.discount, frameskip).await
    }

    /// Build a worker around an existing environment and agent
    pub async fn from_parts(
        mut environment: Box<dyn Environment>,
        mut agent: Box<dyn Agent>,
        worker_spec: &WorkerSpec,
        discount: f64,
        frameskip: usize,
    ) -> Result<Self> {
        if frameskip == 0 {
            return Err(RolloutError::Config("frameskip must be at least 1".to_string()));
        }
        worker_spec.validate(discount)?;
        let post_processor = BatchPostProcessor::from_spec(worker_spec, discount)?;

        let last_state = environment.reset().await?;
        agent.reset();
        let id = Uuid::new_v4().to_string();
        let env_frame_multiplier = environment.frame_multiplier().max(1);

        info!(
            worker_id = %id,
            frameskip,
            env_frame_multiplier,
            n_step = worker_spec.n_step_adjustment,
            "rollout worker ready"
        );

        Ok(Self {
            id,
            environment,
            agent,
            post_processor,
            frameskip,
            env_frame_multiplier,
            last_state,
            last_ep_reward: 0.0,
            last_ep_timestep: 0,
            last_terminal: false,
            total_worker_steps: 0,
            episodes: EpisodeHistory::new(worker_spec.history_capacity),
            throughput: ThroughputHistory::new(),
        })
    }

    /// Unique worker id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the next call starts a fresh episode
    #[must_use]
    pub fn needs_reset(&self) -> bool {
        self.last_terminal
    }

    /// Decision points executed across all calls
    #[must_use]
    pub fn total_worker_steps(&self) -> usize {
        self.total_worker_steps
    }

    /// Completed episodes across all calls
    #[must_use]
    pub fn episodes_executed(&self) -> usize {
        self.episodes.count()
    }

    /// Completed-episode history
    #[must_use]
    pub fn episode_history(&self) -> &EpisodeHistory {
        &self.episodes
    }

    /// Run the sampling loop and return one post-processed sample
    pub async fn execute_and_get_timesteps(
        &mut self,
        workload: WorkerWorkload,
    ) -> Result<EnvironmentSample> {
        workload.validate()?;
        let WorkerWorkload {
            num_timesteps,
            max_timesteps_per_episode,
            use_exploration,
            break_on_terminal,
        } = workload;

        // Stays set until the call commits, so a failed call restarts the episode
        let mut needs_reset = self.last_terminal;
        self.last_terminal = true;

        let start = Instant::now();
        let mut trajectory = Trajectory::with_capacity(num_timesteps);
        let mut timesteps_executed = 0;
        let mut episodes_completed = 0;
        let mut env_frames = 0;

        let mut state = self.last_state.clone();
        let mut episode_reward = self.last_ep_reward;
        let mut episode_timestep = self.last_ep_timestep;
        let mut terminal = false;
        let mut episode_over = false;

        while num_timesteps == 0 || timesteps_executed < num_timesteps {
            if needs_reset || episode_over {
                state = self.environment.reset().await?;
                self.agent.reset();
                needs_reset = false;
                episode_reward = 0.0;
                episode_timestep = 0;
            }

            terminal = false;
            episode_over = false;
            loop {
                let ActionOutput {
                    action,
                    preprocessed_state,
                } = self.agent.get_action(&state, use_exploration).await?;

                let mut reward = 0.0;
                for _ in 0..self.frameskip {
                    let step = self.environment.step(&action).await?;
                    env_frames += 1;
                    reward += step.reward;
                    terminal = step.terminal;
                    state = step.next_state;
                    if terminal {
                        break;
                    }
                }

                trajectory.push_decision(preprocessed_state, action);
                trajectory.push_outcome(reward, terminal);
                episode_reward += reward;
                episode_timestep += 1;
                timesteps_executed += 1;

                let truncated = max_timesteps_per_episode > 0
                    && episode_timestep >= max_timesteps_per_episode;
                if terminal || truncated {
                    episode_over = true;
                    episodes_completed += 1;
                    self.episodes.record(episode_reward, episode_timestep);
                    debug!(
                        worker_id = %self.id,
                        episode_reward,
                        episode_timestep,
                        terminal,
                        "episode finished"
                    );
                    break;
                }
                if num_timesteps > 0 && timesteps_executed >= num_timesteps {
                    break;
                }
            }

            if terminal && break_on_terminal {
                break;
            }
        }

        let runtime = guarded_runtime(start.elapsed().as_secs_f64());
        self.last_terminal = episode_over;
        self.last_ep_reward = if episode_over { 0.0 } else { episode_reward };
        self.last_ep_timestep = if episode_over { 0 } else { episode_timestep };
        self.total_worker_steps += timesteps_executed;
        self.throughput.record(runtime, timesteps_executed, env_frames);

        let final_successor = if terminal {
            trajectory
                .states
                .last()
                .map_or_else(|| State::zeros(state.raw_dim()), |last| State::zeros(last.raw_dim()))
        } else {
            self.agent.preprocess_state(&state)?
        };
        self.last_state = state;

        let transitions = trajectory.into_transitions(final_successor);
        let (sample_batch, batch_size) = self
            .post_processor
            .process(transitions, self.agent.as_mut())
            .await?;

        #[allow(clippy::cast_precision_loss)]
        let metrics = SampleMetrics {
            runtime,
            timesteps_executed,
            ops_per_second: timesteps_executed as f64 / runtime,
            env_frames,
            frame_multiplier: self.env_frame_multiplier,
            episodes_completed,
        };
        debug!(
            worker_id = %self.id,
            timesteps_executed,
            episodes_completed,
            batch_size,
            runtime,
            "sampling call finished"
        );

        Ok(EnvironmentSample::new(sample_batch, batch_size, metrics, self.id.clone()))
    }

    /// Like `execute_and_get_timesteps`, also returning the batch size
    pub async fn execute_and_get_with_count(
        &mut self,
        workload: WorkerWorkload,
    ) -> Result<(EnvironmentSample, usize)> {
        let sample = self.execute_and_get_timesteps(workload).await?;
        let count = sample.batch_size();
        Ok((sample, count))
    }

    /// Replace the agent's policy parameters
    pub fn set_policy_weights(&mut self, weights: &PolicyWeights) -> Result<()> {
        self.agent.set_policy_weights(weights)?;
        debug!(
            worker_id = %self.id,
            parameters = weights.num_parameters(),
            "policy weights updated"
        );
        Ok(())
    }

    /// Current policy parameters
    #[must_use]
    pub fn policy_weights(&self) -> PolicyWeights {
        self.agent.policy_weights()
    }

    /// Episode and throughput statistics.
    ///
    /// Fails with `NoCompletedEpisodes` until an episode has finished.
    pub fn get_workload_statistics(&self) -> Result<WorkloadStatistics> {
        let (Some(min), Some(max), Some(mean), Some(last)) = (
            self.episodes.min_reward(),
            self.episodes.max_reward(),
            self.episodes.mean_reward(),
            self.episodes.latest_reward(),
        ) else {
            return Err(RolloutError::NoCompletedEpisodes);
        };

        Ok(WorkloadStatistics {
            worker_id: self.id.clone(),
            episode_timesteps: self.episodes.recent_timesteps(),
            episode_rewards: self.episodes.recent_rewards(),
            min_episode_reward: min,
            max_episode_reward: max,
            mean_episode_reward: mean,
            final_episode_reward: last,
            episodes_executed: self.episodes.count(),
            worker_steps: self.total_worker_steps,
            mean_worker_ops_per_second: self.throughput.ops_per_second(),
            mean_worker_env_frames_per_second: self
                .throughput
                .env_frames_per_second(self.env_frame_multiplier),
        })
    }

    /// Close the environment
    pub async fn close(&mut self) -> Result<()> {
        self.environment.close().await
    }
}

/// Replace a zero elapsed time so throughput stays finite
pub(crate) fn guarded_runtime(elapsed: f64) -> f64 {
    if elapsed > 0.0 {
        elapsed
    } else {
        RUNTIME_EPSILON
    }
}

/// Draw the initial epsilon uniformly from `[exploration_min_value, from)`
pub fn sample_exploration(config: &mut AgentConfig, spec: &WorkerSpec) -> Result<()> {
    if !spec.sample_exploration {
        return Ok(());
    }
    let exploration = config.exploration.as_mut().ok_or_else(|| {
        RolloutError::Config("sample_exploration needs an exploration_spec".to_string())
    })?;
    let Some(decay) = exploration.epsilon_spec.decay_spec.as_mut() else {
        return Ok(());
    };

    let min = spec.exploration_min_value;
    if decay.from < min {
        return Err(RolloutError::Config(format!(
            "epsilon decay starts at {} below exploration_min_value {min}",
            decay.from
        )));
    }
    if decay.from > min {
        decay.from = rand::thread_rng().gen_range(min..decay.from);
    }
    debug!(epsilon = decay.from, "sampled initial exploration");
    Ok(())
}
