//! Collect cart-pole experience with a pool of random agents.
//!
//! Run with `RUST_LOG=rollout_exec=debug` for per-call worker logs.

use anyhow::Result;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rollout_core::{AgentConfig, EnvSpec, WorkerSpec};
use rollout_exec::{AsyncExecutor, Executor, ExecutorConfig, SyncExecutor, WorkerBlueprint, Workload};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    rollout_env::register_builtin_envs();
    rollout_agent::register_builtin_agents();

    let blueprint = WorkerBlueprint::new(
        AgentConfig::new("random"),
        EnvSpec::new("cartpole").with_param("max_steps", json!(200)),
    )
    .with_worker_spec(WorkerSpec {
        n_step_adjustment: 3,
        ..WorkerSpec::default()
    })
    .with_frameskip(2);

    let config = ExecutorConfig::new(blueprint, 4).with_steps_per_task(64);

    let mut sync_executor = SyncExecutor::new(config.clone())?;
    sync_executor.setup_execution().await?;
    let summary = sync_executor.execute_workload(&Workload::timesteps(2_000)).await?;
    info!(
        samples = summary.samples.len(),
        transitions = summary.batch_size(),
        episodes = summary.episodes,
        timesteps_per_second = summary.timesteps_per_second,
        "synchronous collection finished"
    );
    let stats = sync_executor.aggregate_statistics().await?;
    info!(
        mean_reward = stats.mean_episode_reward,
        max_reward = stats.max_episode_reward,
        ops_per_second = stats.total_ops_per_second,
        "pool statistics"
    );
    sync_executor.shutdown().await;

    let mut async_executor = AsyncExecutor::new(config)?;
    async_executor.setup_execution().await?;
    let summary = async_executor.execute_workload(&Workload::episodes(20)).await?;
    info!(
        samples = summary.samples.len(),
        episodes = summary.episodes,
        env_frames_per_second = summary.env_frames_per_second,
        "asynchronous collection finished"
    );
    async_executor.shutdown().await;

    Ok(())
}
