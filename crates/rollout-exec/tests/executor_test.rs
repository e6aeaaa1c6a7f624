//! Worker pools and executors built from registered types

use approx::assert_relative_eq;
use ndarray::arr1;
use serde_json::json;

use rollout_core::{
    decompress, AgentConfig, EnvSpec, PolicyWeights, RolloutError, WorkerSpec, WorkerWorkload,
};
use rollout_exec::{
    AsyncExecutor, Executor, ExecutorConfig, SyncExecutor, WorkerBlueprint, WorkerPool, Workload,
};

fn register() {
    rollout_env::register_builtin_envs();
    rollout_agent::register_builtin_agents();
}

fn chain_blueprint(length: usize) -> WorkerBlueprint {
    WorkerBlueprint::new(
        AgentConfig::new("random"),
        EnvSpec::new("chain").with_param("length", json!(length)),
    )
}

#[tokio::test]
async fn test_worker_from_registry_runs_one_episode() {
    register();
    let mut worker = chain_blueprint(3).build().await.unwrap();

    let sample = worker
        .execute_and_get_timesteps(WorkerWorkload::until_terminal())
        .await
        .unwrap();

    let batch = sample.sample_batch();
    assert_eq!(sample.batch_size(), 3);
    assert_eq!(batch.terminals, vec![false, false, true]);
    assert_eq!(decompress(&batch.states[2]).unwrap(), arr1(&[2.0f32]).into_dyn());
    assert!(batch.actions.iter().all(|a| matches!(a.as_discrete(), Some(0 | 1))));
    assert_eq!(worker.get_workload_statistics().unwrap().episodes_executed, 1);
}

#[tokio::test]
async fn test_frameskip_repeats_actions() {
    register();
    let mut worker = chain_blueprint(6).with_frameskip(2).build().await.unwrap();

    let sample = worker
        .execute_and_get_timesteps(WorkerWorkload::until_terminal())
        .await
        .unwrap();

    assert_eq!(sample.sample_batch().rewards, vec![2.0, 2.0, 2.0]);
    assert_eq!(sample.metrics().env_frames, 6);
}

#[tokio::test]
async fn test_unknown_environment_fails_construction() {
    register();
    let blueprint = WorkerBlueprint::new(AgentConfig::new("random"), EnvSpec::new("no-such-env"));

    let err = blueprint.build().await.err().unwrap();

    assert!(matches!(err, RolloutError::UnknownType { kind: "environment", .. }));
}

#[tokio::test]
async fn test_bad_worker_spec_fails_pool_creation() {
    register();
    let blueprint = chain_blueprint(3).with_worker_spec(WorkerSpec {
        n_step_adjustment: 0,
        ..WorkerSpec::default()
    });

    let result = WorkerPool::create_remote_workers(&blueprint, 2).await;

    assert!(matches!(result.err(), Some(RolloutError::Config(_))));
}

#[tokio::test]
async fn test_sync_executor_runs_full_rounds() {
    register();
    let config = ExecutorConfig::new(chain_blueprint(4), 3).with_steps_per_task(5);
    let mut executor = SyncExecutor::new(config).unwrap();
    executor.setup_execution().await.unwrap();

    let summary = executor.execute_workload(&Workload::timesteps(40)).await.unwrap();

    // Three rounds of 3 x 5 timesteps
    assert_eq!(summary.samples.len(), 9);
    assert_eq!(summary.timesteps, 45);
    assert_eq!(summary.env_frames, 45);
    assert!(summary.timesteps_per_second > 0.0);

    let stats = executor.aggregate_statistics().await.unwrap();
    assert_eq!(stats.num_workers, 3);
    assert_eq!(stats.worker_steps, 45);
    assert_relative_eq!(stats.mean_episode_reward, 4.0);
    executor.shutdown().await;
}

#[tokio::test]
async fn test_sync_executor_orders_samples_by_worker() {
    register();
    let config = ExecutorConfig::new(chain_blueprint(10), 4).with_steps_per_task(2);
    let mut executor = SyncExecutor::new(config).unwrap();
    executor.setup_execution().await.unwrap();
    let ids: Vec<String> = executor
        .pool()
        .unwrap()
        .handles()
        .iter()
        .map(|handle| handle.id().to_string())
        .collect();

    let summary = executor.execute_workload(&Workload::timesteps(8)).await.unwrap();

    let sample_ids: Vec<String> = summary
        .samples
        .iter()
        .map(|sample| sample.worker_id().to_string())
        .collect();
    assert_eq!(sample_ids, ids);
    executor.shutdown().await;
}

#[tokio::test]
async fn test_async_executor_hits_timestep_target_exactly() {
    register();
    let config = ExecutorConfig::new(chain_blueprint(0), 2).with_steps_per_task(5);
    let mut executor = AsyncExecutor::new(config).unwrap();
    executor.setup_execution().await.unwrap();

    let summary = executor.execute_workload(&Workload::timesteps(20)).await.unwrap();

    assert_eq!(summary.timesteps, 20);
    assert_eq!(summary.samples.len(), 4);
    assert_eq!(summary.episodes, 0);
    assert_eq!(summary.batch_size(), 20);
    executor.shutdown().await;
}

#[tokio::test]
async fn test_async_executor_counts_episodes() {
    register();
    let config = ExecutorConfig::new(chain_blueprint(4), 3).with_steps_per_task(4);
    let mut executor = AsyncExecutor::new(config).unwrap();
    executor.setup_execution().await.unwrap();

    let summary = executor.execute_workload(&Workload::episodes(6)).await.unwrap();

    // Every task of 4 steps finishes exactly one 4-step episode
    assert!(summary.episodes >= 6);
    assert_eq!(summary.episodes, summary.samples.len());
    assert_eq!(summary.timesteps, 4 * summary.samples.len());
    executor.shutdown().await;
}

#[tokio::test]
async fn test_truncation_counts_as_episode_end() {
    register();
    let config = ExecutorConfig::new(chain_blueprint(0), 1).with_steps_per_task(6);
    let mut executor = SyncExecutor::new(config).unwrap();
    executor.setup_execution().await.unwrap();

    let summary = executor
        .execute_workload(&Workload::episodes(3).with_max_timesteps_per_episode(2))
        .await
        .unwrap();

    assert_eq!(summary.episodes, 3);
    assert!(summary.samples[0].sample_batch().terminals.iter().all(|t| !t));
    executor.shutdown().await;
}

#[tokio::test]
async fn test_dispatch_before_setup_is_rejected() {
    let mut executor = SyncExecutor::new(ExecutorConfig::new(chain_blueprint(3), 1)).unwrap();

    let err = executor.execute_workload(&Workload::timesteps(1)).await.unwrap_err();

    assert!(matches!(err, RolloutError::Config(_)));
}

#[tokio::test]
async fn test_weights_broadcast_through_executor() {
    register();
    let mut executor = AsyncExecutor::new(ExecutorConfig::new(chain_blueprint(3), 3)).unwrap();
    executor.setup_execution().await.unwrap();
    assert_eq!(executor.config().num_workers, 3);
    let weights = PolicyWeights::new()
        .with("policy/kernel", arr1(&[0.5f32, -0.5, 1.5]).into_dyn())
        .with("policy/bias", arr1(&[0.0f32]).into_dyn());

    executor.broadcast_policy_weights(weights.clone()).await.unwrap();

    for handle in executor.pool().unwrap().handles() {
        assert_eq!(handle.get_policy_weights().await.unwrap(), weights);
    }
    executor.shutdown().await;
}

#[tokio::test]
async fn test_config_file_drives_executor() {
    register();
    let path = std::env::temp_dir().join(format!("rollout-exec-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(
        &path,
        r#"{
            "num_workers": 2,
            "steps_per_task": 3,
            "agent_config": {"type": "random", "seed": 11},
            "env_spec": {"type": "chain", "length": 3},
            "worker_spec": {"worker_computes_weights": false}
        }"#,
    )
    .unwrap();

    let config = ExecutorConfig::from_file(&path).await.unwrap();
    std::fs::remove_file(&path).unwrap();
    let mut executor = SyncExecutor::new(config).unwrap();
    executor.setup_execution().await.unwrap();

    let summary = executor.execute_workload(&Workload::episodes(2)).await.unwrap();

    assert_eq!(summary.episodes, 2);
    for sample in &summary.samples {
        assert_eq!(sample.sample_batch().importance_weights, vec![1.0; 3]);
    }
    executor.shutdown().await;
}
