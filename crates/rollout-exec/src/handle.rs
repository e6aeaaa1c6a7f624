//! Remote worker handles backed by a tokio task and a mailbox

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use rollout_core::{EnvironmentSample, PolicyWeights, Result, RolloutError, WorkerWorkload};

use crate::stats::WorkloadStatistics;
use crate::worker::RolloutWorker;

/// Commands queued in a worker's mailbox
enum WorkerCommand {
    Execute {
        workload: WorkerWorkload,
        reply: oneshot::Sender<Result<EnvironmentSample>>,
    },
    SetPolicyWeights {
        weights: Arc<PolicyWeights>,
        reply: oneshot::Sender<Result<()>>,
    },
    GetPolicyWeights {
        reply: oneshot::Sender<PolicyWeights>,
    },
    GetStatistics {
        reply: oneshot::Sender<Result<WorkloadStatistics>>,
    },
    Ping {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable address of a worker running on its own task.
///
/// Requests are processed one at a time in arrival order. Once the task
/// is gone every request fails with `WorkerUnavailable`.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    id: Arc<str>,
    index: usize,
    sender: mpsc::Sender<WorkerCommand>,
}

impl std::fmt::Debug for WorkerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Execute { .. } => "Execute",
            Self::SetPolicyWeights { .. } => "SetPolicyWeights",
            Self::GetPolicyWeights { .. } => "GetPolicyWeights",
            Self::GetStatistics { .. } => "GetStatistics",
            Self::Ping { .. } => "Ping",
        };
        f.write_str(name)
    }
}

/// Move `worker` onto its own task and return its handle
pub fn spawn_worker(
    worker: RolloutWorker,
    index: usize,
    mailbox_capacity: usize,
) -> (WorkerHandle, JoinHandle<()>) {
    let (sender, receiver) = mpsc::channel(mailbox_capacity.max(1));
    let handle = WorkerHandle {
        id: Arc::from(worker.id()),
        index,
        sender,
    };
    let task = tokio::spawn(run_worker(worker, receiver));
    (handle, task)
}

async fn run_worker(mut worker: RolloutWorker, mut receiver: mpsc::Receiver<WorkerCommand>) {
    while let Some(command) = receiver.recv().await {
        debug!(worker_id = %worker.id(), ?command, "worker command");
        match command {
            WorkerCommand::Execute { workload, reply } => {
                let result = worker.execute_and_get_timesteps(workload).await;
                if let Err(err) = &result {
                    warn!(worker_id = %worker.id(), %err, "sampling call failed");
                }
                let _ = reply.send(result);
            }
            WorkerCommand::SetPolicyWeights { weights, reply } => {
                let _ = reply.send(worker.set_policy_weights(&weights));
            }
            WorkerCommand::GetPolicyWeights { reply } => {
                let _ = reply.send(worker.policy_weights());
            }
            WorkerCommand::GetStatistics { reply } => {
                let _ = reply.send(worker.get_workload_statistics());
            }
            WorkerCommand::Ping { reply } => {
                let _ = reply.send(());
            }
        }
    }

    if let Err(err) = worker.close().await {
        warn!(worker_id = %worker.id(), %err, "failed to close environment");
    }
    info!(
        worker_id = %worker.id(),
        steps = worker.total_worker_steps(),
        episodes = worker.episodes_executed(),
        "worker stopped"
    );
}

impl WorkerHandle {
    /// Id of the worker behind this handle
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Position of the worker in its pool
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    fn unavailable(&self) -> RolloutError {
        RolloutError::WorkerUnavailable(self.id.to_string())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> WorkerCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(command(reply))
            .await
            .map_err(|_| self.unavailable())?;
        response.await.map_err(|_| self.unavailable())
    }

    /// Run one sampling call on the worker
    pub async fn execute_and_get_timesteps(
        &self,
        workload: WorkerWorkload,
    ) -> Result<EnvironmentSample> {
        self.request(|reply| WorkerCommand::Execute { workload, reply })
            .await?
    }

    /// Run one sampling call, also returning the batch size
    pub async fn execute_and_get_with_count(
        &self,
        workload: WorkerWorkload,
    ) -> Result<(EnvironmentSample, usize)> {
        let sample = self.execute_and_get_timesteps(workload).await?;
        let count = sample.batch_size();
        Ok((sample, count))
    }

    /// Replace the worker's policy parameters
    pub async fn set_policy_weights(&self, weights: Arc<PolicyWeights>) -> Result<()> {
        self.request(|reply| WorkerCommand::SetPolicyWeights { weights, reply })
            .await?
    }

    /// Fetch the worker's policy parameters
    pub async fn get_policy_weights(&self) -> Result<PolicyWeights> {
        self.request(|reply| WorkerCommand::GetPolicyWeights { reply })
            .await
    }

    /// Fetch the worker's episode and throughput statistics
    pub async fn get_workload_statistics(&self) -> Result<WorkloadStatistics> {
        self.request(|reply| WorkerCommand::GetStatistics { reply })
            .await?
    }

    /// Whether the worker was built and its task still answers
    pub async fn get_constructor_success(&self) -> bool {
        self.request(|reply| WorkerCommand::Ping { reply })
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingAgent, ScriptedEnv};
    use ndarray::arr1;
    use rollout_core::WorkerSpec;

    async fn spawned() -> (WorkerHandle, JoinHandle<()>) {
        let worker = RolloutWorker::from_parts(
            Box::new(ScriptedEnv::constant(1.0).with_episode_length(2)),
            Box::new(RecordingAgent::default()),
            &WorkerSpec::default(),
            0.99,
            1,
        )
        .await
        .unwrap();
        spawn_worker(worker, 0, 4)
    }

    #[tokio::test]
    async fn test_requests_reach_worker() {
        let (handle, _task) = spawned().await;

        let (sample, count) = handle
            .execute_and_get_with_count(WorkerWorkload::timesteps(4))
            .await
            .unwrap();
        let stats = handle.get_workload_statistics().await.unwrap();

        assert_eq!(count, 4);
        assert_eq!(sample.worker_id(), handle.id());
        assert_eq!(stats.episodes_executed, 2);
        assert!(handle.get_constructor_success().await);
    }

    #[tokio::test]
    async fn test_weights_round_trip_through_mailbox() {
        let (handle, _task) = spawned().await;
        let weights = PolicyWeights::new().with("w", arr1(&[1.0f32, -1.0]).into_dyn());

        handle.set_policy_weights(Arc::new(weights.clone())).await.unwrap();

        assert_eq!(handle.get_policy_weights().await.unwrap(), weights);
    }

    #[tokio::test]
    async fn test_dead_worker_is_unavailable() {
        let (handle, task) = spawned().await;
        task.abort();
        let _ = task.await;

        let err = handle.get_policy_weights().await.unwrap_err();

        assert!(matches!(err, RolloutError::WorkerUnavailable(ref id) if id == handle.id()));
        assert!(!handle.get_constructor_success().await);
    }

    #[tokio::test]
    async fn test_clones_share_one_worker() {
        let (handle, _task) = spawned().await;
        let other = handle.clone();

        handle
            .execute_and_get_timesteps(WorkerWorkload::timesteps(3))
            .await
            .unwrap();
        other
            .execute_and_get_timesteps(WorkerWorkload::timesteps(1))
            .await
            .unwrap();

        let stats = other.get_workload_statistics().await.unwrap();
        assert_eq!(stats.worker_steps, 4);
        assert_eq!(stats.episodes_executed, 2);
    }
}
