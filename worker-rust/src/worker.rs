use std::time::Duration;

use anyhow::{Context, Result};
use cholcma_protocol::{ResultSubmission, TaskAssignment, TaskKind};
use tokio::sync::watch;

use crate::client::ServerClient;
use crate::objectives;

/// Evaluate one assignment on a blocking thread and build the answer.
pub async fn execute_task(worker_id: &str, assignment: TaskAssignment) -> Result<ResultSubmission> {
    let TaskAssignment {
        run_id,
        objective,
        task,
    } = assignment;
    if task.kind != TaskKind::Evaluate {
        anyhow::bail!("Task {} is not an evaluation ({:?})", task.id, task.kind);
    }
    let x = task.x.clone();
    let f = tokio::task::spawn_blocking(move || objectives::evaluate(&objective, &x))
        .await
        .context("Evaluation thread panicked")?;
    Ok(ResultSubmission {
        run_id,
        worker_id: worker_id.to_string(),
        task: task.answered(f),
    })
}

/// One polling loop: fetch, evaluate, submit, repeat until shutdown.
/// Waits `poll_interval` only when the server had nothing to hand out.
pub async fn run_slot(
    client: ServerClient,
    worker_id: String,
    slot: usize,
    poll_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    tracing::debug!(slot, "Evaluation loop started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let idle = match client.fetch_task(&worker_id).await {
            Ok(Some(assignment)) => {
                let task_id = assignment.task.id;
                let run_id = assignment.run_id.clone();
                match execute_task(&worker_id, assignment).await {
                    Ok(submission) => {
                        tracing::debug!(slot, run_id = %run_id, task_id, f = submission.task.f, "Evaluated");
                        if let Err(e) = client.submit_result(&submission).await {
                            tracing::warn!(slot, run_id = %run_id, task_id, "{e:#}");
                        }
                    }
                    Err(e) => tracing::error!(slot, run_id = %run_id, task_id, "{e:#}"),
                }
                false
            }
            Ok(None) => true,
            Err(e) => {
                tracing::warn!(slot, "Failed to fetch task: {e:#}");
                true
            }
        };

        if idle {
            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                _ = shutdown_rx.changed() => {}
            }
        }
    }
    tracing::debug!(slot, "Evaluation loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use cholcma_protocol::Task;

    #[tokio::test]
    async fn test_execute_task_answers_with_value() {
        let assignment = TaskAssignment {
            run_id: "r1".into(),
            objective: "sphere".into(),
            task: Task::evaluate(41, vec![1.0, 2.0]),
        };
        let sub = execute_task("w1", assignment).await.unwrap();
        assert_eq!(sub.run_id, "r1");
        assert_eq!(sub.worker_id, "w1");
        assert_eq!(sub.task.id, 41);
        assert_eq!(sub.task.kind, TaskKind::Evaluate);
        assert_eq!(sub.task.x, vec![1.0, 2.0]);
        assert_eq!(sub.task.f, 5.0);
    }

    #[tokio::test]
    async fn test_unknown_objective_still_answers() {
        let assignment = TaskAssignment {
            run_id: "r1".into(),
            objective: "mystery".into(),
            task: Task::evaluate(3, vec![0.5]),
        };
        let sub = execute_task("w1", assignment).await.unwrap();
        assert_eq!(sub.task.id, 3);
        assert!(sub.task.f.is_nan());
    }

    #[tokio::test]
    async fn test_notices_are_rejected() {
        let assignment = TaskAssignment {
            run_id: "r1".into(),
            objective: "sphere".into(),
            task: Task::notice(TaskKind::Done, 9, vec![0.0], 0.0),
        };
        assert!(execute_task("w1", assignment).await.is_err());
    }
}
