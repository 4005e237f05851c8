//! Asynchronous driver: the optimizer runs on a Tokio task and talks to the
//! evaluator over channels.
//!
//! The evaluator reads [`Task`]s from `tasks`. `Evaluate` tasks must be
//! answered on `results`; `MajorIteration` and `Done` notices are
//! informational. Exactly one `Done` is sent, after which the task channel
//! closes once late answers have been drained. Dropping `results` cancels
//! the run.

use cholcma_protocol::Task;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::budget::{Budget, Outcome};
use crate::error::CmaError;
use crate::method::CmaEsCholB;
use crate::session::Session;

pub struct TaskStream {
    pub tasks: mpsc::UnboundedReceiver<Task>,
    pub results: mpsc::UnboundedSender<Task>,
    /// Evaluations that may be in flight at once.
    pub concurrency: usize,
}

/// Validate and start a run on the current Tokio runtime.
pub fn spawn(
    mut method: CmaEsCholB,
    x0: Vec<f64>,
    tasks: usize,
    budget: Budget,
) -> Result<(TaskStream, JoinHandle<Result<Outcome, CmaError>>), CmaError> {
    let concurrency = method.init(x0.len(), tasks)?;
    let first = method.start(&x0)?;
    let (task_tx, task_rx) = mpsc::unbounded_channel();
    let (result_tx, result_rx) = mpsc::unbounded_channel();
    let session = Session::new(budget, &x0);
    let handle = tokio::spawn(drive(method, session, first, task_tx, result_rx));
    Ok((
        TaskStream {
            tasks: task_rx,
            results: result_tx,
            concurrency,
        },
        handle,
    ))
}

async fn drive(
    mut method: CmaEsCholB,
    mut session: Session,
    first: Vec<Task>,
    out: mpsc::UnboundedSender<Task>,
    mut inbox: mpsc::UnboundedReceiver<Task>,
) -> Result<Outcome, CmaError> {
    // The evaluator may already be gone; the run then ends as cancelled.
    let emit = |task: Task| {
        let _ = out.send(task);
    };
    let mut outstanding = first.len();
    first.into_iter().for_each(emit);

    let mut failure = None;
    while outstanding > 0 {
        let Some(result) = inbox.recv().await else {
            tracing::debug!(outstanding, "result channel closed");
            break;
        };
        match session.absorb(&mut method, result) {
            Ok(absorbed) => {
                outstanding -= 1;
                outstanding += absorbed.tasks.len();
                absorbed.notice.into_iter().for_each(emit);
                absorbed.tasks.into_iter().for_each(emit);
            }
            Err(e) => {
                tracing::warn!(error = %e, "rejected result, stopping run");
                failure = Some(e);
                break;
            }
        }
    }

    if failure.is_some() {
        session.stop(&mut method, crate::budget::Termination::Cancelled)?;
        while outstanding > 0 {
            let Some(result) = inbox.recv().await else {
                break;
            };
            if session.absorb(&mut method, result).is_ok() {
                outstanding -= 1;
            }
        }
    }

    session.close(&mut method)?.into_iter().for_each(emit);
    drop(out);
    match failure {
        Some(e) => Err(e),
        None => Ok(session.outcome(&method)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::Termination;
    use crate::settings::Settings;
    use cholcma_protocol::TaskKind;

    fn sphere(x: &[f64]) -> f64 {
        x.iter().map(|v| v * v).sum()
    }

    #[tokio::test]
    async fn test_stream_runs_to_budget() {
        let cma = CmaEsCholB::new(Settings::default().with_seed(21));
        let budget = Budget::default().with_max_generations(5);
        let (mut stream, handle) = spawn(cma, vec![2.0, 2.0], 3, budget).unwrap();
        assert_eq!(stream.concurrency, 3);

        let mut majors = 0;
        let mut dones = 0;
        while let Some(task) = stream.tasks.recv().await {
            match task.kind {
                TaskKind::Evaluate => {
                    let f = sphere(&task.x);
                    stream.results.send(task.answered(f)).unwrap();
                }
                TaskKind::MajorIteration => majors += 1,
                TaskKind::Done => dones += 1,
            }
        }
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.termination, Termination::GenerationLimit);
        assert_eq!(majors, 5);
        assert_eq!(dones, 1);
        assert_eq!(outcome.generations, 5);
    }

    #[tokio::test]
    async fn test_answers_out_of_order() {
        let cma = CmaEsCholB::new(Settings::default().with_seed(22).with_population(6));
        let budget = Budget::default().with_max_generations(3);
        let (mut stream, handle) = spawn(cma, vec![1.0], 6, budget).unwrap();

        let mut held = Vec::new();
        while let Some(task) = stream.tasks.recv().await {
            if task.kind != TaskKind::Evaluate {
                continue;
            }
            held.push(task);
            // Answer whole batches in reverse.
            if held.len() == 6 {
                for t in held.drain(..).rev() {
                    let f = sphere(&t.x);
                    stream.results.send(t.answered(f)).unwrap();
                }
            }
        }
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.generations, 3);
    }

    #[tokio::test]
    async fn test_protocol_error_is_reported() {
        let cma = CmaEsCholB::new(Settings::default().with_seed(23));
        let (mut stream, handle) = spawn(cma, vec![1.0], 1, Budget::default()).unwrap();
        let first = stream.tasks.recv().await.unwrap();
        let mut bogus = first.clone();
        bogus.id = 1_000;
        stream.results.send(bogus.answered(1.0)).unwrap();
        stream.results.send(first.answered(1.0)).unwrap();
        let mut saw_done = false;
        while let Some(task) = stream.tasks.recv().await {
            saw_done |= task.is_done();
        }
        assert!(saw_done);
        assert!(matches!(handle.await.unwrap(), Err(CmaError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_dropping_results_cancels() {
        let cma = CmaEsCholB::new(Settings::default().with_seed(24));
        let (stream, handle) = spawn(cma, vec![1.0, 1.0], 2, Budget::default()).unwrap();
        drop(stream.results);
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.termination, Termination::Cancelled);
        assert_eq!(outcome.evaluations, 0);
    }
}
