//! Run engines and the task queue shared by all workers.
//!
//! Each run owns a [`CmaEsCholB`] and a [`Session`]. Tasks it dispatches go
//! onto one FIFO queue; workers lease them one at a time. Results are fed
//! straight back into the owning engine, and whatever that produces (new
//! tasks, a generation notice, the end of the run) is reported to the
//! caller as [`RunEvent`]s so the HTTP layer can update summaries and
//! history without holding the scheduler lock.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use cholcma::{Budget, CmaError, CmaEsCholB, Outcome, Phase, Session, Settings, Termination};
use cholcma_protocol::{Task, TaskAssignment, TaskId, TaskKind};

struct Engine {
    method: CmaEsCholB,
    session: Session,
    objective: String,
    /// Dispatched and not yet answered, whether queued or leased
    outstanding: HashSet<TaskId>,
}

struct Lease {
    worker_id: String,
    task: Task,
    leased_at: Instant,
}

#[derive(Debug)]
pub enum RunEvent {
    Generation {
        run_id: String,
        notice: Task,
        evaluations: u64,
    },
    Finished {
        run_id: String,
        outcome: Outcome,
    },
}

#[derive(Debug)]
pub enum SchedulerError {
    UnknownRun,
    /// Already answered, or withdrawn when the run stopped.
    NotOutstanding(TaskId),
    /// The engine refused the answer and the run is winding down.
    /// `events` still has to be applied.
    Rejected {
        error: CmaError,
        events: Vec<RunEvent>,
    },
}

impl From<CmaError> for SchedulerError {
    fn from(error: CmaError) -> Self {
        SchedulerError::Rejected {
            error,
            events: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct Scheduler {
    engines: HashMap<String, Engine>,
    queue: VecDeque<(String, Task)>,
    leases: HashMap<(String, TaskId), Lease>,
}

impl Scheduler {
    /// Create and start a run. Returns `(population, concurrency)`.
    pub fn create_run(
        &mut self,
        run_id: &str,
        objective: &str,
        x0: &[f64],
        settings: Settings,
        budget: Budget,
        concurrency: usize,
    ) -> Result<(usize, usize), CmaError> {
        let mut method = CmaEsCholB::new(settings);
        let concurrency = method.init(x0.len(), concurrency)?;
        let tasks = method.start(x0)?;
        let population = method.population().unwrap_or(0);
        let mut engine = Engine {
            method,
            session: Session::new(budget, x0),
            objective: objective.to_string(),
            outstanding: HashSet::new(),
        };
        self.enqueue(run_id, &mut engine, tasks);
        self.engines.insert(run_id.to_string(), engine);
        Ok((population, concurrency))
    }

    fn enqueue(&mut self, run_id: &str, engine: &mut Engine, tasks: Vec<Task>) {
        engine.outstanding.extend(tasks.iter().map(|t| t.id));
        self.queue
            .extend(tasks.into_iter().map(|t| (run_id.to_string(), t)));
    }

    /// Lease the oldest queued task to `worker_id`.
    pub fn next_task(&mut self, worker_id: &str) -> Option<TaskAssignment> {
        while let Some((run_id, task)) = self.queue.pop_front() {
            let Some(engine) = self.engines.get(&run_id) else {
                continue;
            };
            let assignment = TaskAssignment {
                run_id: run_id.clone(),
                objective: engine.objective.clone(),
                task: task.clone(),
            };
            self.leases.insert(
                (run_id, task.id),
                Lease {
                    worker_id: worker_id.to_string(),
                    task,
                    leased_at: Instant::now(),
                },
            );
            return Some(assignment);
        }
        None
    }

    /// Feed one answer back to its run.
    ///
    /// Only the first answer to an outstanding task reaches the engine.
    /// Later copies (a requeued lease answered twice) are refused here,
    /// and the lease and queue entries they left behind are dropped.
    pub fn submit_result(&mut self, run_id: &str, task: Task) -> Result<Vec<RunEvent>, SchedulerError> {
        let mut engine = self
            .engines
            .remove(run_id)
            .ok_or(SchedulerError::UnknownRun)?;
        let id = task.id;
        if !engine.outstanding.contains(&id) {
            self.withdraw(run_id, id);
            self.engines.insert(run_id.to_string(), engine);
            return Err(SchedulerError::NotOutstanding(id));
        }

        let absorbed = match engine.session.absorb(&mut engine.method, task) {
            Ok(a) => a,
            Err(error) => {
                let mut events = Vec::new();
                self.settle(run_id, engine, &mut events)?;
                return Err(SchedulerError::Rejected { error, events });
            }
        };
        engine.outstanding.remove(&id);
        self.withdraw(run_id, id);

        let mut events = Vec::new();
        if let Some(notice) = absorbed.notice {
            events.push(RunEvent::Generation {
                run_id: run_id.to_string(),
                notice,
                evaluations: engine.session.evaluations(),
            });
        }
        self.enqueue(run_id, &mut engine, absorbed.tasks);
        self.settle(run_id, engine, &mut events)?;
        Ok(events)
    }

    /// Forget every lease and queued copy of one task.
    fn withdraw(&mut self, run_id: &str, id: TaskId) {
        self.leases.remove(&(run_id.to_string(), id));
        self.queue.retain(|(r, t)| !(r == run_id && t.id == id));
    }

    /// Stop a run early. Queued tasks are withdrawn; leased ones may still
    /// be answered.
    pub fn stop_run(&mut self, run_id: &str) -> Result<Vec<RunEvent>, SchedulerError> {
        let mut engine = self
            .engines
            .remove(run_id)
            .ok_or(SchedulerError::UnknownRun)?;
        if let Err(e) = engine.session.stop(&mut engine.method, Termination::Cancelled) {
            self.engines.insert(run_id.to_string(), engine);
            return Err(e.into());
        }
        let mut withdrawn = 0;
        self.queue.retain(|(r, t)| {
            if r != run_id {
                return true;
            }
            engine.outstanding.remove(&t.id);
            withdrawn += 1;
            false
        });
        tracing::info!(run_id = %run_id, withdrawn, "run stop requested");

        let mut events = Vec::new();
        self.settle(run_id, engine, &mut events)?;
        Ok(events)
    }

    /// Close the run once it is draining with nothing outstanding, otherwise
    /// put it back.
    fn settle(&mut self, run_id: &str, mut engine: Engine, events: &mut Vec<RunEvent>) -> Result<(), SchedulerError> {
        if engine.method.phase() != Phase::Draining || !engine.outstanding.is_empty() {
            self.engines.insert(run_id.to_string(), engine);
            return Ok(());
        }
        for notice in engine.session.close(&mut engine.method)? {
            if notice.kind == TaskKind::MajorIteration {
                events.push(RunEvent::Generation {
                    run_id: run_id.to_string(),
                    notice,
                    evaluations: engine.session.evaluations(),
                });
            }
        }
        self.leases.retain(|(r, _), _| r != run_id);
        self.queue.retain(|(r, _)| r != run_id);
        events.push(RunEvent::Finished {
            run_id: run_id.to_string(),
            outcome: engine.session.outcome(&engine.method),
        });
        Ok(())
    }

    /// Put leases older than `timeout` back at the front of the queue.
    /// Returns the workers whose leases were reclaimed.
    pub fn requeue_stale(&mut self, timeout: Duration) -> Vec<String> {
        let stale: Vec<(String, TaskId)> = self
            .leases
            .iter()
            .filter(|(_, l)| l.leased_at.elapsed() >= timeout)
            .map(|(k, _)| k.clone())
            .collect();
        let mut workers = Vec::new();
        for key in stale {
            if let Some(lease) = self.leases.remove(&key) {
                tracing::warn!(run_id = %key.0, task_id = key.1, worker_id = %lease.worker_id, "lease expired, requeueing");
                workers.push(lease.worker_id);
                self.queue.push_front((key.0, lease.task));
            }
        }
        workers
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn leased(&self) -> usize {
        self.leases.len()
    }

    pub fn active_runs(&self) -> usize {
        self.engines.len()
    }

    pub fn is_active(&self, run_id: &str) -> bool {
        self.engines.contains_key(run_id)
    }
}
