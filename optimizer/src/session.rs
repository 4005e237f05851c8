//! Reply bookkeeping for drivers: budget checks, stop on exhaustion, and
//! the notices owed at close.
//!
//! Used by [`crate::local`], [`crate::stream`] and any external driver that
//! shuttles tasks itself.

use cholcma_protocol::{RunStatus, Task, TaskKind};

use crate::budget::{Budget, Outcome, Termination};
use crate::error::CmaError;
use crate::machine::Phase;
use crate::method::{CmaEsCholB, Reply};

/// What a driver should do with one reply.
#[derive(Debug, Default)]
pub struct Absorbed {
    /// New work to hand out.
    pub tasks: Vec<Task>,
    /// Generation or terminal notice to report.
    pub notice: Option<Task>,
}

/// Per-run driver state around a [`CmaEsCholB`].
pub struct Session {
    budget: Budget,
    evaluations: u64,
    last: Task,
    termination: Option<Termination>,
    done_emitted: bool,
}

impl Session {
    pub fn new(budget: Budget, x0: &[f64]) -> Self {
        Self {
            budget,
            evaluations: 0,
            last: Task::notice(TaskKind::MajorIteration, 0, x0.to_vec(), f64::INFINITY),
            termination: None,
            done_emitted: false,
        }
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Submit one answer and work out the follow-up.
    pub fn absorb(&mut self, method: &mut CmaEsCholB, result: Task) -> Result<Absorbed, CmaError> {
        let reply = match method.submit(result) {
            Ok(reply) => reply,
            Err(e) => {
                if matches!(method.status(), RunStatus::Failed { .. }) {
                    self.termination.get_or_insert(Termination::Failed);
                }
                return Err(e);
            }
        };
        self.evaluations += 1;
        let mut out = Absorbed::default();
        match reply {
            Reply::Dispatch(task) => out.tasks.push(task),
            Reply::Wait | Reply::Folded => {}
            Reply::Generation(notice) => {
                match self.budget.after_generation(method.generations(), notice.f) {
                    Some(reason) => self.stop(method, reason)?,
                    None => out.tasks = method.next_batch()?,
                }
                self.last = notice.clone();
                out.notice = Some(notice);
            }
            Reply::Done(notice) => {
                self.termination = Termination::from_status(method.status());
                self.done_emitted = true;
                self.last = notice.clone();
                out.notice = Some(notice);
            }
        }
        if self.termination.is_none() {
            if let Some(reason) = self.budget.after_evaluation(self.evaluations) {
                self.stop(method, reason)?;
            }
        }
        Ok(out)
    }

    /// Stop the method for `reason` unless it is already winding down.
    pub fn stop(&mut self, method: &mut CmaEsCholB, reason: Termination) -> Result<(), CmaError> {
        self.termination.get_or_insert(reason);
        if method.phase() != Phase::Draining {
            tracing::debug!(?reason, generation = method.generations(), "stopping run");
            method.stop()?;
        }
        Ok(())
    }

    /// Close the method. Returns the notices still owed to the caller: a
    /// late improvement, then a terminal notice if none was sent yet.
    pub fn close(&mut self, method: &mut CmaEsCholB) -> Result<Vec<Task>, CmaError> {
        if method.phase() != Phase::Draining {
            self.stop(method, Termination::Cancelled)?;
        }
        let mut notices = Vec::new();
        if let Some(improved) = method.close()? {
            self.last = improved.clone();
            notices.push(improved);
        }
        if !self.done_emitted {
            self.done_emitted = true;
            notices.push(Task::notice(
                TaskKind::Done,
                method.generations(),
                self.last.x.clone(),
                self.last.f,
            ));
        }
        Ok(notices)
    }

    pub fn outcome(&self, method: &CmaEsCholB) -> Outcome {
        Outcome {
            x: self.last.x.clone(),
            f: self.last.f,
            termination: self.termination.unwrap_or(Termination::Cancelled),
            status: method.status().clone(),
            generations: method.generations(),
            evaluations: self.evaluations,
        }
    }
}
