//! The optimizer as a cooperative task protocol.
//!
//! The caller owns evaluation. [`CmaEsCholB::start`] hands out the first
//! batch of `Evaluate` tasks; every answer goes back through
//! [`CmaEsCholB::submit`], which either dispatches the next sample, asks the
//! caller to wait, or closes the generation and reports it. Answers may
//! arrive in any order.

use cholcma_protocol::{RunStatus, Task, TaskKind};
use rand::RngCore;

use crate::best::best_index;
use crate::convergence::StopThreshold;
use crate::error::{CmaError, ConfigError, ProtocolError};
use crate::generation::Generation;
use crate::machine::{transition, Action, Event, Phase, UpdateOutcome};
use crate::sampler::Sampler;
use crate::settings::Settings;
use crate::state::State;
use crate::updater;

/// Answer to a submitted evaluation.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Evaluate this next.
    Dispatch(Task),
    /// Nothing to hand out until more answers arrive.
    Wait,
    /// A generation closed. Call [`CmaEsCholB::next_batch`] to continue.
    Generation(Task),
    /// The run terminated. Outstanding tasks should still be answered.
    Done(Task),
    /// Absorbed while draining.
    Folded,
}

struct Run {
    state: State,
    generation: Generation,
    threshold: StopThreshold,
    generations: u64,
}

/// CMA-ES with a Cholesky-factored covariance and box bounds.
pub struct CmaEsCholB {
    settings: Settings,
    sampler: Sampler,
    run: Option<Run>,
    phase: Phase,
    status: RunStatus,
    concurrency: usize,
}

impl CmaEsCholB {
    pub fn new(settings: Settings) -> Self {
        let sampler = Sampler::from_seed(settings.seed);
        Self::with_sampler(settings, sampler)
    }

    /// Use a caller-supplied random source instead of `settings.seed`.
    pub fn with_rng(settings: Settings, rng: Box<dyn RngCore + Send>) -> Self {
        Self::with_sampler(settings, Sampler::new(rng))
    }

    fn with_sampler(settings: Settings, sampler: Sampler) -> Self {
        Self {
            settings,
            sampler,
            run: None,
            phase: Phase::AwaitingInit,
            status: RunStatus::NotTerminated,
            concurrency: 0,
        }
    }

    /// Validate the settings for a `dim`-dimensional problem and size the
    /// run. Returns how many evaluations may be in flight at once, which is
    /// `tasks` capped at the population size.
    pub fn init(&mut self, dim: usize, tasks: usize) -> Result<usize, CmaError> {
        let state = State::new(dim, &self.settings)?;
        let population = state.params.population;
        let (phase, _) = transition(self.phase, Event::Initialized, population)?;
        self.concurrency = tasks.min(population);
        self.run = Some(Run {
            threshold: StopThreshold::from_setting(self.settings.stop_log_det, dim),
            generation: Generation::new(dim, population),
            state,
            generations: 0,
        });
        self.phase = phase;
        self.status = RunStatus::NotTerminated;
        tracing::debug!(
            dim,
            population,
            concurrency = self.concurrency,
            "optimizer initialized"
        );
        Ok(self.concurrency)
    }

    /// Centre the search on `x0` and hand out the first batch.
    pub fn start(&mut self, x0: &[f64]) -> Result<Vec<Task>, CmaError> {
        let run = self.run.as_mut().ok_or(ConfigError::NotInitialized)?;
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency.into());
        }
        let population = run.generation.population();
        transition(self.phase, Event::BatchDispatched, population)?;
        run.state.restart_at(x0)?;
        self.next_batch()
    }

    /// Hand out the opening batch of the current generation.
    pub fn next_batch(&mut self) -> Result<Vec<Task>, CmaError> {
        let run = self.run.as_mut().ok_or(ConfigError::NotInitialized)?;
        let (phase, _) = transition(
            self.phase,
            Event::BatchDispatched,
            run.generation.population(),
        )?;
        let mut tasks = Vec::with_capacity(self.concurrency);
        for _ in 0..self.concurrency {
            let x = self.sampler.draw(&run.state);
            let id = run.generation.push(&x);
            tasks.push(Task::evaluate(id, x.as_slice().to_vec()));
        }
        self.phase = phase;
        Ok(tasks)
    }

    /// Accept one evaluation result.
    ///
    /// A protocol violation is fatal: the run is marked failed and moves to
    /// draining, so no further generation is updated. Answers to tasks
    /// still outstanding are folded in until [`CmaEsCholB::close`].
    pub fn submit(&mut self, result: Task) -> Result<Reply, CmaError> {
        match self.accept(result) {
            Err(CmaError::Protocol(e)) => {
                self.abort(&e);
                Err(e.into())
            }
            reply => reply,
        }
    }

    fn abort(&mut self, error: &ProtocolError) {
        if !matches!(self.phase, Phase::AwaitingEvaluations | Phase::Draining) {
            return;
        }
        let population = self.population().unwrap_or(0);
        if let Ok((phase, _)) = transition(self.phase, Event::StopRequested, population) {
            self.phase = phase;
        }
        if self.status == RunStatus::NotTerminated {
            tracing::warn!(generation = self.generations(), %error, "protocol violation, draining");
            self.status = RunStatus::Failed {
                error: error.to_string(),
            };
        }
    }

    fn accept(&mut self, result: Task) -> Result<Reply, CmaError> {
        if result.kind != TaskKind::Evaluate {
            return Err(ProtocolError::UnexpectedKind(result.kind).into());
        }
        let run = self.run.as_mut().ok_or(ConfigError::NotInitialized)?;
        let population = run.generation.population();
        if !matches!(self.phase, Phase::AwaitingEvaluations | Phase::Draining) {
            return Err(ProtocolError::InvalidTransition {
                phase: self.phase,
                event: Event::ResultReceived {
                    sent: run.generation.sent(),
                    received: run.generation.received(),
                },
            }
            .into());
        }
        run.generation.record(result.id, result.f)?;
        let event = Event::ResultReceived {
            sent: run.generation.sent(),
            received: run.generation.received(),
        };
        let (phase, action) = transition(self.phase, event, population)?;
        self.phase = phase;
        match action {
            Action::DispatchNext => Ok(Reply::Dispatch(self.dispatch_one()?)),
            Action::Wait => Ok(Reply::Wait),
            Action::RunUpdate => self.finish_generation(),
            _ => Ok(Reply::Folded),
        }
    }

    fn dispatch_one(&mut self) -> Result<Task, CmaError> {
        let run = self.run.as_mut().ok_or(ConfigError::NotInitialized)?;
        let x = self.sampler.draw(&run.state);
        let id = run.generation.push(&x);
        Ok(Task::evaluate(id, x.as_slice().to_vec()))
    }

    fn finish_generation(&mut self) -> Result<Reply, CmaError> {
        let run = self.run.as_mut().ok_or(ConfigError::NotInitialized)?;
        let population = run.generation.population();

        let candidate = best_index(run.generation.evaluated())
            .map(|i| (run.generation.sample(i), run.generation.fitness(i)));
        let fallback = run.generation.sample(0);
        let (best_x, best_f) = run.state.best.record_generation(
            candidate.as_ref().map(|(x, f)| (x.as_slice(), *f)),
            fallback.as_slice(),
        );

        let outcome = match updater::update(&mut run.state, &run.generation) {
            Ok(()) if run.threshold.is_converged(&run.state.chol) => {
                self.status = RunStatus::Converged;
                UpdateOutcome::Converged
            }
            Ok(()) => UpdateOutcome::Continue,
            Err(e) => {
                tracing::warn!(generation = run.generations, error = %e, "update failed");
                self.status = RunStatus::Failed {
                    error: e.to_string(),
                };
                UpdateOutcome::Failed
            }
        };
        run.generations += 1;
        tracing::debug!(
            generation = run.generations,
            f = best_f,
            log_det = run.state.chol.log_det(),
            ?outcome,
            "generation complete"
        );

        let (phase, action) = transition(Phase::Updating, Event::Updated(outcome), population)?;
        if action == Action::EmitNotice {
            run.generation.advance();
            self.phase = phase;
            return Ok(Reply::Generation(Task::notice(
                TaskKind::MajorIteration,
                run.generations,
                best_x,
                best_f,
            )));
        }
        let (phase, _) = transition(phase, Event::DoneEmitted, population)?;
        self.phase = phase;
        Ok(Reply::Done(Task::notice(
            TaskKind::Done,
            run.generations,
            best_x,
            best_f,
        )))
    }

    /// Stop handing out work. Answers to tasks already dispatched are still
    /// accepted until [`CmaEsCholB::close`].
    pub fn stop(&mut self) -> Result<(), CmaError> {
        let population = self.population().unwrap_or(0);
        let (phase, _) = transition(self.phase, Event::StopRequested, population)?;
        self.phase = phase;
        Ok(())
    }

    /// End the run. Unless best tracking is in forget mode, answers that
    /// arrived while draining are folded into the running best; a notice is
    /// returned if that improved it.
    pub fn close(&mut self) -> Result<Option<Task>, CmaError> {
        let run = self.run.as_mut().ok_or(ConfigError::NotInitialized)?;
        let (phase, _) = transition(
            self.phase,
            Event::CloseRequested,
            run.generation.population(),
        )?;
        self.phase = phase;
        if !run.generation.is_settled() {
            tracing::warn!(
                sent = run.generation.sent(),
                received = run.generation.received(),
                "closing with unanswered tasks"
            );
        }
        if run.state.best.forget() {
            return Ok(None);
        }
        let candidate = best_index(run.generation.evaluated())
            .map(|i| (run.generation.sample(i), run.generation.fitness(i)));
        let improved = run
            .state
            .best
            .improve(candidate.as_ref().map(|(x, f)| (x.as_slice(), *f)));
        Ok(improved.then(|| {
            Task::notice(
                TaskKind::MajorIteration,
                run.generations,
                run.state.best.x().to_vec(),
                run.state.best.f(),
            )
        }))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn population(&self) -> Option<usize> {
        self.run.as_ref().map(|r| r.state.params.population)
    }

    pub fn dimension(&self) -> Option<usize> {
        self.run.as_ref().map(|r| r.state.dim())
    }

    /// Completed generations.
    pub fn generations(&self) -> u64 {
        self.run.as_ref().map_or(0, |r| r.generations)
    }

    pub fn mean(&self) -> Option<&[f64]> {
        self.run.as_ref().map(|r| r.state.mean.as_slice())
    }

    /// Running best. In forget mode this is not maintained.
    pub fn best(&self) -> Option<(&[f64], f64)> {
        self.run
            .as_ref()
            .map(|r| (r.state.best.x(), r.state.best.f()))
    }

    pub fn step_size(&self) -> Option<f64> {
        self.run.as_ref().map(|r| 1.0 / r.state.inv_sigma)
    }

    /// `log det C` of the current sampling covariance.
    pub fn log_det(&self) -> Option<f64> {
        self.run.as_ref().map(|r| r.state.chol.log_det())
    }
}

impl std::fmt::Debug for CmaEsCholB {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmaEsCholB")
            .field("phase", &self.phase)
            .field("status", &self.status)
            .field("concurrency", &self.concurrency)
            .field("generations", &self.generations())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cholesky::CholeskyFactor;

    fn sphere(x: &[f64]) -> f64 {
        x.iter().map(|v| v * v).sum()
    }

    /// Answer everything, feeding dispatched tasks back in, until the
    /// generation closes.
    fn run_generation(cma: &mut CmaEsCholB, batch: Vec<Task>) -> (Reply, Vec<f64>) {
        let mut pending = batch;
        let mut seen = Vec::new();
        while let Some(task) = pending.pop() {
            let f = sphere(&task.x);
            seen.push(f);
            match cma.submit(task.answered(f)).unwrap() {
                Reply::Dispatch(next) => pending.push(next),
                Reply::Wait | Reply::Folded => {}
                done @ (Reply::Generation(_) | Reply::Done(_)) => return (done, seen),
            }
        }
        panic!("generation never closed");
    }

    #[test]
    fn test_init_caps_concurrency() {
        let mut cma = CmaEsCholB::new(Settings::default().with_seed(1));
        assert_eq!(cma.init(2, 100).unwrap(), 6);
        assert_eq!(cma.population(), Some(6));
        let mut cma = CmaEsCholB::new(Settings::default().with_seed(1));
        assert_eq!(cma.init(2, 3).unwrap(), 3);
    }

    #[test]
    fn test_zero_concurrency_and_uninitialized() {
        let mut cma = CmaEsCholB::new(Settings::default());
        assert_eq!(
            cma.start(&[0.0]).unwrap_err(),
            CmaError::Config(ConfigError::NotInitialized)
        );
        assert_eq!(cma.init(1, 0).unwrap(), 0);
        assert_eq!(
            cma.start(&[0.0]).unwrap_err(),
            CmaError::Config(ConfigError::ZeroConcurrency)
        );
        assert!(matches!(
            CmaEsCholB::new(Settings::default()).init(0, 4),
            Err(CmaError::Config(ConfigError::NonPositiveDimension))
        ));
    }

    #[test]
    fn test_dispatch_sequence_out_of_order() {
        let settings = Settings::default().with_population(4).with_seed(5);
        let mut cma = CmaEsCholB::new(settings);
        assert_eq!(cma.init(2, 2).unwrap(), 2);
        let batch = cma.start(&[1.0, 1.0]).unwrap();
        assert_eq!(batch.iter().map(|t| t.id).collect::<Vec<_>>(), vec![0, 1]);
        assert!(batch.iter().all(|t| t.kind == TaskKind::Evaluate && t.f.is_nan()));

        let mut tasks: Vec<Task> = batch.into_iter().rev().collect();
        let t1 = tasks.remove(0);
        let Reply::Dispatch(t2) = cma.submit(t1.answered(1.0)).unwrap() else {
            panic!("expected dispatch");
        };
        assert_eq!(t2.id, 2);
        let t0 = tasks.remove(0);
        let Reply::Dispatch(t3) = cma.submit(t0.answered(2.0)).unwrap() else {
            panic!("expected dispatch");
        };
        assert_eq!(t3.id, 3);
        assert!(matches!(cma.submit(t3.answered(3.0)).unwrap(), Reply::Wait));
        let Reply::Generation(notice) = cma.submit(t2.answered(0.5)).unwrap() else {
            panic!("expected generation notice");
        };
        assert_eq!(notice.kind, TaskKind::MajorIteration);
        assert_eq!(notice.id, 1);
        assert_eq!(notice.f, 0.5);

        let next: Vec<u64> = cma.next_batch().unwrap().iter().map(|t| t.id).collect();
        assert_eq!(next, vec![4, 5]);
    }

    #[test]
    fn test_protocol_violations() {
        let mut cma = CmaEsCholB::new(Settings::default().with_population(4).with_seed(2));
        cma.init(1, 2).unwrap();
        let batch = cma.start(&[0.0]).unwrap();

        let wrong = Task::notice(TaskKind::MajorIteration, 0, vec![0.0], 1.0);
        assert_eq!(
            cma.submit(wrong).unwrap_err(),
            CmaError::Protocol(ProtocolError::UnexpectedKind(TaskKind::MajorIteration))
        );
        let unknown = Task::evaluate(99, vec![0.0]).answered(1.0);
        assert_eq!(
            cma.submit(unknown).unwrap_err(),
            CmaError::Protocol(ProtocolError::UnknownTask(99))
        );
        // The first violation ends the run; nothing further is dispatched.
        assert_eq!(cma.phase(), Phase::Draining);
        assert!(matches!(cma.status(), RunStatus::Failed { error } if error.contains("MajorIteration")));
        assert!(cma.next_batch().is_err());

        // Outstanding answers still drain.
        assert!(matches!(cma.submit(batch[0].clone().answered(1.0)).unwrap(), Reply::Folded));
        assert_eq!(
            cma.submit(batch[0].clone().answered(1.0)).unwrap_err(),
            CmaError::Protocol(ProtocolError::DuplicateResult(0))
        );
        assert!(matches!(cma.submit(batch[1].clone().answered(0.5)).unwrap(), Reply::Folded));
        assert!(matches!(cma.status(), RunStatus::Failed { .. }));

        let notice = cma.close().unwrap().expect("drained answers improve the running best");
        assert_eq!(notice.f, 0.5);
        assert_eq!(cma.phase(), Phase::Closed);
        assert_eq!(cma.generations(), 0);
    }

    #[test]
    fn test_duplicate_answer_fails_run() {
        let mut cma = CmaEsCholB::new(Settings::default().with_population(4).with_seed(2));
        cma.init(1, 2).unwrap();
        let batch = cma.start(&[0.0]).unwrap();
        let Reply::Dispatch(next) = cma.submit(batch[0].clone().answered(1.0)).unwrap() else {
            panic!("expected dispatch");
        };
        assert!(cma.submit(batch[0].clone().answered(1.0)).is_err());
        assert_eq!(cma.phase(), Phase::Draining);
        assert!(matches!(cma.submit(batch[1].clone().answered(2.0)).unwrap(), Reply::Folded));
        assert!(matches!(cma.submit(next.answered(3.0)).unwrap(), Reply::Folded));
        cma.close().unwrap();
        assert_eq!(cma.phase(), Phase::Closed);
    }

    #[test]
    fn test_numerical_failure_ends_run() {
        let settings = Settings::default().with_population(4).with_seed(8);
        let mut cma = CmaEsCholB::new(settings);
        cma.init(1, 4).unwrap();
        let batch = cma.start(&[1.0]).unwrap();
        let before = cma.mean().unwrap().to_vec();

        // A vanishing factor makes the whitened mean shift overflow.
        if let Some(run) = cma.run.as_mut() {
            run.state.chol = CholeskyFactor::from_rows(&[vec![1e-320]], 1).unwrap();
        }

        let mut replies = Vec::new();
        for (i, t) in batch.into_iter().enumerate() {
            replies.push(cma.submit(t.answered(i as f64)).unwrap());
        }
        let done: Vec<&Task> = replies
            .iter()
            .filter_map(|r| match r {
                Reply::Done(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(done.len(), 1);
        assert!(matches!(replies.last(), Some(Reply::Done(_))));
        assert!(!replies.iter().any(|r| matches!(r, Reply::Generation(_))));
        assert_eq!(done[0].f, 0.0);
        assert!(
            matches!(cma.status(), RunStatus::Failed { error } if error.contains("triangular solve")),
            "{:?}",
            cma.status()
        );
        // The failed update leaves the state untouched.
        assert_eq!(cma.mean().unwrap(), before.as_slice());
        assert_eq!(cma.phase(), Phase::Draining);
        assert!(cma.next_batch().is_err());
        assert!(cma.close().unwrap().is_none());
        assert_eq!(cma.phase(), Phase::Closed);
    }

    #[test]
    fn test_large_threshold_converges_first_generation() {
        let settings = Settings::default().with_seed(3).with_stop_log_det(1e9);
        let mut cma = CmaEsCholB::new(settings);
        let n = cma.init(2, 6).unwrap();
        let batch = cma.start(&[3.0, 4.0]).unwrap();
        assert_eq!(batch.len(), n);
        let (reply, seen) = run_generation(&mut cma, batch);
        let Reply::Done(done) = reply else {
            panic!("expected done");
        };
        assert!(done.is_done());
        assert_eq!(done.id, 1);
        let min = seen.iter().cloned().fold(f64::INFINITY, f64::min);
        assert_eq!(done.f, min);
        assert_eq!(cma.status(), &RunStatus::Converged);
        assert_eq!(cma.phase(), Phase::Draining);
        assert!(cma.close().unwrap().is_none());
        assert_eq!(cma.phase(), Phase::Closed);
    }

    #[test]
    fn test_nan_threshold_never_converges() {
        let settings = Settings::default().with_seed(4).with_stop_log_det(f64::NAN);
        let mut cma = CmaEsCholB::new(settings);
        cma.init(2, 6).unwrap();
        let mut batch = cma.start(&[1.0, 1.0]).unwrap();
        for _ in 0..60 {
            let (reply, _) = run_generation(&mut cma, batch);
            assert!(matches!(reply, Reply::Generation(_)));
            assert_eq!(cma.status(), &RunStatus::NotTerminated);
            batch = cma.next_batch().unwrap();
        }
    }

    #[test]
    fn test_running_best_is_monotone() {
        let mut cma = CmaEsCholB::new(Settings::default().with_seed(11));
        cma.init(3, 100).unwrap();
        let mut batch = cma.start(&[5.0, -5.0, 5.0]).unwrap();
        let mut last = f64::INFINITY;
        for _ in 0..40 {
            let (reply, _) = run_generation(&mut cma, batch);
            let Reply::Generation(notice) = reply else {
                break;
            };
            assert!(notice.f <= last);
            assert_eq!(sphere(&notice.x), notice.f);
            last = notice.f;
            batch = cma.next_batch().unwrap();
        }
    }

    #[test]
    fn test_forget_reports_generation_best() {
        let settings = Settings::default().with_seed(12).with_forget_best(true);
        let mut cma = CmaEsCholB::new(settings);
        cma.init(2, 100).unwrap();
        let mut batch = cma.start(&[5.0, 5.0]).unwrap();
        for _ in 0..20 {
            let (reply, seen) = run_generation(&mut cma, batch);
            let Reply::Generation(notice) = reply else {
                break;
            };
            let min = seen.iter().cloned().fold(f64::INFINITY, f64::min);
            assert_eq!(notice.f, min);
            batch = cma.next_batch().unwrap();
        }
    }

    #[test]
    fn test_all_nan_generation() {
        let settings = Settings::default().with_seed(13).with_population(4);
        let mut cma = CmaEsCholB::new(settings);
        cma.init(1, 4).unwrap();
        let batch = cma.start(&[0.0]).unwrap();
        let mut last = None;
        for t in batch {
            last = Some(cma.submit(t.answered(f64::NAN)).unwrap());
        }
        let Some(Reply::Generation(notice)) = last else {
            panic!("expected generation notice");
        };
        assert_eq!(notice.f, f64::INFINITY);
        assert_eq!(notice.x, vec![0.0]);
    }

    #[test]
    fn test_stop_drain_close() {
        let settings = Settings::default().with_seed(14).with_population(4);
        let mut cma = CmaEsCholB::new(settings);
        cma.init(1, 4).unwrap();
        let batch = cma.start(&[2.0]).unwrap();
        let answers: Vec<Task> = batch
            .into_iter()
            .map(|t| {
                let f = sphere(&t.x);
                t.answered(f)
            })
            .collect();
        let min = answers.iter().map(|t| t.f).fold(f64::INFINITY, f64::min);

        cma.submit(answers[0].clone()).unwrap();
        cma.submit(answers[1].clone()).unwrap();
        cma.stop().unwrap();
        assert_eq!(cma.phase(), Phase::Draining);
        assert!(matches!(cma.submit(answers[2].clone()).unwrap(), Reply::Folded));
        assert!(matches!(cma.submit(answers[3].clone()).unwrap(), Reply::Folded));
        assert!(cma.submit(answers[3].clone()).is_err());
        assert!(cma.next_batch().is_err());

        let notice = cma.close().unwrap().expect("drained answers improve the running best");
        assert_eq!(notice.f, min);
        assert_eq!(cma.best().unwrap().1, min);
        assert_eq!(cma.phase(), Phase::Closed);
        assert!(cma.submit(answers[0].clone()).is_err());
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let run = || {
            let mut cma = CmaEsCholB::new(Settings::default().with_seed(99));
            cma.init(2, 3).unwrap();
            let mut batch = cma.start(&[1.0, 2.0]).unwrap();
            let mut notices = Vec::new();
            for _ in 0..10 {
                let (reply, _) = run_generation(&mut cma, batch);
                let Reply::Generation(n) = reply else { break };
                notices.push((n.x, n.f));
                batch = cma.next_batch().unwrap();
            }
            notices
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_reinit_after_close() {
        let mut cma = CmaEsCholB::new(Settings::default().with_seed(15));
        cma.init(1, 1).unwrap();
        cma.start(&[0.0]).unwrap();
        assert!(cma.init(1, 1).is_err());
        cma.stop().unwrap();
        cma.close().unwrap();
        assert_eq!(cma.init(2, 2).unwrap(), 2);
        assert_eq!(cma.phase(), Phase::Sampling);
    }
}
