//! Caller-side limits on a run, and how a run ended.

use cholcma_protocol::RunStatus;
use serde::{Deserialize, Serialize};

/// Limits checked by the drivers. Unset fields never trigger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budget {
    pub max_generations: Option<u64>,
    /// Checked as answers are absorbed. Tasks already dispatched when it
    /// trips are still answered, so the total may overshoot by up to the
    /// concurrency.
    pub max_evaluations: Option<u64>,
    /// Stop once the reported best is at or below this.
    pub function_threshold: Option<f64>,
}

impl Budget {
    pub fn with_max_generations(mut self, n: u64) -> Self {
        self.max_generations = Some(n);
        self
    }

    pub fn with_max_evaluations(mut self, n: u64) -> Self {
        self.max_evaluations = Some(n);
        self
    }

    pub fn with_function_threshold(mut self, f: f64) -> Self {
        self.function_threshold = Some(f);
        self
    }

    pub fn after_generation(&self, generations: u64, f: f64) -> Option<Termination> {
        if self.function_threshold.is_some_and(|t| f <= t) {
            return Some(Termination::FunctionThreshold);
        }
        if self.max_generations.is_some_and(|m| generations >= m) {
            return Some(Termination::GenerationLimit);
        }
        None
    }

    pub fn after_evaluation(&self, evaluations: u64) -> Option<Termination> {
        self.max_evaluations
            .is_some_and(|m| evaluations >= m)
            .then_some(Termination::EvaluationLimit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Covariance volume fell below the stop threshold.
    Converged,
    /// Numerical breakdown in the update.
    Failed,
    GenerationLimit,
    EvaluationLimit,
    FunctionThreshold,
    /// The caller went away.
    Cancelled,
}

impl Termination {
    pub fn from_status(status: &RunStatus) -> Option<Self> {
        match status {
            RunStatus::NotTerminated => None,
            RunStatus::Converged => Some(Termination::Converged),
            RunStatus::Failed { .. } => Some(Termination::Failed),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub x: Vec<f64>,
    pub f: f64,
    pub termination: Termination,
    pub status: RunStatus,
    pub generations: u64,
    pub evaluations: u64,
}
