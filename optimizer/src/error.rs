use cholcma_protocol::{TaskId, TaskKind};
use thiserror::Error;

use crate::machine::{Event, Phase};

/// Invalid configuration. Fatal at init, never recovered.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("non-positive input dimension")]
    NonPositiveDimension,
    #[error("no evaluation tasks allowed in flight (concurrency is 0)")]
    ZeroConcurrency,
    #[error("initial step size must be positive and finite, got {0}")]
    InvalidStepSize(f64),
    #[error("initial Cholesky factor is {actual}x{actual}, expected {expected}x{expected}")]
    CholeskyDimension { expected: usize, actual: usize },
    #[error("initial Cholesky factor row {row} has length {len}, expected {expected}")]
    CholeskyRow {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("initial Cholesky factor has non-positive diagonal entry {value} at {index}")]
    NotPositiveDefinite { index: usize, value: f64 },
    #[error("{which} bound covers {len} coordinates but the dimension is {dim}")]
    BoundsLength {
        which: &'static str,
        len: usize,
        dim: usize,
    },
    #[error("bounds cross at coordinate {index}: min {min} > max {max}")]
    CrossedBounds { index: usize, min: f64, max: f64 },
    #[error("initial point has {actual} coordinates, expected {expected}")]
    InitialPoint { expected: usize, actual: usize },
    #[error("optimizer used before init")]
    NotInitialized,
}

/// Numerical breakdown during a generation update. Fatal to the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericalError {
    #[error("Cholesky factor is singular (zero diagonal), cannot solve for the step-size path")]
    SingularFactor,
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

/// The caller broke the task contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("unexpected message kind {0:?}, only evaluate results are accepted")]
    UnexpectedKind(TaskKind),
    #[error("task {0} does not belong to the current generation")]
    UnknownTask(TaskId),
    #[error("task {0} was already answered")]
    DuplicateResult(TaskId),
    #[error("{event:?} is not allowed while {phase:?}")]
    InvalidTransition { phase: Phase, event: Event },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CmaError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("numerical error: {0}")]
    Numerical(#[from] NumericalError),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Failure of a scalar root finder.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RootError {
    #[error("root not bracketed: f(a) = {fa}, f(b) = {fb} have the same sign")]
    NotBracketed { fa: f64, fb: f64 },
    #[error("no convergence after {0} iterations")]
    MaxIterations(usize),
}

/// Failure of the bracketing step of a line search.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PowellError {
    #[error("bracket search did not terminate after {0} iterations")]
    BracketIterations(usize),
    #[error("({a}, {b}, {c}) is not a bracketing interval")]
    NotBracketing { a: f64, b: f64, c: f64 },
}
