//! # cholcma
//!
//! Bound-constrained CMA-ES that keeps the sampling covariance as a
//! lower-triangular Cholesky factor and refreshes it with rank-one updates,
//! so a generation costs O(λ n²) instead of an O(n³) decomposition.
//!
//! The optimizer never calls the objective itself. It hands out
//! `Evaluate` tasks and takes answers back in any order, which lets the
//! evaluations run wherever the caller likes: a rayon pool
//! ([`local::minimize`]), an async channel pair ([`stream::spawn`]), or
//! remote workers behind an HTTP server.
//!
//! ```no_run
//! use cholcma::{local, Budget, CmaEsCholB, Settings};
//!
//! let mut cma = CmaEsCholB::new(Settings::default().with_seed(1));
//! let sphere = |x: &[f64]| x.iter().map(|v| v * v).sum::<f64>();
//! let out = local::minimize(sphere, &[3.0, -2.0], &mut cma, 8, Budget::default(), |_| {})?;
//! println!("{:?} -> {}", out.x, out.f);
//! # Ok::<(), cholcma::CmaError>(())
//! ```
//!
//! [`roots`] and [`powell`] hold the scalar root finders and the
//! derivative-free line-search minimizer used alongside it.

pub mod best;
pub mod bounds;
pub mod budget;
pub mod cholesky;
pub mod convergence;
pub mod error;
pub mod generation;
pub mod local;
pub mod machine;
pub mod method;
pub mod params;
pub mod powell;
pub mod roots;
pub mod sampler;
pub mod session;
pub mod settings;
pub mod state;
pub mod stream;
pub mod updater;

pub use budget::{Budget, Outcome, Termination};
pub use error::{CmaError, ConfigError, NumericalError, PowellError, ProtocolError, RootError};
pub use machine::Phase;
pub use method::{CmaEsCholB, Reply};
pub use session::{Absorbed, Session};
pub use settings::Settings;

pub use cholcma_protocol::{RunStatus, Task, TaskId, TaskKind};
