//! cholcma wire protocol
//!
//! The optimizer never evaluates the objective itself. It hands out
//! `Evaluate` tasks and waits for each one to come back with a value.
//! Whoever evaluates (a rayon pool, a tokio task, a remote worker) speaks
//! the types in this crate.
//!
//! # Architecture
//!
//! ```text
//!  ┌───────────┐  Evaluate{id,x}  ┌────────┐  GET /api/tasks/next  ┌────────┐
//!  │ Protocol  │ ───────────────► │ server │ ◄──────────────────── │worker A│
//!  │ (CMA-ES)  │ ◄─────────────── │        │ ────────────────────► │        │
//!  └───────────┘  Evaluate{id,f}  └────────┘  POST /api/results    └────────┘
//!        │                             ▲
//!        └── MajorIteration / Done ────┘  (history, final result)
//! ```
//!
//! ## Task contract
//! - Every `Evaluate` task must be answered exactly once, with the same id.
//! - Answers may arrive in any order.
//! - One `MajorIteration` per generation, exactly one `Done`, then the
//!   outbound stream closes.

pub mod serde_utils;
pub mod types;

pub use types::*;
