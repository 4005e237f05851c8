//! In-process driver: evaluates each batch of tasks in parallel on the
//! rayon pool and feeds the answers back.

use cholcma_protocol::Task;
use rayon::prelude::*;

use crate::budget::{Budget, Outcome};
use crate::error::CmaError;
use crate::method::CmaEsCholB;
use crate::session::Session;

/// Minimize `objective` starting from `x0`.
///
/// `tasks` is the requested concurrency (capped at the population size).
/// `on_generation` sees every generation notice and the terminal one.
pub fn minimize<F, G>(
    objective: F,
    x0: &[f64],
    method: &mut CmaEsCholB,
    tasks: usize,
    budget: Budget,
    mut on_generation: G,
) -> Result<Outcome, CmaError>
where
    F: Fn(&[f64]) -> f64 + Sync,
    G: FnMut(&Task),
{
    method.init(x0.len(), tasks)?;
    let mut pending = method.start(x0)?;
    let mut session = Session::new(budget, x0);

    while !pending.is_empty() {
        let answered: Vec<Task> = std::mem::take(&mut pending)
            .into_par_iter()
            .map(|task| {
                let f = objective(&task.x);
                task.answered(f)
            })
            .collect();
        for result in answered {
            let absorbed = session.absorb(method, result)?;
            pending.extend(absorbed.tasks);
            if let Some(notice) = absorbed.notice {
                on_generation(&notice);
            }
        }
    }

    for notice in session.close(method)? {
        on_generation(&notice);
    }
    let outcome = session.outcome(method);
    tracing::info!(
        f = outcome.f,
        generations = outcome.generations,
        evaluations = outcome.evaluations,
        termination = ?outcome.termination,
        "local run finished"
    );
    Ok(outcome)
}
