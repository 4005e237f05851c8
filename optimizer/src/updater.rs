//! End-of-generation update: recombination, evolution paths, covariance
//! factor and step size.

use std::cmp::Ordering;

use nalgebra::DVector;

use crate::error::NumericalError;
use crate::generation::Generation;
use crate::state::State;

/// Slot indices from best to worst. Stable, NaN ranks last.
pub fn rank(fitness: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    order.sort_by(|&a, &b| {
        let (fa, fb) = (fitness[a], fitness[b]);
        match (fa.is_nan(), fb.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => fa.partial_cmp(&fb).unwrap_or(Ordering::Equal),
        }
    });
    order
}

/// Apply one generation's worth of adaptation to `state`.
///
/// Nothing in `state` changes if the update fails.
pub fn update(state: &mut State, generation: &Generation) -> Result<(), NumericalError> {
    let p = &state.params;
    let n = p.dim;
    let fitness: Vec<f64> = (0..p.population).map(|i| generation.fitness(i)).collect();
    let order = rank(&fitness);

    let old_mean = state.mean.clone();
    let mut mean = DVector::zeros(n);
    for (w, &idx) in p.weights.iter().zip(&order) {
        mean.axpy(*w, &generation.sample(idx), 1.0);
    }
    state.bounds.enforce(mean.as_mut_slice(), old_mean.as_slice());
    let mean_diff = &mean - &old_mean;

    // ps needs C^(-1/2) (m' - m); with C = L Lᵀ that's a triangular solve.
    let whitened = state.chol.solve(&mean_diff)?;
    if !mean.iter().all(|v| v.is_finite()) {
        return Err(NumericalError::NonFinite("mean"));
    }

    let cc_scale = (p.cc * (2.0 - p.cc) * p.mu_eff).sqrt() * state.inv_sigma;
    let pc = &state.pc * (1.0 - p.cc) + &mean_diff * cc_scale;
    let cs_scale = (p.cs * (2.0 - p.cs) * p.mu_eff).sqrt() * state.inv_sigma;
    let ps = &state.ps * (1.0 - p.cs) + whitened * cs_scale;

    let mut chol = state.chol.clone();
    chol.scale(p.covariance_decay());
    chol.rank_one_update(p.c1, &pc);
    for (w, &idx) in p.weights.iter().zip(&order) {
        let y = generation.sample(idx) - &old_mean;
        chol.rank_one_update(p.cmu * w * state.inv_sigma, &y);
    }

    // Overflow drives inv_sigma to 0, which only freezes the path updates.
    let inv_sigma = state.inv_sigma / (p.cs / p.ds * (ps.norm() / p.e_chi - 1.0)).exp();

    tracing::trace!(
        inv_sigma,
        ps_norm = ps.norm(),
        log_det = chol.log_det(),
        "generation update"
    );

    state.mean = mean;
    state.pc = pc;
    state.ps = ps;
    state.chol = chol;
    state.inv_sigma = inv_sigma;
    Ok(())
}
