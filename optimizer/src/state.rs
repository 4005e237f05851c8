//! Mutable search state of one run.

use nalgebra::DVector;

use crate::best::BestTracker;
use crate::bounds::Bounds;
use crate::cholesky::CholeskyFactor;
use crate::error::ConfigError;
use crate::params::Params;
use crate::settings::Settings;

/// Inverse step size used when the settings leave it at 0.
pub const DEFAULT_INV_SIGMA: f64 = 10.0 / 3.0;

#[derive(Debug, Clone)]
pub struct State {
    pub params: Params,
    /// 1/σ. Kept inverted so the update is a multiply.
    pub inv_sigma: f64,
    /// Covariance evolution path
    pub pc: DVector<f64>,
    /// Step-size evolution path
    pub ps: DVector<f64>,
    pub mean: DVector<f64>,
    pub chol: CholeskyFactor,
    pub bounds: Bounds,
    pub best: BestTracker,
}

impl State {
    pub fn new(dim: usize, settings: &Settings) -> Result<Self, ConfigError> {
        if dim == 0 {
            return Err(ConfigError::NonPositiveDimension);
        }
        let step = settings.init_step_size;
        let inv_sigma = if step == 0.0 {
            DEFAULT_INV_SIGMA
        } else if step > 0.0 && step.is_finite() {
            1.0 / step
        } else {
            return Err(ConfigError::InvalidStepSize(step));
        };
        let chol = match &settings.init_cholesky {
            Some(rows) => CholeskyFactor::from_rows(rows, dim)?,
            None => CholeskyFactor::identity(dim),
        };
        let bounds = Bounds::new(settings.x_min.clone(), settings.x_max.clone(), dim)?;
        let mean = DVector::zeros(dim);
        Ok(Self {
            params: Params::new(dim, settings.population),
            inv_sigma,
            pc: DVector::zeros(dim),
            ps: DVector::zeros(dim),
            best: BestTracker::new(mean.as_slice(), settings.forget_best),
            mean,
            chol,
            bounds,
        })
    }

    pub fn dim(&self) -> usize {
        self.params.dim
    }

    /// Place the mean at `x0`, clamped into the box, and reset best tracking.
    pub fn restart_at(&mut self, x0: &[f64]) -> Result<(), ConfigError> {
        if x0.len() != self.dim() {
            return Err(ConfigError::InitialPoint {
                expected: self.dim(),
                actual: x0.len(),
            });
        }
        let mut mean = x0.to_vec();
        let moved = self.bounds.clamp(&mut mean);
        if moved > 0 {
            tracing::warn!(moved, "initial point outside bounds, clamped");
        }
        self.mean = DVector::from_vec(mean);
        self.best = BestTracker::new(self.mean.as_slice(), self.best.forget());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_size_defaults() {
        let s = State::new(2, &Settings::default()).unwrap();
        assert_eq!(s.inv_sigma, 10.0 / 3.0);
        let s = State::new(2, &Settings::default().with_step_size(0.5)).unwrap();
        assert_eq!(s.inv_sigma, 2.0);
        assert_eq!(
            State::new(2, &Settings::default().with_step_size(-1.0)).unwrap_err(),
            ConfigError::InvalidStepSize(-1.0)
        );
        assert!(State::new(2, &Settings::default().with_step_size(f64::NAN)).is_err());
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert_eq!(
            State::new(0, &Settings::default()).unwrap_err(),
            ConfigError::NonPositiveDimension
        );
        let s = Settings::default().with_init_cholesky(vec![vec![1.0, 0.0]]);
        assert!(matches!(
            State::new(2, &s),
            Err(ConfigError::CholeskyDimension { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_restart_clamps_into_box() {
        let settings = Settings::default().with_bounds(vec![0.0], vec![1.0]);
        let mut s = State::new(2, &settings).unwrap();
        s.restart_at(&[4.0, -7.0]).unwrap();
        assert_eq!(s.mean.as_slice(), &[1.0, -7.0]);
        assert_eq!(s.best.x(), &[1.0, -7.0]);
        assert!(s.restart_at(&[1.0]).is_err());
    }
}
