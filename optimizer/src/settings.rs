//! Run configuration.
//!
//! Every field is optional; zero values select the defaults, the same way
//! the JSON sent to the server can leave them out.

use cholcma_protocol::serde_utils::{deserialize_null_as_nan, serialize_nan_as_null};
use serde::{Deserialize, Serialize};

/// Optimizer settings, validated by [`crate::CmaEsCholB::init`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Initial step size. 0 selects the default (inverse step size 10/3).
    pub init_step_size: f64,
    /// Population size λ. 0 selects `4 + floor(3 ln n)`.
    pub population: usize,
    /// Lower-triangular Cholesky factor of the initial sampling covariance,
    /// row by row. `None` selects the identity.
    pub init_cholesky: Option<Vec<Vec<f64>>>,
    /// Stop once the log-determinant of the covariance drops below this.
    /// 0 selects `n ln(1e-16)`; NaN (`null` in JSON) disables the check.
    #[serde(
        serialize_with = "serialize_nan_as_null",
        deserialize_with = "deserialize_null_as_nan"
    )]
    pub stop_log_det: f64,
    /// Report each generation's own best instead of the running best.
    pub forget_best: bool,
    /// Lower bounds for a prefix of the coordinates.
    pub x_min: Vec<f64>,
    /// Upper bounds for a prefix of the coordinates.
    pub x_max: Vec<f64>,
    /// Seed for a deterministic random source.
    pub seed: Option<u64>,
}

impl Settings {
    pub fn with_population(mut self, population: usize) -> Self {
        self.population = population;
        self
    }

    pub fn with_step_size(mut self, step: f64) -> Self {
        self.init_step_size = step;
        self
    }

    pub fn with_bounds(mut self, x_min: Vec<f64>, x_max: Vec<f64>) -> Self {
        self.x_min = x_min;
        self.x_max = x_max;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_stop_log_det(mut self, threshold: f64) -> Self {
        self.stop_log_det = threshold;
        self
    }

    pub fn with_forget_best(mut self, forget: bool) -> Self {
        self.forget_best = forget;
        self
    }

    pub fn with_init_cholesky(mut self, rows: Vec<Vec<f64>>) -> Self {
        self.init_cholesky = Some(rows);
        self
    }
}
