//! Lower-triangular Cholesky factor of the search covariance, kept up to
//! date with rank-one updates instead of refactorizing every generation.
//!
//! `C = L Lᵀ`. Everything outside the lower triangle is zero.

use nalgebra::{DMatrix, DVector};

use crate::error::{ConfigError, NumericalError};

/// Substituted for a zero covariance scale so the factor keeps a strictly
/// positive diagonal.
pub const MIN_COVARIANCE_SCALE: f64 = f64::MIN_POSITIVE;

#[derive(Debug, Clone, PartialEq)]
pub struct CholeskyFactor {
    l: DMatrix<f64>,
}

impl CholeskyFactor {
    pub fn identity(n: usize) -> Self {
        Self {
            l: DMatrix::identity(n, n),
        }
    }

    /// Build from lower-triangular rows. Entries above the diagonal are
    /// ignored; the diagonal must be strictly positive.
    pub fn from_rows(rows: &[Vec<f64>], n: usize) -> Result<Self, ConfigError> {
        if rows.len() != n {
            return Err(ConfigError::CholeskyDimension {
                expected: n,
                actual: rows.len(),
            });
        }
        let mut l = DMatrix::zeros(n, n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(ConfigError::CholeskyRow {
                    row: i,
                    len: row.len(),
                    expected: n,
                });
            }
            for j in 0..=i {
                l[(i, j)] = row[j];
            }
            let d = row[i];
            if !(d > 0.0) || !d.is_finite() {
                return Err(ConfigError::NotPositiveDefinite { index: i, value: d });
            }
        }
        Ok(Self { l })
    }

    pub fn dim(&self) -> usize {
        self.l.nrows()
    }

    pub fn lower(&self) -> &DMatrix<f64> {
        &self.l
    }

    /// `L z`, the correlated part of a sample.
    pub fn mul(&self, z: &DVector<f64>) -> DVector<f64> {
        let n = self.dim();
        let mut out = DVector::zeros(n);
        for i in 0..n {
            let mut s = 0.0;
            for k in 0..=i {
                s += self.l[(i, k)] * z[k];
            }
            out[i] = s;
        }
        out
    }

    /// Solve `L t = b` (equivalently `Uᵀ t = b` for the upper factor `U = Lᵀ`).
    pub fn solve(&self, b: &DVector<f64>) -> Result<DVector<f64>, NumericalError> {
        let t = self
            .l
            .solve_lower_triangular(b)
            .ok_or(NumericalError::SingularFactor)?;
        if t.iter().any(|v| !v.is_finite()) {
            return Err(NumericalError::NonFinite("triangular solve"));
        }
        Ok(t)
    }

    /// `C ← s C`. A zero scale is replaced by [`MIN_COVARIANCE_SCALE`].
    pub fn scale(&mut self, s: f64) {
        let s = if s == 0.0 { MIN_COVARIANCE_SCALE } else { s };
        self.l *= s.sqrt();
    }

    /// `C ← C + alpha x xᵀ` for `alpha >= 0`.
    pub fn rank_one_update(&mut self, alpha: f64, x: &DVector<f64>) {
        if alpha <= 0.0 {
            return;
        }
        let n = self.dim();
        let mut w = x * alpha.sqrt();
        for k in 0..n {
            let lkk = self.l[(k, k)];
            let r = lkk.hypot(w[k]);
            let c = r / lkk;
            let s = w[k] / lkk;
            self.l[(k, k)] = r;
            for i in (k + 1)..n {
                let lik = (self.l[(i, k)] + s * w[i]) / c;
                self.l[(i, k)] = lik;
                w[i] = c * w[i] - s * lik;
            }
        }
    }

    /// `ln det C = 2 Σ ln L_kk`.
    pub fn log_det(&self) -> f64 {
        2.0 * self.l.diagonal().iter().map(|d| d.ln()).sum::<f64>()
    }

    /// The covariance `L Lᵀ`.
    pub fn covariance(&self) -> DMatrix<f64> {
        &self.l * self.l.transpose()
    }
}
