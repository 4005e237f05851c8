//! Covariance-volume stopping rule.

use crate::cholesky::CholeskyFactor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopThreshold {
    Disabled,
    /// Converged once `log det C` drops below this.
    LogDet(f64),
}

impl StopThreshold {
    /// 0 selects `n ln(1e-16)`, NaN disables the check.
    pub fn from_setting(value: f64, dim: usize) -> Self {
        if value.is_nan() {
            StopThreshold::Disabled
        } else if value == 0.0 {
            StopThreshold::LogDet(dim as f64 * 1e-16f64.ln())
        } else {
            StopThreshold::LogDet(value)
        }
    }

    pub fn is_converged(&self, chol: &CholeskyFactor) -> bool {
        match *self {
            StopThreshold::Disabled => false,
            StopThreshold::LogDet(t) => chol.log_det() < t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_from_setting() {
        assert_eq!(StopThreshold::from_setting(f64::NAN, 3), StopThreshold::Disabled);
        assert_eq!(StopThreshold::from_setting(-5.0, 3), StopThreshold::LogDet(-5.0));
        match StopThreshold::from_setting(0.0, 2) {
            StopThreshold::LogDet(t) => assert!((t - 2.0 * -36.841_361_487_904_734).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_identity_check() {
        let chol = CholeskyFactor::identity(2);
        assert!(StopThreshold::LogDet(1.0).is_converged(&chol));
        assert!(!StopThreshold::LogDet(0.0).is_converged(&chol));
        assert!(!StopThreshold::Disabled.is_converged(&chol));
    }
}
