//! Benchmark objectives a worker can evaluate, looked up by name.

use std::f64::consts::{E, PI};

pub type Objective = fn(&[f64]) -> f64;

/// Registry lookup; names are case-sensitive.
pub fn get_objective(name: &str) -> Option<Objective> {
    match name {
        "sphere" => Some(sphere),
        "rosenbrock" => Some(rosenbrock),
        "rastrigin" => Some(rastrigin),
        "ellipsoid" => Some(ellipsoid),
        "ackley" => Some(ackley),
        _ => None,
    }
}

/// Evaluate `name` at `x`. Unknown names evaluate to NaN, which the
/// optimizer ranks last, so the task is still answered.
pub fn evaluate(name: &str, x: &[f64]) -> f64 {
    match get_objective(name) {
        Some(f) => f(x),
        None => {
            tracing::warn!(objective = %name, "Unknown objective, reporting NaN");
            f64::NAN
        }
    }
}

pub fn sphere(x: &[f64]) -> f64 {
    x.iter().map(|v| v * v).sum()
}

pub fn rosenbrock(x: &[f64]) -> f64 {
    x.windows(2)
        .map(|w| 100.0 * (w[1] - w[0] * w[0]).powi(2) + (1.0 - w[0]).powi(2))
        .sum()
}

pub fn rastrigin(x: &[f64]) -> f64 {
    10.0 * x.len() as f64
        + x.iter()
            .map(|v| v * v - 10.0 * (2.0 * PI * v).cos())
            .sum::<f64>()
}

/// Axis-parallel ellipsoid with condition number 1e6.
pub fn ellipsoid(x: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 {
        return sphere(x);
    }
    x.iter()
        .enumerate()
        .map(|(i, v)| 10f64.powf(6.0 * i as f64 / (n - 1) as f64) * v * v)
        .sum()
}

pub fn ackley(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let n = x.len() as f64;
    let sq = x.iter().map(|v| v * v).sum::<f64>() / n;
    let cos = x.iter().map(|v| (2.0 * PI * v).cos()).sum::<f64>() / n;
    -20.0 * (-0.2 * sq.sqrt()).exp() - cos.exp() + 20.0 + E
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minima() {
        assert_eq!(sphere(&[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(rosenbrock(&[1.0, 1.0, 1.0]), 0.0);
        assert!(rastrigin(&[0.0, 0.0]).abs() < 1e-12);
        assert_eq!(ellipsoid(&[0.0, 0.0]), 0.0);
        assert!(ackley(&[0.0, 0.0]).abs() < 1e-12);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(sphere(&[10.0, 20.0]), 500.0);
        // 100 * (1 - 0)^2 + (1 - 0)^2
        assert_eq!(rosenbrock(&[0.0, 1.0]), 101.0);
        // Weights 1, 1e3, 1e6 across three coordinates.
        assert!((ellipsoid(&[1.0, 1.0, 1.0]) - 1_001_001.0).abs() < 1e-6);
        assert!((rastrigin(&[1.0]) - 1.0).abs() < 1e-12);
        assert!(ackley(&[1.0, 1.0]) > 0.0);
    }

    #[test]
    fn test_registry() {
        for name in ["sphere", "rosenbrock", "rastrigin", "ellipsoid", "ackley"] {
            assert!(get_objective(name).is_some(), "{name}");
        }
        assert!(get_objective("Sphere").is_none());
        assert_eq!(evaluate("sphere", &[3.0, 4.0]), 25.0);
        assert!(evaluate("no-such-function", &[1.0]).is_nan());
    }
}
