//! Box bounds and the bound-enforcement policy shared by sampling and the
//! mean update.
//!
//! Either bound vector may cover only a prefix of the coordinates; the
//! remaining coordinates are unbounded on that side.

use crate::error::ConfigError;

/// Halvings allowed per coordinate before falling back to clamping.
pub const MAX_CONTRACTIONS: u32 = 64;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bounds {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl Bounds {
    pub fn new(min: Vec<f64>, max: Vec<f64>, dim: usize) -> Result<Self, ConfigError> {
        if min.len() > dim {
            return Err(ConfigError::BoundsLength {
                which: "lower",
                len: min.len(),
                dim,
            });
        }
        if max.len() > dim {
            return Err(ConfigError::BoundsLength {
                which: "upper",
                len: max.len(),
                dim,
            });
        }
        for (index, (lo, hi)) in min.iter().zip(max.iter()).enumerate() {
            if !(lo <= hi) {
                return Err(ConfigError::CrossedBounds {
                    index,
                    min: *lo,
                    max: *hi,
                });
            }
        }
        Ok(Self { min, max })
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_empty() && self.max.is_empty()
    }

    fn lower(&self, i: usize) -> Option<f64> {
        self.min.get(i).copied()
    }

    fn upper(&self, i: usize) -> Option<f64> {
        self.max.get(i).copied()
    }

    /// Coordinates at or beyond either bound.
    pub fn count_bounded(&self, x: &[f64]) -> usize {
        x.iter()
            .enumerate()
            .filter(|&(i, &v)| {
                self.lower(i).is_some_and(|lo| v <= lo) || self.upper(i).is_some_and(|hi| v >= hi)
            })
            .count()
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.iter().enumerate().all(|(i, &v)| {
            self.lower(i).map_or(true, |lo| v >= lo) && self.upper(i).map_or(true, |hi| v <= hi)
        })
    }

    /// Clamp every violating coordinate onto its bound.
    pub fn clamp(&self, x: &mut [f64]) -> usize {
        let mut moved = 0;
        for (i, v) in x.iter_mut().enumerate() {
            if let Some(lo) = self.lower(i).filter(|&lo| *v < lo) {
                *v = lo;
                moved += 1;
            } else if let Some(hi) = self.upper(i).filter(|&hi| *v > hi) {
                *v = hi;
                moved += 1;
            }
        }
        moved
    }

    /// Pull `x` back inside the box.
    ///
    /// If at least one coordinate is strictly inside, violators are clamped
    /// to the bound they cross. If every coordinate is on or past a bound,
    /// each violator is instead moved halfway towards `anchor` until it
    /// satisfies its bound, which keeps the direction from `anchor` instead
    /// of collapsing the point onto a corner. Returns the number of
    /// coordinates that were changed.
    pub fn enforce(&self, x: &mut [f64], anchor: &[f64]) -> usize {
        if self.is_empty() {
            return 0;
        }
        let contract = self.count_bounded(x) == x.len();
        let mut moved = 0;
        for i in 0..x.len() {
            if let Some(lo) = self.lower(i) {
                if x[i] < lo {
                    x[i] = if contract {
                        contract_towards(x[i], anchor[i], |v| v < lo, lo)
                    } else {
                        lo
                    };
                    moved += 1;
                }
            }
            if let Some(hi) = self.upper(i) {
                if x[i] > hi {
                    x[i] = if contract {
                        contract_towards(x[i], anchor[i], |v| v > hi, hi)
                    } else {
                        hi
                    };
                    moved += 1;
                }
            }
        }
        moved
    }
}

/// `v`, then successive midpoints between it and `anchor`.
fn midpoints(v: f64, anchor: f64) -> impl Iterator<Item = f64> {
    std::iter::successors(Some(v), move |&m| Some((m + anchor) / 2.0))
}

/// Midpoint contraction of `v` towards `anchor` while `violates(v)`, at most
/// [`MAX_CONTRACTIONS`] times. If `anchor` is itself on or past the bound the
/// halving never reaches the box, so the cap ends it at `bound`.
fn contract_towards(v: f64, anchor: f64, violates: impl Fn(f64) -> bool, bound: f64) -> f64 {
    let inside = midpoints(v, anchor)
        .take(MAX_CONTRACTIONS as usize + 1)
        .find(|&m| !violates(m));
    inside.unwrap_or_else(|| {
        tracing::trace!(value = v, anchor, bound, "midpoint contraction capped, clamping");
        bound
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_violation_clamps_exactly() {
        let b = Bounds::new(vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0], 3).unwrap();
        let mut x = vec![-0.5, 0.5, 3.0];
        let moved = b.enforce(&mut x, &[0.5, 0.5, 0.5]);
        assert_eq!(moved, 2);
        assert_eq!(x, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_full_violation_contracts_towards_anchor() {
        let b = Bounds::new(vec![1.0, 1.0], vec![], 2).unwrap();
        let anchor = [3.0, 2.0];
        let mut x = vec![-5.0, -1.0];
        b.enforce(&mut x, &anchor);
        assert!(x[0] >= 1.0 && x[1] >= 1.0);
        // -5 -> -1 -> 1 (on bound, satisfies).
        assert_eq!(x[0], 1.0);
        // -1 -> 0.5 -> 1.25, strictly inside rather than on the corner.
        assert_eq!(x[1], 1.25);
    }

    #[test]
    fn test_contraction_strictly_approaches_bound() {
        let (lo, anchor) = (1.0, 2.0);
        let steps: Vec<f64> = midpoints(-100.0, anchor)
            .take(MAX_CONTRACTIONS as usize + 1)
            .collect();
        let first_inside = steps.iter().position(|&v| v >= lo).unwrap();
        assert!(first_inside > 0 && first_inside <= MAX_CONTRACTIONS as usize);
        for pair in steps[..first_inside].windows(2) {
            assert!((pair[1] - lo).abs() < (pair[0] - lo).abs(), "{pair:?}");
        }

        let contracted = contract_towards(-100.0, anchor, |v| v < lo, lo);
        assert_eq!(contracted, steps[first_inside]);
        let b = Bounds::new(vec![lo], vec![], 1).unwrap();
        let mut x = vec![-100.0];
        b.enforce(&mut x, &[anchor]);
        assert_eq!(x[0], contracted);
    }

    #[test]
    fn test_anchor_on_bound_terminates() {
        let b = Bounds::new(vec![1.0], vec![5.0], 1).unwrap();
        let mut x = vec![0.5];
        b.enforce(&mut x, &[1.0]);
        assert!(x[0] >= 1.0 && x[0] <= 5.0);

        // Anchor beyond the bound: halving towards it can never succeed.
        let mut y = vec![-3.0];
        b.enforce(&mut y, &[-3.0]);
        assert_eq!(y[0], 1.0);
    }

    #[test]
    fn test_prefix_bounds_leave_tail_free() {
        let b = Bounds::new(vec![0.0], vec![1.0], 3).unwrap();
        let mut x = vec![2.0, -50.0, 50.0];
        b.enforce(&mut x, &[0.5, 0.0, 0.0]);
        assert_eq!(x, vec![1.0, -50.0, 50.0]);
        assert!(b.contains(&x));
    }

    #[test]
    fn test_on_bound_counts_as_bounded() {
        let b = Bounds::new(vec![0.0, 0.0], vec![1.0, 1.0], 2).unwrap();
        assert_eq!(b.count_bounded(&[0.0, 1.0]), 2);
        assert_eq!(b.count_bounded(&[0.5, 1.0]), 1);
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(matches!(
            Bounds::new(vec![0.0, 0.0, 0.0], vec![], 2),
            Err(ConfigError::BoundsLength { which: "lower", .. })
        ));
        assert!(matches!(
            Bounds::new(vec![2.0], vec![1.0], 2),
            Err(ConfigError::CrossedBounds { index: 0, .. })
        ));
    }
}
