//! Best-so-far tracking.

/// Index of the lowest non-NaN value, or `None` if every value is NaN.
/// Ties go to the later index.
pub fn best_index(values: impl IntoIterator<Item = (usize, f64)>) -> Option<usize> {
    let mut best = None;
    let mut best_val = f64::INFINITY;
    for (i, v) in values {
        if v.is_nan() {
            continue;
        }
        // `<=` so a generation of +inf values still yields a candidate.
        if v <= best_val {
            best = Some(i);
            best_val = v;
        }
    }
    best
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestTracker {
    forget: bool,
    x: Vec<f64>,
    f: f64,
}

impl BestTracker {
    pub fn new(x0: &[f64], forget: bool) -> Self {
        Self {
            forget,
            x: x0.to_vec(),
            f: f64::INFINITY,
        }
    }

    pub fn forget(&self) -> bool {
        self.forget
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn f(&self) -> f64 {
        self.f
    }

    /// Fold in a generation's best candidate and return what the generation
    /// reports. `fallback` stands in for the location when no candidate
    /// exists (every fitness was NaN).
    pub fn record_generation(&mut self, candidate: Option<(&[f64], f64)>, fallback: &[f64]) -> (Vec<f64>, f64) {
        if self.forget {
            return match candidate {
                Some((x, f)) => (x.to_vec(), f),
                None => (fallback.to_vec(), f64::NAN),
            };
        }
        self.improve(candidate);
        (self.x.clone(), self.f)
    }

    /// Replace the running best if `candidate` is strictly better.
    pub fn improve(&mut self, candidate: Option<(&[f64], f64)>) -> bool {
        match candidate {
            Some((x, f)) if f < self.f => {
                self.f = f;
                self.x.clear();
                self.x.extend_from_slice(x);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_index_skips_nan() {
        let vals = [3.0, f64::NAN, 1.0, 2.0];
        assert_eq!(best_index(vals.iter().copied().enumerate()), Some(2));
        assert_eq!(best_index([f64::NAN, f64::NAN].into_iter().enumerate()), None);
        assert_eq!(
            best_index([f64::INFINITY, f64::NAN].into_iter().enumerate()),
            Some(0)
        );
    }

    #[test]
    fn test_running_best_never_worsens() {
        let mut t = BestTracker::new(&[0.0], false);
        assert_eq!(t.record_generation(Some((&[1.0], 5.0)), &[0.0]), (vec![1.0], 5.0));
        assert_eq!(t.record_generation(Some((&[2.0], 7.0)), &[0.0]), (vec![1.0], 5.0));
        assert_eq!(t.record_generation(None, &[0.0]), (vec![1.0], 5.0));
        assert_eq!(t.record_generation(Some((&[3.0], 4.0)), &[0.0]), (vec![3.0], 4.0));
    }

    #[test]
    fn test_forget_reports_generation_best() {
        let mut t = BestTracker::new(&[0.0], true);
        assert_eq!(t.record_generation(Some((&[1.0], 5.0)), &[0.0]).1, 5.0);
        assert_eq!(t.record_generation(Some((&[2.0], 7.0)), &[0.0]).1, 7.0);
        let (x, f) = t.record_generation(None, &[9.0]);
        assert!(f.is_nan());
        assert_eq!(x, vec![9.0]);
    }
}
