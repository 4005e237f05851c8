//! Fixed strategy parameters, derived once from the dimension and population.
//!
//! Values follow Hansen's tutorial (arXiv:1604.00772).

/// `4 + floor(3 ln n)`.
pub fn default_population(n: usize) -> usize {
    4 + (3.0 * (n as f64).ln()) as usize
}

#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub dim: usize,
    /// λ
    pub population: usize,
    /// μ, number of elite samples used for recombination
    pub mu: usize,
    /// Recombination weights, best first, summing to 1
    pub weights: Vec<f64>,
    /// Variance-effective selection mass
    pub mu_eff: f64,
    pub cc: f64,
    pub cs: f64,
    pub c1: f64,
    pub cmu: f64,
    /// Step-size damping
    pub ds: f64,
    /// E‖N(0, I)‖
    pub e_chi: f64,
}

impl Params {
    /// `population == 0` selects [`default_population`].
    pub fn new(dim: usize, population: usize) -> Self {
        let lam = if population == 0 {
            default_population(dim)
        } else {
            population
        };
        let mu = (lam / 2).max(1);
        let n = dim as f64;

        // Weights (log-scale, normalized)
        let raw_w: Vec<f64> = (0..mu)
            .map(|i| (mu as f64 + 0.5).ln() - ((i + 1) as f64).ln())
            .collect();
        let sum_w: f64 = raw_w.iter().sum();
        let weights: Vec<f64> = raw_w.iter().map(|w| w / sum_w).collect();
        let mu_eff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        let cc = (4.0 + mu_eff / n) / (n + 4.0 + 2.0 * mu_eff / n);
        let cs = (mu_eff + 2.0) / (n + mu_eff + 5.0);
        let c1 = 2.0 / ((n + 1.3).powi(2) + mu_eff);
        let cmu = (1.0 - c1).min(2.0 * (mu_eff - 2.0 + 1.0 / mu_eff) / ((n + 2.0).powi(2) + mu_eff));
        let ds = 1.0 + 2.0 * (((mu_eff - 1.0) / (n + 1.0)).sqrt() - 1.0).max(0.0) + cs;
        let e_chi = n.sqrt() * (1.0 - 1.0 / (4.0 * n) + 1.0 / (21.0 * n * n));

        Params {
            dim,
            population: lam,
            mu,
            weights,
            mu_eff,
            cc,
            cs,
            c1,
            cmu,
            ds,
            e_chi,
        }
    }

    /// Factor applied to the covariance before the rank-one and rank-μ terms.
    pub fn covariance_decay(&self) -> f64 {
        1.0 - self.c1 - self.cmu
    }
}
