//! Derivative-free local minimization: downhill bracketing, Brent's 1-D
//! minimizer, and the modified Powell direction-set method built on them.

use serde::Serialize;

use crate::error::PowellError;

/// Golden ratio, `(1 + √5) / 2`.
const GOLD: f64 = 1.618034;
const TINY: f64 = 1e-21;

/// Three points with `f(b) < f(a)` and `f(b) < f(c)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub fa: f64,
    pub fb: f64,
    pub fc: f64,
    pub calls: usize,
}

/// Search downhill from `xa`, `xb` until the minimum is bracketed, growing
/// the step by the golden ratio with parabolic extrapolation.
pub fn bracket<F>(f: F, xa: f64, xb: f64) -> Result<Bracket, PowellError>
where
    F: Fn(f64) -> f64,
{
    bracket_with(f, xa, xb, 110.0, 1000)
}

pub fn bracket_with<F>(f: F, xa: f64, xb: f64, grow_limit: f64, max_iter: usize) -> Result<Bracket, PowellError>
where
    F: Fn(f64) -> f64,
{
    let (mut xa, mut xb) = (xa, xb);
    let (mut fa, mut fb) = (f(xa), f(xb));
    if fa < fb {
        std::mem::swap(&mut xa, &mut xb);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut xc = xb + GOLD * (xb - xa);
    let mut fc = f(xc);
    let mut calls = 3;
    let mut iter = 0;
    while fc < fb {
        let tmp1 = (xb - xa) * (fb - fc);
        let tmp2 = (xb - xc) * (fb - fa);
        let val = tmp2 - tmp1;
        let denom = if val.abs() < TINY { 2.0 * TINY } else { 2.0 * val };
        let mut w = xb - ((xb - xc) * tmp2 - (xb - xa) * tmp1) / denom;
        let wlim = xb + grow_limit * (xc - xb);
        if iter > max_iter {
            return Err(PowellError::BracketIterations(iter));
        }
        iter += 1;
        let fw;
        if (w - xc) * (xb - w) > 0.0 {
            // Parabolic minimum between b and c.
            let fw_in = f(w);
            calls += 1;
            if fw_in < fc {
                return Ok(Bracket {
                    a: xb,
                    b: w,
                    c: xc,
                    fa: fb,
                    fb: fw_in,
                    fc,
                    calls,
                });
            } else if fw_in > fb {
                return Ok(Bracket {
                    a: xa,
                    b: xb,
                    c: w,
                    fa,
                    fb,
                    fc: fw_in,
                    calls,
                });
            }
            w = xc + GOLD * (xc - xb);
            fw = f(w);
            calls += 1;
        } else if (w - wlim) * (wlim - xc) >= 0.0 {
            w = wlim;
            fw = f(w);
            calls += 1;
        } else if (w - wlim) * (xc - w) > 0.0 {
            let fw_in = f(w);
            calls += 1;
            if fw_in < fc {
                xb = xc;
                xc = w;
                w = xc + GOLD * (xc - xb);
                fb = fc;
                fc = fw_in;
                fw = f(w);
                calls += 1;
            } else {
                fw = fw_in;
            }
        } else {
            w = xc + GOLD * (xc - xb);
            fw = f(w);
            calls += 1;
        }
        xa = xb;
        xb = xc;
        xc = w;
        fa = fb;
        fb = fc;
        fc = fw;
    }
    Ok(Bracket {
        a: xa,
        b: xb,
        c: xc,
        fa,
        fb,
        fc,
        calls,
    })
}

/// Where [`BrentMinimizer`] starts looking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Start {
    /// Bracket downhill from (0, 1).
    Default,
    /// Bracket downhill from the two points.
    Pair(f64, f64),
    /// A ready-made bracket; `f` at the middle point must be lowest.
    Triple(f64, f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMinimum {
    pub x: f64,
    pub f: f64,
    pub iterations: usize,
    pub calls: usize,
}

/// Brent's method for 1-D minimization inside a bracket.
#[derive(Debug, Clone, Copy)]
pub struct BrentMinimizer {
    pub tol: f64,
    pub max_iter: usize,
    pub start: Start,
    mintol: f64,
    cg: f64,
}

impl Default for BrentMinimizer {
    fn default() -> Self {
        Self::new(1.48e-8, 500)
    }
}

impl BrentMinimizer {
    pub fn new(tol: f64, max_iter: usize) -> Self {
        Self {
            tol,
            max_iter,
            start: Start::Default,
            mintol: 1.0e-11,
            cg: 0.3819660,
        }
    }

    pub fn with_start(mut self, start: Start) -> Self {
        self.start = start;
        self
    }

    fn initial_bracket<F: Fn(f64) -> f64>(&self, f: &F) -> Result<Bracket, PowellError> {
        match self.start {
            Start::Default => bracket(f, 0.0, 1.0),
            Start::Pair(a, b) => bracket(f, a, b),
            Start::Triple(a, b, c) => {
                let (a, c) = if a > c { (c, a) } else { (a, c) };
                let (fa, fb, fc) = (f(a), f(b), f(c));
                if !(fb < fa && fb < fc) {
                    return Err(PowellError::NotBracketing { a, b, c });
                }
                Ok(Bracket {
                    a,
                    b,
                    c,
                    fa,
                    fb,
                    fc,
                    calls: 3,
                })
            }
        }
    }

    pub fn minimize<F>(&self, f: F) -> Result<LineMinimum, PowellError>
    where
        F: Fn(f64) -> f64,
    {
        let br = self.initial_bracket(&f)?;
        let mut calls = br.calls;
        let (mut x, mut w, mut v) = (br.b, br.b, br.b);
        let mut fx = br.fb;
        let (mut fw, mut fv) = (fx, fx);
        let (mut a, mut b) = if br.a < br.c { (br.a, br.c) } else { (br.c, br.a) };
        let mut deltax: f64 = 0.0;
        let mut rat: f64 = 0.0;
        let mut iter = 0;

        while iter < self.max_iter {
            let tol1 = self.tol * x.abs() + self.mintol;
            let tol2 = 2.0 * tol1;
            let xmid = 0.5 * (a + b);
            if (x - xmid).abs() < tol2 - 0.5 * (b - a) {
                break;
            }
            if deltax.abs() <= tol1 {
                // Golden section step
                deltax = if x >= xmid { a - x } else { b - x };
                rat = self.cg * deltax;
            } else {
                // Parabolic step
                let tmp1 = (x - w) * (fx - fv);
                let mut tmp2 = (x - v) * (fx - fw);
                let mut p = (x - v) * tmp2 - (x - w) * tmp1;
                tmp2 = 2.0 * (tmp2 - tmp1);
                if tmp2 > 0.0 {
                    p = -p;
                }
                tmp2 = tmp2.abs();
                let dx_prev = deltax;
                deltax = rat;
                if p > tmp2 * (a - x) && p < tmp2 * (b - x) && p.abs() < (0.5 * tmp2 * dx_prev).abs() {
                    rat = p / tmp2;
                    let u = x + rat;
                    if (u - a) < tol2 || (b - u) < tol2 {
                        rat = if xmid - x >= 0.0 { tol1 } else { -tol1 };
                    }
                } else {
                    deltax = if x >= xmid { a - x } else { b - x };
                    rat = self.cg * deltax;
                }
            }
            // Move by at least tol1.
            let u = if rat.abs() < tol1 {
                if rat >= 0.0 {
                    x + tol1
                } else {
                    x - tol1
                }
            } else {
                x + rat
            };
            let fu = f(u);
            calls += 1;

            if fu > fx {
                if u < x {
                    a = u;
                } else {
                    b = u;
                }
                if fu <= fw || w == x {
                    v = w;
                    w = u;
                    fv = fw;
                    fw = fu;
                } else if fu <= fv || v == x || v == w {
                    v = u;
                    fv = fu;
                }
            } else {
                if u >= x {
                    a = x;
                } else {
                    b = x;
                }
                v = w;
                w = x;
                x = u;
                fv = fw;
                fw = fx;
                fx = fu;
            }
            iter += 1;
        }
        Ok(LineMinimum {
            x,
            f: fx,
            iterations: iter,
            calls,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PowellStatus {
    Converged,
    MaxEvaluations,
    MaxIterations,
}

#[derive(Debug, Clone, Serialize)]
pub struct PowellResult {
    pub x: Vec<f64>,
    pub f: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub status: PowellStatus,
}

/// Modified Powell direction-set method.
///
/// `max_iter` and `max_fev` of 0 mean unset; with both unset each defaults
/// to `1000 n`.
#[derive(Debug, Clone, Copy)]
pub struct PowellMinimizer {
    pub xtol: f64,
    pub ftol: f64,
    pub max_iter: usize,
    pub max_fev: usize,
}

impl Default for PowellMinimizer {
    fn default() -> Self {
        Self {
            xtol: 1e-4,
            ftol: 1e-4,
            max_iter: 0,
            max_fev: 0,
        }
    }
}

impl PowellMinimizer {
    fn limits(&self, n: usize) -> (usize, usize) {
        match (self.max_iter, self.max_fev) {
            (0, 0) => (1000 * n, 1000 * n),
            (0, fev) => (usize::MAX, fev),
            (iter, 0) => (iter, usize::MAX),
            (iter, fev) => (iter, fev),
        }
    }

    pub fn minimize<F>(&self, f: F, x0: &[f64]) -> Result<PowellResult, PowellError>
    where
        F: Fn(&[f64]) -> f64,
    {
        self.minimize_with_callback(f, x0, |_| {})
    }

    /// As [`PowellMinimizer::minimize`], calling `callback` with the current
    /// point after every iteration.
    pub fn minimize_with_callback<F, C>(&self, f: F, x0: &[f64], mut callback: C) -> Result<PowellResult, PowellError>
    where
        F: Fn(&[f64]) -> f64,
        C: FnMut(&[f64]),
    {
        let n = x0.len();
        let (max_iter, max_fev) = self.limits(n);
        let calls = std::cell::Cell::new(0usize);
        let fun = |x: &[f64]| {
            calls.set(calls.get() + 1);
            f(x)
        };

        // One row per search direction, starting from the unit vectors.
        let mut direc: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let mut d = vec![0.0; n];
                d[i] = 1.0;
                d
            })
            .collect();
        let mut x = x0.to_vec();
        let mut x1 = x.clone();
        let mut fval = fun(&x);
        let mut iter = 0;

        loop {
            let fx = fval;
            let mut bigind = 0;
            let mut delta = 0.0;
            for (i, dir) in direc.iter_mut().enumerate() {
                let fx2 = fval;
                fval = line_search(&fun, &mut x, dir, self.xtol * 100.0)?;
                if fx2 - fval > delta {
                    delta = fx2 - fval;
                    bigind = i;
                }
            }
            iter += 1;
            callback(&x);
            tracing::trace!(iter, f = fval, evaluations = calls.get(), "powell iteration");

            let bnd = self.ftol * (fx.abs() + fval.abs()) + 1e-20;
            if 2.0 * (fx - fval) <= bnd || calls.get() >= max_fev || iter >= max_iter {
                break;
            }

            // Extrapolate along the net displacement of this iteration.
            let mut dir1: Vec<f64> = x.iter().zip(&x1).map(|(xi, x1i)| xi - x1i).collect();
            let x2: Vec<f64> = x.iter().zip(&x1).map(|(xi, x1i)| 2.0 * xi - x1i).collect();
            x1.clone_from(&x);
            let fx2 = fun(&x2);

            if fx > fx2 {
                let mut t = 2.0 * (fx + fx2 - 2.0 * fval);
                let temp = fx - fval - delta;
                t *= temp * temp;
                let temp = fx - fx2;
                t -= delta * temp * temp;
                if t < 0.0 {
                    fval = line_search(&fun, &mut x, &mut dir1, self.xtol * 100.0)?;
                    // Replace the direction of largest decrease.
                    direc[bigind] = direc[n - 1].clone();
                    direc[n - 1] = dir1;
                }
            }
        }

        let evaluations = calls.get();
        let status = if evaluations >= max_fev {
            PowellStatus::MaxEvaluations
        } else if iter >= max_iter {
            PowellStatus::MaxIterations
        } else {
            PowellStatus::Converged
        };
        if status != PowellStatus::Converged {
            tracing::warn!(?status, iterations = iter, evaluations, "powell stopped on a limit");
        } else {
            tracing::debug!(f = fval, iterations = iter, evaluations, "powell converged");
        }
        Ok(PowellResult {
            x,
            f: fval,
            iterations: iter,
            evaluations,
            status,
        })
    }
}

/// Minimize `f(p + α d)` over α, then move `p` to the minimum and scale `d`
/// to the step taken. Returns the new function value.
fn line_search<F>(f: &F, p: &mut [f64], d: &mut [f64], tol: f64) -> Result<f64, PowellError>
where
    F: Fn(&[f64]) -> f64,
{
    let along = |alpha: f64| {
        let x: Vec<f64> = p.iter().zip(d.iter()).map(|(pi, di)| pi + alpha * di).collect();
        f(&x)
    };
    let min = BrentMinimizer::new(tol, 500).minimize(along)?;
    for (pi, di) in p.iter_mut().zip(d.iter_mut()) {
        *di *= min.x;
        *pi += *di;
    }
    Ok(min.f)
}
