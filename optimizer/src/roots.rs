//! Scalar root finding on a sign-changing interval.

use crate::error::RootError;

pub const MAX_ITERATIONS: usize = 1000;

/// Root of `f` in `[a, b]` by Brent's method (inverse quadratic
/// interpolation and secant steps, falling back to bisection).
pub fn brent<F>(mut a: f64, mut b: f64, tol: f64, f: F) -> Result<f64, RootError>
where
    F: Fn(f64) -> f64,
{
    let (mut fa, mut fb) = (f(a), f(b));
    if fa * fb >= 0.0 {
        return Err(RootError::NotBracketed { fa, fb });
    }
    if fa.abs() < fb.abs() {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }
    let (mut c, mut fc) = (a, fa);
    let mut d = 0.0;
    let mut bisected = true;
    let mut it = 0;

    while fb != 0.0 && (b - a).abs() > tol {
        tracing::trace!(it, a, fa, b, fb, "brent");
        it += 1;
        if it == MAX_ITERATIONS {
            return Err(RootError::MaxIterations(it));
        }
        let mut s = if fa != fc && fb != fc {
            a * fb * fc / (fa - fb) / (fa - fc)
                + b * fa * fc / (fb - fa) / (fb - fc)
                + c * fa * fb / (fc - fa) / (fc - fb)
        } else {
            b - fb * (b - a) / (fb - fa)
        };

        let q = (3.0 * a + b) / 4.0;
        let between = (q <= s && s <= b) || (q >= s && s >= b);
        let small_step = if bisected {
            (s - b).abs() < (b - c).abs() / 2.0
        } else {
            (s - b).abs() < (c - d).abs() / 2.0
        };
        if between && small_step {
            bisected = false;
        } else {
            s = (a + b) / 2.0;
            bisected = true;
        }

        let fs = f(s);
        d = c;
        c = b;
        fc = fb;
        if fa * fs < 0.0 {
            b = s;
            fb = fs;
        } else {
            a = s;
            fa = fs;
        }
        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }
    }
    tracing::trace!(it, a, fa, b, fb, "brent done");
    Ok(b)
}

/// Root of `f` in `[a, b]` by plain bisection.
pub fn bisection<F>(mut a: f64, mut b: f64, tol: f64, f: F) -> Result<f64, RootError>
where
    F: Fn(f64) -> f64,
{
    let (mut fa, mut fb) = (f(a), f(b));
    if fa * fb >= 0.0 {
        return Err(RootError::NotBracketed { fa, fb });
    }
    if fa.abs() < fb.abs() {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut it = 0;
    while fb != 0.0 && (b - a).abs() > tol {
        tracing::trace!(it, a, fa, b, fb, "bisection");
        it += 1;
        if it == MAX_ITERATIONS {
            return Err(RootError::MaxIterations(it));
        }
        let s = (a + b) / 2.0;
        let fs = f(s);
        if fa * fs < 0.0 {
            b = s;
            fb = fs;
        } else {
            a = s;
            fa = fs;
        }
        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }
    }
    Ok(b)
}
