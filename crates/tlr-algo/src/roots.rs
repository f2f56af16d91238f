//! Bracketed scalar root finding.
//!
//! Brent's method: bisection safety with inverse-quadratic acceleration,
//! no derivatives. The heat-balance residual changes sign reliably on
//! [T_a, T_a + 200] for physical inputs, so a bracketing method is the
//! right tool; callers treat a failed bracket as a discarded sample.

use tlr_core::{TlrError, TlrResult};

/// Find a root of `f` in [a, b] with |interval| tolerance `tol`.
///
/// Requires f(a) and f(b) to have opposite signs (or either to be an
/// exact root). Returns a `Solver` error when the bracket is invalid or
/// the iteration limit runs out.
pub fn brent<F>(f: F, a: f64, b: f64, tol: f64, max_iter: usize) -> TlrResult<f64>
where
    F: Fn(f64) -> f64,
{
    let mut a = a;
    let mut b = b;
    let mut fa = f(a);
    let mut fb = f(b);

    if !fa.is_finite() || !fb.is_finite() {
        return Err(TlrError::Solver(format!(
            "non-finite bracket values f({a}) = {fa}, f({b}) = {fb}"
        )));
    }
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }
    if fa.signum() == fb.signum() {
        return Err(TlrError::Solver(format!(
            "root not bracketed on [{a}, {b}]: f(a) = {fa:.3e}, f(b) = {fb:.3e}"
        )));
    }

    // Ensure |f(b)| <= |f(a)|: b is the best estimate.
    if fa.abs() < fb.abs() {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }

    let mut c = a;
    let mut fc = fa;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..max_iter {
        if fb.signum() == fc.signum() {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol1 = 2.0 * f64::EPSILON * b.abs() + 0.5 * tol;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol1 || fb == 0.0 {
            return Ok(b);
        }

        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            // Inverse quadratic interpolation (secant when a == c)
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (2.0 * xm * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let min1 = 3.0 * xm * q - (tol1 * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol1 {
            d
        } else {
            tol1.copysign(xm)
        };
        fb = f(b);
        if !fb.is_finite() {
            return Err(TlrError::Solver(format!("non-finite residual at {b}")));
        }
    }

    Err(TlrError::Solver(format!(
        "no convergence within {max_iter} iterations on [{a}, {b}]"
    )))
}
