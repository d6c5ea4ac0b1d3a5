// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — TOMS 748 Root Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Bracketed root finding after Alefeld, Potra & Shi (ACM TOMS 748).
//!
//! Each iteration attempts inverse cubic interpolation (falling back to
//! Newton steps on the interpolating quadratic), then a double-length
//! secant step, then a bisection safeguard whenever the bracket failed to
//! shrink by the factor mu = 0.5. Convergence is guaranteed for any
//! continuous function with a sign change on the initial interval.

use orbit_types::error::{TracingError, TracingResult};

const MU: f64 = 0.5;

fn converged(a: f64, b: f64, eps: f64) -> bool {
    let width = b - a;
    width <= eps * a.abs().min(b.abs())
        || width <= 2.0 * f64::EPSILON * a.abs().max(b.abs()).max(f64::MIN_POSITIVE)
}

/// Secant step on [a, b], guarded against collapsing onto an endpoint.
fn secant_step(a: f64, b: f64, fa: f64, fb: f64) -> f64 {
    let c = a - (fa / (fb - fa)) * (b - a);
    let tol = 5.0 * f64::EPSILON;
    if c <= a + a.abs() * tol || c >= b - b.abs() * tol {
        0.5 * (a + b)
    } else {
        c
    }
}

/// `count` Newton iterations on the quadratic interpolating
/// (a, fa), (b, fb), (d, fd); falls back to a secant step when the
/// quadratic degenerates or the iterate leaves (a, b).
fn newton_quadratic(a: f64, b: f64, d: f64, fa: f64, fb: f64, fd: f64, count: usize) -> f64 {
    let fab = (fb - fa) / (b - a);
    let fbd = (fd - fb) / (d - b);
    let coeff = (fbd - fab) / (d - a);

    if coeff == 0.0 || !coeff.is_finite() {
        return secant_step(a, b, fa, fb);
    }

    let mut c = if coeff.signum() * fa.signum() > 0.0 { a } else { b };
    for _ in 0..count {
        let p = fa + fab * (c - a) + coeff * (c - a) * (c - b);
        let pd = fab + coeff * (2.0 * c - a - b);
        c -= p / pd;
    }
    if !c.is_finite() || c <= a || c >= b {
        secant_step(a, b, fa, fb)
    } else {
        c
    }
}

/// Inverse cubic interpolation through four points with distinct ordinates.
#[allow(clippy::too_many_arguments)]
fn inverse_cubic(
    a: f64,
    b: f64,
    d: f64,
    e: f64,
    fa: f64,
    fb: f64,
    fd: f64,
    fe: f64,
) -> f64 {
    let q11 = (d - e) * fd / (fe - fd);
    let q21 = (b - d) * fb / (fd - fb);
    let q31 = (a - b) * fa / (fb - fa);
    let d21 = (b - d) * fd / (fd - fb);
    let d31 = (a - b) * fb / (fb - fa);
    let q22 = (d21 - q11) * fb / (fe - fb);
    let q32 = (d31 - q21) * fa / (fd - fa);
    let d32 = (d31 - q21) * fd / (fd - fa);
    let q33 = (d32 - q22) * fa / (fe - fa);
    a + q31 + q32 + q33
}

struct Bracket {
    a: f64,
    b: f64,
    fa: f64,
    fb: f64,
    d: f64,
    fd: f64,
}

impl Bracket {
    /// Insert the trial point c, keeping the sign change between a and b.
    /// The discarded endpoint moves to d. Returns true when c was an exact
    /// root.
    fn insert<F: FnMut(f64) -> f64>(&mut self, f: &mut F, c: f64, evals: &mut usize) -> bool {
        let tol = 2.0 * f64::EPSILON;
        let mut c = c;
        if self.b - self.a < 2.0 * tol * self.a.abs() {
            c = 0.5 * (self.a + self.b);
        } else if c <= self.a + self.a.abs() * tol {
            c = self.a + self.a.abs() * tol;
        } else if c >= self.b - self.b.abs() * tol {
            c = self.b - self.b.abs() * tol;
        }
        if c <= self.a || c >= self.b {
            c = 0.5 * (self.a + self.b);
        }

        let fc = f(c);
        *evals += 1;
        if fc == 0.0 {
            self.a = c;
            self.b = c;
            self.fa = 0.0;
            self.fb = 0.0;
            return true;
        }
        if self.fa.signum() * fc.signum() < 0.0 {
            self.d = self.b;
            self.fd = self.fb;
            self.b = c;
            self.fb = fc;
        } else {
            self.d = self.a;
            self.fd = self.fa;
            self.a = c;
            self.fa = fc;
        }
        false
    }
}

/// Find a root of `f` on the bracket [a, b] with known endpoint values
/// `fa`, `fb` of opposite sign. Returns the final enclosing interval; the
/// caller picks whichever endpoint has the smaller residual.
///
/// `eps` is the relative width tolerance, `max_evals` caps the number of
/// function evaluations.
pub fn toms748<F: FnMut(f64) -> f64>(
    mut f: F,
    a: f64,
    b: f64,
    fa: f64,
    fb: f64,
    eps: f64,
    max_evals: usize,
) -> TracingResult<(f64, f64)> {
    if !(a < b) || !a.is_finite() || !b.is_finite() {
        return Err(TracingError::InvalidArgument(format!(
            "root bracket must satisfy a < b, got [{a}, {b}]"
        )));
    }
    if fa == 0.0 {
        return Ok((a, a));
    }
    if fb == 0.0 {
        return Ok((b, b));
    }
    if fa.signum() * fb.signum() > 0.0 {
        return Err(TracingError::Numeric {
            t: a,
            message: format!("root is not bracketed: f({a}) = {fa}, f({b}) = {fb}"),
        });
    }

    let mut br = Bracket {
        a,
        b,
        fa,
        fb,
        d: 0.0,
        fd: 0.0,
    };
    let mut evals = 0usize;

    // Initial secant step seeds d.
    let c = secant_step(br.a, br.b, br.fa, br.fb);
    if br.insert(&mut f, c, &mut evals) {
        return Ok((br.a, br.b));
    }

    let mut e = f64::NAN;
    let mut fe = f64::NAN;
    let mut first = true;

    while evals < max_evals && !converged(br.a, br.b, eps) {
        let a0 = br.a;
        let b0 = br.b;

        // Sub-step 1: cubic when all four ordinates are distinct.
        let distinct = !first
            && fe.is_finite()
            && br.fa != br.fb
            && br.fa != br.fd
            && br.fa != fe
            && br.fb != br.fd
            && br.fb != fe
            && br.fd != fe;
        let c = if distinct {
            inverse_cubic(br.a, br.b, br.d, e, br.fa, br.fb, br.fd, fe)
        } else {
            newton_quadratic(br.a, br.b, br.d, br.fa, br.fb, br.fd, 2)
        };
        let c = if !c.is_finite() || c <= br.a || c >= br.b {
            newton_quadratic(br.a, br.b, br.d, br.fa, br.fb, br.fd, 2)
        } else {
            c
        };
        first = false;
        e = br.d;
        fe = br.fd;
        if br.insert(&mut f, c, &mut evals) || converged(br.a, br.b, eps) {
            break;
        }

        // Sub-step 2: second interpolation on the updated bracket.
        let distinct = fe.is_finite()
            && br.fa != br.fb
            && br.fa != br.fd
            && br.fa != fe
            && br.fb != br.fd
            && br.fb != fe
            && br.fd != fe;
        let c = if distinct {
            inverse_cubic(br.a, br.b, br.d, e, br.fa, br.fb, br.fd, fe)
        } else {
            newton_quadratic(br.a, br.b, br.d, br.fa, br.fb, br.fd, 3)
        };
        let c = if !c.is_finite() || c <= br.a || c >= br.b {
            newton_quadratic(br.a, br.b, br.d, br.fa, br.fb, br.fd, 3)
        } else {
            c
        };
        if br.insert(&mut f, c, &mut evals) || converged(br.a, br.b, eps) {
            break;
        }

        // Sub-step 3: double-length secant from the better endpoint.
        let (u, fu) = if br.fa.abs() < br.fb.abs() {
            (br.a, br.fa)
        } else {
            (br.b, br.fb)
        };
        let mut c = u - 2.0 * (fu / (br.fb - br.fa)) * (br.b - br.a);
        if (c - u).abs() > 0.5 * (br.b - br.a) {
            c = br.a + 0.5 * (br.b - br.a);
        }
        e = br.d;
        fe = br.fd;
        if br.insert(&mut f, c, &mut evals) || converged(br.a, br.b, eps) {
            break;
        }

        // Sub-step 4: bisect unless the bracket shrank enough.
        if br.b - br.a >= MU * (b0 - a0) {
            e = br.d;
            fe = br.fd;
            let mid = br.a + 0.5 * (br.b - br.a);
            if br.insert(&mut f, mid, &mut evals) {
                break;
            }
        }
    }

    if !converged(br.a, br.b, eps) && br.fa != 0.0 && br.fb != 0.0 && evals >= max_evals {
        return Err(TracingError::Numeric {
            t: 0.5 * (br.a + br.b),
            message: format!(
                "root refinement did not converge within {max_evals} evaluations, bracket [{}, {}]",
                br.a, br.b
            ),
        });
    }
    Ok((br.a, br.b))
}
