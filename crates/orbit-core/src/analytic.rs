// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — Analytic Reference Fields
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Closed-form field evaluators for validation and benchmarking.
//!
//! These implement the consumed field contracts exactly as an external
//! evaluator would (set-points-then-read, row-major batches), with fields
//! simple enough that orbits have known properties: uniform fields give
//! straight field lines and circular gyro-orbits, the 1/R toroidal field
//! circulates guiding centers, and the large-aspect-ratio Boozer field has
//! an analytic mirror well.

use ndarray::{Array1, Array2};
use orbit_types::error::{TracingError, TracingResult};

use crate::field::{BoozerMagneticField, MagneticField};

fn check_points(points: &Array2<f64>, label: &str) -> TracingResult<usize> {
    if points.ncols() != 3 {
        return Err(TracingError::InvalidArgument(format!(
            "{label} expects [n, 3] points, got {:?}",
            points.dim()
        )));
    }
    if points.iter().any(|v| !v.is_finite()) {
        return Err(TracingError::FieldEvaluator(format!(
            "{label} received non-finite evaluation points"
        )));
    }
    Ok(points.nrows())
}

/// Spatially uniform field with fixed Cartesian components.
#[derive(Debug, Clone)]
pub struct UniformField {
    b0: [f64; 3],
    b: Array2<f64>,
    abs_b: Array1<f64>,
    grad_abs_b: Array2<f64>,
}

impl UniformField {
    pub fn new(b0: [f64; 3]) -> TracingResult<Self> {
        let magnitude = (b0[0] * b0[0] + b0[1] * b0[1] + b0[2] * b0[2]).sqrt();
        if !magnitude.is_finite() || magnitude <= 0.0 {
            return Err(TracingError::InvalidArgument(
                "uniform field components must be finite and non-zero".to_string(),
            ));
        }
        Ok(UniformField {
            b0,
            b: Array2::zeros((0, 3)),
            abs_b: Array1::zeros(0),
            grad_abs_b: Array2::zeros((0, 3)),
        })
    }
}

impl MagneticField for UniformField {
    fn set_points_cyl(&mut self, rphiz: &Array2<f64>) -> TracingResult<()> {
        let n = check_points(rphiz, "UniformField")?;
        let magnitude =
            (self.b0[0] * self.b0[0] + self.b0[1] * self.b0[1] + self.b0[2] * self.b0[2]).sqrt();
        self.b = Array2::from_shape_fn((n, 3), |(_, j)| self.b0[j]);
        self.abs_b = Array1::from_elem(n, magnitude);
        self.grad_abs_b = Array2::zeros((n, 3));
        Ok(())
    }

    fn b(&self) -> &Array2<f64> {
        &self.b
    }

    fn abs_b(&self) -> &Array1<f64> {
        &self.abs_b
    }

    fn grad_abs_b(&self) -> &Array2<f64> {
        &self.grad_abs_b
    }
}

/// Purely toroidal field B = B0 R0 / R in the phi direction.
#[derive(Debug, Clone)]
pub struct ToroidalField {
    b0: f64,
    r0: f64,
    b: Array2<f64>,
    abs_b: Array1<f64>,
    grad_abs_b: Array2<f64>,
}

impl ToroidalField {
    pub fn new(b0: f64, r0: f64) -> TracingResult<Self> {
        if !b0.is_finite() || b0 == 0.0 || !r0.is_finite() || r0 <= 0.0 {
            return Err(TracingError::InvalidArgument(format!(
                "toroidal field requires finite b0 != 0 and r0 > 0, got b0 = {b0}, r0 = {r0}"
            )));
        }
        Ok(ToroidalField {
            b0,
            r0,
            b: Array2::zeros((0, 3)),
            abs_b: Array1::zeros(0),
            grad_abs_b: Array2::zeros((0, 3)),
        })
    }
}

impl MagneticField for ToroidalField {
    fn set_points_cyl(&mut self, rphiz: &Array2<f64>) -> TracingResult<()> {
        let n = check_points(rphiz, "ToroidalField")?;
        let mut b = Array2::zeros((n, 3));
        let mut abs_b = Array1::zeros(n);
        let mut grad = Array2::zeros((n, 3));
        for p in 0..n {
            let r = rphiz[[p, 0]];
            let phi = rphiz[[p, 1]];
            if r <= 0.0 {
                return Err(TracingError::FieldEvaluator(format!(
                    "toroidal field evaluated at R = {r} <= 0"
                )));
            }
            let magnitude = self.b0 * self.r0 / r;
            b[[p, 0]] = -magnitude * phi.sin();
            b[[p, 1]] = magnitude * phi.cos();
            abs_b[p] = magnitude.abs();
            // grad|B| = -(|B|/R) R_hat
            let dabs = -magnitude.abs() / r;
            grad[[p, 0]] = dabs * phi.cos();
            grad[[p, 1]] = dabs * phi.sin();
        }
        self.b = b;
        self.abs_b = abs_b;
        self.grad_abs_b = grad;
        Ok(())
    }

    fn b(&self) -> &Array2<f64> {
        &self.b
    }

    fn abs_b(&self) -> &Array1<f64> {
        &self.abs_b
    }

    fn grad_abs_b(&self) -> &Array2<f64> {
        &self.grad_abs_b
    }
}

/// Large-aspect-ratio Boozer field with an analytic mirror well:
/// |B|(s, theta) = B0 (1 + epsilon s cos theta), constant G and I, K = 0,
/// linear rotational transform iota(s) = iota0 + iota1 s.
#[derive(Debug, Clone)]
pub struct AnalyticBoozerField {
    b0: f64,
    epsilon: f64,
    g0: f64,
    i0: f64,
    iota0: f64,
    iota1: f64,
    psi0: f64,
    mod_b: Array1<f64>,
    g: Array1<f64>,
    i: Array1<f64>,
    k: Array1<f64>,
    iota: Array1<f64>,
    dg_ds: Array1<f64>,
    di_ds: Array1<f64>,
    diota_ds: Array1<f64>,
    mod_b_derivs: Array2<f64>,
    k_derivs: Array2<f64>,
}

impl AnalyticBoozerField {
    pub fn new(
        b0: f64,
        epsilon: f64,
        g0: f64,
        i0: f64,
        iota0: f64,
        iota1: f64,
        psi0: f64,
    ) -> TracingResult<Self> {
        if !b0.is_finite() || b0 <= 0.0 {
            return Err(TracingError::InvalidArgument(format!(
                "b0 must be finite and > 0, got {b0}"
            )));
        }
        if !epsilon.is_finite() || epsilon < 0.0 || epsilon >= 1.0 {
            return Err(TracingError::InvalidArgument(format!(
                "epsilon must be in [0, 1), got {epsilon}"
            )));
        }
        if !g0.is_finite() || g0 == 0.0 {
            return Err(TracingError::InvalidArgument(format!(
                "g0 must be finite and non-zero, got {g0}"
            )));
        }
        if !i0.is_finite() || !iota0.is_finite() || !iota1.is_finite() {
            return Err(TracingError::InvalidArgument(
                "i0, iota0, iota1 must be finite".to_string(),
            ));
        }
        if !psi0.is_finite() || psi0 == 0.0 {
            return Err(TracingError::InvalidArgument(format!(
                "psi0 must be finite and non-zero, got {psi0}"
            )));
        }
        Ok(AnalyticBoozerField {
            b0,
            epsilon,
            g0,
            i0,
            iota0,
            iota1,
            psi0,
            mod_b: Array1::zeros(0),
            g: Array1::zeros(0),
            i: Array1::zeros(0),
            k: Array1::zeros(0),
            iota: Array1::zeros(0),
            dg_ds: Array1::zeros(0),
            di_ds: Array1::zeros(0),
            diota_ds: Array1::zeros(0),
            mod_b_derivs: Array2::zeros((0, 3)),
            k_derivs: Array2::zeros((0, 2)),
        })
    }
}

impl BoozerMagneticField for AnalyticBoozerField {
    fn set_points(&mut self, stz: &Array2<f64>) -> TracingResult<()> {
        let n = check_points(stz, "AnalyticBoozerField")?;
        let mut mod_b = Array1::zeros(n);
        let mut iota = Array1::zeros(n);
        let mut derivs = Array2::zeros((n, 3));
        for p in 0..n {
            let s = stz[[p, 0]];
            let theta = stz[[p, 1]];
            mod_b[p] = self.b0 * (1.0 + self.epsilon * s * theta.cos());
            iota[p] = self.iota0 + self.iota1 * s;
            derivs[[p, 0]] = self.b0 * self.epsilon * theta.cos();
            derivs[[p, 1]] = -self.b0 * self.epsilon * s * theta.sin();
        }
        self.mod_b = mod_b;
        self.iota = iota;
        self.mod_b_derivs = derivs;
        self.g = Array1::from_elem(n, self.g0);
        self.i = Array1::from_elem(n, self.i0);
        self.k = Array1::zeros(n);
        self.dg_ds = Array1::zeros(n);
        self.di_ds = Array1::zeros(n);
        self.diota_ds = Array1::from_elem(n, self.iota1);
        self.k_derivs = Array2::zeros((n, 2));
        Ok(())
    }

    fn psi0(&self) -> f64 {
        self.psi0
    }

    fn mod_b(&self) -> &Array1<f64> {
        &self.mod_b
    }

    fn g(&self) -> &Array1<f64> {
        &self.g
    }

    fn i(&self) -> &Array1<f64> {
        &self.i
    }

    fn k(&self) -> &Array1<f64> {
        &self.k
    }

    fn iota(&self) -> &Array1<f64> {
        &self.iota
    }

    fn dg_ds(&self) -> &Array1<f64> {
        &self.dg_ds
    }

    fn di_ds(&self) -> &Array1<f64> {
        &self.di_ds
    }

    fn diota_ds(&self) -> &Array1<f64> {
        &self.diota_ds
    }

    fn mod_b_derivs(&self) -> &Array2<f64> {
        &self.mod_b_derivs
    }

    fn k_derivs(&self) -> &Array2<f64> {
        &self.k_derivs
    }
}
