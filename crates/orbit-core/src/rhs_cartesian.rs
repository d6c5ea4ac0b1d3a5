// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — Cartesian Right-Hand Sides
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Right-hand sides for traces whose state lives in Cartesian coordinates:
//! field lines, full Lorentz orbits, and the vacuum guiding-center drift.
//!
//! Each evaluation converts the position to cylindrical (R, phi, Z) with
//! phi in [0, 2pi), sets a single point on the field evaluator, and reads
//! the field once.

use ndarray::Array2;
use orbit_types::config::Particle;
use orbit_types::error::TracingResult;
use std::f64::consts::PI;

use crate::field::MagneticField;
use crate::integrate::OrbitRhs;
use orbit_math::dopri5::OdeSystem;

fn cyl_point(buffer: &mut Array2<f64>, x: f64, y: f64, z: f64) {
    buffer[[0, 0]] = (x * x + y * y).sqrt();
    let mut phi = y.atan2(x);
    if phi < 0.0 {
        phi += 2.0 * PI;
    }
    buffer[[0, 1]] = phi;
    buffer[[0, 2]] = z;
}

/// Field-line equation: dy/dt = B(y).
pub struct FieldLineRhs<'a, F: MagneticField> {
    field: &'a mut F,
    rphiz: Array2<f64>,
}

impl<'a, F: MagneticField> FieldLineRhs<'a, F> {
    pub fn new(field: &'a mut F) -> Self {
        FieldLineRhs {
            field,
            rphiz: Array2::zeros((1, 3)),
        }
    }
}

impl<F: MagneticField> OdeSystem<3> for FieldLineRhs<'_, F> {
    fn eval(&mut self, _t: f64, ys: &[f64; 3], dydt: &mut [f64; 3]) -> TracingResult<()> {
        cyl_point(&mut self.rphiz, ys[0], ys[1], ys[2]);
        self.field.set_points_cyl(&self.rphiz)?;
        let b = self.field.b();
        dydt[0] = b[[0, 0]];
        dydt[1] = b[[0, 1]];
        dydt[2] = b[[0, 2]];
        Ok(())
    }
}

impl<F: MagneticField> OrbitRhs<3> for FieldLineRhs<'_, F> {}

/// Full Lorentz orbit: state (x, y, z, vx, vy, vz),
/// dv/dt = (q/m) v x B.
pub struct FullOrbitRhs<'a, F: MagneticField> {
    field: &'a mut F,
    q_over_m: f64,
    rphiz: Array2<f64>,
}

impl<'a, F: MagneticField> FullOrbitRhs<'a, F> {
    pub fn new(field: &'a mut F, particle: &Particle) -> Self {
        FullOrbitRhs {
            field,
            q_over_m: particle.charge_c / particle.mass_kg,
            rphiz: Array2::zeros((1, 3)),
        }
    }
}

impl<F: MagneticField> OdeSystem<6> for FullOrbitRhs<'_, F> {
    fn eval(&mut self, _t: f64, ys: &[f64; 6], dydt: &mut [f64; 6]) -> TracingResult<()> {
        cyl_point(&mut self.rphiz, ys[0], ys[1], ys[2]);
        self.field.set_points_cyl(&self.rphiz)?;
        let b = self.field.b();
        let (bx, by, bz) = (b[[0, 0]], b[[0, 1]], b[[0, 2]]);
        let (vx, vy, vz) = (ys[3], ys[4], ys[5]);
        dydt[0] = vx;
        dydt[1] = vy;
        dydt[2] = vz;
        dydt[3] = self.q_over_m * (vy * bz - vz * by);
        dydt[4] = self.q_over_m * (vz * bx - vx * bz);
        dydt[5] = self.q_over_m * (vx * by - vy * bx);
        Ok(())
    }
}

impl<F: MagneticField> OrbitRhs<6> for FullOrbitRhs<'_, F> {}

/// Vacuum guiding-center drift in Cartesian coordinates: state
/// (x, y, z, v_par) with
///
///   dx/dt    = v_par B/|B| + m (0.5 v_perp^2 + v_par^2) / (q |B|^3) B x grad|B|
///   dv_par/dt = -mu (B . grad|B|) / |B|
///
/// where v_perp^2 = 2 mu |B|.
pub struct GuidingCenterVacuumRhs<'a, F: MagneticField> {
    field: &'a mut F,
    m: f64,
    q: f64,
    mu: f64,
    rphiz: Array2<f64>,
}

impl<'a, F: MagneticField> GuidingCenterVacuumRhs<'a, F> {
    pub fn new(field: &'a mut F, particle: &Particle, mu: f64) -> Self {
        GuidingCenterVacuumRhs {
            field,
            m: particle.mass_kg,
            q: particle.charge_c,
            mu,
            rphiz: Array2::zeros((1, 3)),
        }
    }
}

impl<F: MagneticField> OdeSystem<4> for GuidingCenterVacuumRhs<'_, F> {
    fn eval(&mut self, _t: f64, ys: &[f64; 4], dydt: &mut [f64; 4]) -> TracingResult<()> {
        let v_par = ys[3];
        cyl_point(&mut self.rphiz, ys[0], ys[1], ys[2]);
        self.field.set_points_cyl(&self.rphiz)?;
        let b = self.field.b();
        let grad = self.field.grad_abs_b();
        let abs_b = self.field.abs_b()[0];
        let b_cross_grad = [
            b[[0, 1]] * grad[[0, 2]] - b[[0, 2]] * grad[[0, 1]],
            b[[0, 2]] * grad[[0, 0]] - b[[0, 0]] * grad[[0, 2]],
            b[[0, 0]] * grad[[0, 1]] - b[[0, 1]] * grad[[0, 0]],
        ];
        let v_perp2 = 2.0 * self.mu * abs_b;
        let fak1 = v_par / abs_b;
        let fak2 = self.m / (self.q * abs_b.powi(3)) * (0.5 * v_perp2 + v_par * v_par);
        dydt[0] = fak1 * b[[0, 0]] + fak2 * b_cross_grad[0];
        dydt[1] = fak1 * b[[0, 1]] + fak2 * b_cross_grad[1];
        dydt[2] = fak1 * b[[0, 2]] + fak2 * b_cross_grad[2];
        dydt[3] = -self.mu
            * (b[[0, 0]] * grad[[0, 0]] + b[[0, 1]] * grad[[0, 1]] + b[[0, 2]] * grad[[0, 2]])
            / abs_b;
        Ok(())
    }
}

impl<F: MagneticField> OrbitRhs<4> for GuidingCenterVacuumRhs<'_, F> {}
