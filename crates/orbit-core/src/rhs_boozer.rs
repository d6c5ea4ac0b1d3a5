// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — Boozer Right-Hand Sides
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Guiding-center right-hand sides in Boozer coordinates (s, theta, zeta).
//!
//! Three physics variants share the state (y0, y1, zeta, v_par):
//!
//! - vacuum (G only):
//!     ds/dt     = -|B|_theta m (v_par^2/|B| + mu) / (q psi0)
//!     dtheta/dt =  |B|_s m (v_par^2/|B| + mu) / (q psi0) + iota v_par |B| / G
//!     dzeta/dt  =  v_par |B| / G
//!     dv_par/dt = -(iota |B|_theta + |B|_zeta) mu |B| / G
//!
//! - NoK (K = 0 with finite I), from the drift Lagrangian with
//!     D = ((q + m v_par I'/|B|) G - (-q iota + m v_par G'/|B|) I) / iota
//!
//! - full, with the K corrections
//!     C = -m v_par (K_zeta - G') / |B| - q iota
//!     F = -m v_par (K_theta - I') / |B| + q
//!     D = (F G - C I) / iota
//!
//! where primes denote d/dpsi = d/ds / psi0. The perturbed variants extend
//! the state with a time component (dy4/dt = 1) and add a single-mode
//! electrostatic potential Phi = Phihat sin(m theta - n zeta + omega t +
//! phase) through the alpha terms of the perturbed Lagrangian.
//!
//! The first two state components are expressed in the selected chart; the
//! canonical (s, theta) pair is recovered before the field call and the
//! (sdot, thetadot) pair is pushed through the chart Jacobian afterwards.

use ndarray::Array2;
use orbit_types::config::{ChartKind, Particle, Perturbation};
use orbit_types::error::TracingResult;

use crate::chart::{push_flux_velocity, to_canonical};
use crate::field::BoozerMagneticField;
use crate::integrate::OrbitRhs;
use orbit_math::dopri5::OdeSystem;

/// Vacuum guiding-center motion, size-4 state.
pub struct GuidingCenterVacuumBoozerRhs<'a, F: BoozerMagneticField> {
    field: &'a mut F,
    m: f64,
    q: f64,
    mu: f64,
    chart: ChartKind,
    stz: Array2<f64>,
}

impl<'a, F: BoozerMagneticField> GuidingCenterVacuumBoozerRhs<'a, F> {
    pub fn new(field: &'a mut F, particle: &Particle, mu: f64, chart: ChartKind) -> Self {
        GuidingCenterVacuumBoozerRhs {
            field,
            m: particle.mass_kg,
            q: particle.charge_c,
            mu,
            chart,
            stz: Array2::zeros((1, 3)),
        }
    }
}

impl<F: BoozerMagneticField> OdeSystem<4> for GuidingCenterVacuumBoozerRhs<'_, F> {
    fn eval(&mut self, _t: f64, ys: &[f64; 4], dydt: &mut [f64; 4]) -> TracingResult<()> {
        let v_par = ys[3];
        let (s, theta) = to_canonical(self.chart, ys[0], ys[1]);
        self.stz[[0, 0]] = s;
        self.stz[[0, 1]] = theta;
        self.stz[[0, 2]] = ys[2];
        self.field.set_points(&self.stz)?;

        let psi0 = self.field.psi0();
        let mod_b = self.field.mod_b()[0];
        let g = self.field.g()[0];
        let iota = self.field.iota()[0];
        let derivs = self.field.mod_b_derivs();
        let dmodb_ds = derivs[[0, 0]];
        let dmodb_dtheta = derivs[[0, 1]];
        let dmodb_dzeta = derivs[[0, 2]];

        let fak1 = self.m * v_par * v_par / mod_b + self.m * self.mu;
        let sdot = -dmodb_dtheta * fak1 / (self.q * psi0);
        let tdot = dmodb_ds * fak1 / (self.q * psi0) + iota * v_par * mod_b / g;

        let (dy0, dy1) = push_flux_velocity(self.chart, s, theta, sdot, tdot);
        dydt[0] = dy0;
        dydt[1] = dy1;
        dydt[2] = v_par * mod_b / g;
        dydt[3] = -(iota * dmodb_dtheta + dmodb_dzeta) * self.mu * mod_b / g;
        Ok(())
    }
}

impl<F: BoozerMagneticField> OrbitRhs<4> for GuidingCenterVacuumBoozerRhs<'_, F> {
    fn chart(&self) -> ChartKind {
        self.chart
    }
}

/// K = 0 guiding-center motion with finite I, size-4 state.
pub struct GuidingCenterNoKBoozerRhs<'a, F: BoozerMagneticField> {
    field: &'a mut F,
    m: f64,
    q: f64,
    mu: f64,
    chart: ChartKind,
    stz: Array2<f64>,
}

impl<'a, F: BoozerMagneticField> GuidingCenterNoKBoozerRhs<'a, F> {
    pub fn new(field: &'a mut F, particle: &Particle, mu: f64, chart: ChartKind) -> Self {
        GuidingCenterNoKBoozerRhs {
            field,
            m: particle.mass_kg,
            q: particle.charge_c,
            mu,
            chart,
            stz: Array2::zeros((1, 3)),
        }
    }
}

impl<F: BoozerMagneticField> OdeSystem<4> for GuidingCenterNoKBoozerRhs<'_, F> {
    fn eval(&mut self, _t: f64, ys: &[f64; 4], dydt: &mut [f64; 4]) -> TracingResult<()> {
        let v_par = ys[3];
        let (s, theta) = to_canonical(self.chart, ys[0], ys[1]);
        self.stz[[0, 0]] = s;
        self.stz[[0, 1]] = theta;
        self.stz[[0, 2]] = ys[2];
        self.field.set_points(&self.stz)?;

        let psi0 = self.field.psi0();
        let mod_b = self.field.mod_b()[0];
        let g = self.field.g()[0];
        let i = self.field.i()[0];
        let dg_dpsi = self.field.dg_ds()[0] / psi0;
        let di_dpsi = self.field.di_ds()[0] / psi0;
        let iota = self.field.iota()[0];
        let derivs = self.field.mod_b_derivs();
        let dmodb_dpsi = derivs[[0, 0]] / psi0;
        let dmodb_dtheta = derivs[[0, 1]];
        let dmodb_dzeta = derivs[[0, 2]];

        let (m, q, mu) = (self.m, self.q, self.mu);
        let fak1 = m * v_par * v_par / mod_b + m * mu;
        let d = ((q + m * v_par * di_dpsi / mod_b) * g
            - (-q * iota + m * v_par * dg_dpsi / mod_b) * i)
            / iota;

        let sdot = (i * dmodb_dzeta - g * dmodb_dtheta) * fak1 / (d * iota * psi0);
        let tdot = (g * dmodb_dpsi * fak1
            - (-q * iota + m * v_par * dg_dpsi / mod_b) * v_par * mod_b)
            / (d * iota);

        let (dy0, dy1) = push_flux_velocity(self.chart, s, theta, sdot, tdot);
        dydt[0] = dy0;
        dydt[1] = dy1;
        dydt[2] = ((q + m * v_par * di_dpsi / mod_b) * v_par * mod_b - dmodb_dpsi * fak1 * i)
            / (d * iota);
        dydt[3] = -(mu / v_par)
            * (dmodb_dpsi * sdot * psi0 + dmodb_dtheta * tdot + dmodb_dzeta * dydt[2]);
        Ok(())
    }
}

impl<F: BoozerMagneticField> OrbitRhs<4> for GuidingCenterNoKBoozerRhs<'_, F> {
    fn chart(&self) -> ChartKind {
        self.chart
    }
}

/// Full guiding-center motion with all three covariant components, size-4
/// state.
pub struct GuidingCenterBoozerRhs<'a, F: BoozerMagneticField> {
    field: &'a mut F,
    m: f64,
    q: f64,
    mu: f64,
    chart: ChartKind,
    stz: Array2<f64>,
}

impl<'a, F: BoozerMagneticField> GuidingCenterBoozerRhs<'a, F> {
    pub fn new(field: &'a mut F, particle: &Particle, mu: f64, chart: ChartKind) -> Self {
        GuidingCenterBoozerRhs {
            field,
            m: particle.mass_kg,
            q: particle.charge_c,
            mu,
            chart,
            stz: Array2::zeros((1, 3)),
        }
    }
}

impl<F: BoozerMagneticField> OdeSystem<4> for GuidingCenterBoozerRhs<'_, F> {
    fn eval(&mut self, _t: f64, ys: &[f64; 4], dydt: &mut [f64; 4]) -> TracingResult<()> {
        let v_par = ys[3];
        let (s, theta) = to_canonical(self.chart, ys[0], ys[1]);
        self.stz[[0, 0]] = s;
        self.stz[[0, 1]] = theta;
        self.stz[[0, 2]] = ys[2];
        self.field.set_points(&self.stz)?;

        let psi0 = self.field.psi0();
        let mod_b = self.field.mod_b()[0];
        let k = self.field.k()[0];
        let k_derivs = self.field.k_derivs();
        let dk_dtheta = k_derivs[[0, 0]];
        let dk_dzeta = k_derivs[[0, 1]];
        let g = self.field.g()[0];
        let i = self.field.i()[0];
        let dg_dpsi = self.field.dg_ds()[0] / psi0;
        let di_dpsi = self.field.di_ds()[0] / psi0;
        let iota = self.field.iota()[0];
        let derivs = self.field.mod_b_derivs();
        let dmodb_dpsi = derivs[[0, 0]] / psi0;
        let dmodb_dtheta = derivs[[0, 1]];
        let dmodb_dzeta = derivs[[0, 2]];

        let (m, q, mu) = (self.m, self.q, self.mu);
        let fak1 = m * v_par * v_par / mod_b + m * mu;
        let c = -m * v_par * (dk_dzeta - dg_dpsi) / mod_b - q * iota;
        let f = -m * v_par * (dk_dtheta - di_dpsi) / mod_b + q;
        let d = (f * g - c * i) / iota;

        let sdot = (i * dmodb_dzeta - g * dmodb_dtheta) * fak1 / (d * iota * psi0);
        let tdot =
            (g * dmodb_dpsi * fak1 - c * v_par * mod_b - k * fak1 * dmodb_dzeta) / (d * iota);

        let (dy0, dy1) = push_flux_velocity(self.chart, s, theta, sdot, tdot);
        dydt[0] = dy0;
        dydt[1] = dy1;
        dydt[2] =
            (f * v_par * mod_b - dmodb_dpsi * fak1 * i + k * fak1 * dmodb_dtheta) / (d * iota);
        dydt[3] = -(mu / v_par)
            * (dmodb_dpsi * sdot * psi0 + dmodb_dtheta * tdot + dmodb_dzeta * dydt[2]);
        Ok(())
    }
}

impl<F: BoozerMagneticField> OrbitRhs<4> for GuidingCenterBoozerRhs<'_, F> {
    fn chart(&self) -> ChartKind {
        self.chart
    }
}

/// Vacuum guiding-center motion with a single-mode electrostatic
/// perturbation, size-5 state (the fifth component is integration time).
pub struct GuidingCenterVacuumBoozerPerturbedRhs<'a, F: BoozerMagneticField> {
    field: &'a mut F,
    m: f64,
    q: f64,
    mu: f64,
    perturbation: Perturbation,
    chart: ChartKind,
    stz: Array2<f64>,
}

impl<'a, F: BoozerMagneticField> GuidingCenterVacuumBoozerPerturbedRhs<'a, F> {
    pub fn new(
        field: &'a mut F,
        particle: &Particle,
        mu: f64,
        perturbation: Perturbation,
        chart: ChartKind,
    ) -> Self {
        GuidingCenterVacuumBoozerPerturbedRhs {
            field,
            m: particle.mass_kg,
            q: particle.charge_c,
            mu,
            perturbation,
            chart,
            stz: Array2::zeros((1, 3)),
        }
    }
}

impl<F: BoozerMagneticField> OdeSystem<5> for GuidingCenterVacuumBoozerPerturbedRhs<'_, F> {
    fn eval(&mut self, _t: f64, ys: &[f64; 5], dydt: &mut [f64; 5]) -> TracingResult<()> {
        let v_par = ys[3];
        let time = ys[4];
        let (s, theta) = to_canonical(self.chart, ys[0], ys[1]);
        self.stz[[0, 0]] = s;
        self.stz[[0, 1]] = theta;
        self.stz[[0, 2]] = ys[2];
        self.field.set_points(&self.stz)?;

        let psi0 = self.field.psi0();
        let mod_b = self.field.mod_b()[0];
        let g = self.field.g()[0];
        let iota = self.field.iota()[0];
        let diota_dpsi = self.field.diota_ds()[0] / psi0;
        let derivs = self.field.mod_b_derivs();
        let dmodb_dpsi = derivs[[0, 0]] / psi0;
        let dmodb_dtheta = derivs[[0, 1]];
        let dmodb_dzeta = derivs[[0, 2]];

        let (m, q, mu) = (self.m, self.q, self.mu);
        let phi_m = self.perturbation.mode_m as f64;
        let phi_n = self.perturbation.mode_n as f64;
        let omega = self.perturbation.omega;
        let fak1 = m * v_par * v_par / mod_b + m * mu;

        let arg = phi_m * theta - phi_n * ys[2] + omega * time + self.perturbation.phase;
        let phi = self.perturbation.phihat * arg.sin();
        let dphi_dpsi = 0.0;
        let phidot = self.perturbation.phihat * omega * arg.cos();
        let dphi_dtheta = phidot * phi_m / omega;
        let dphi_dzeta = -phidot * phi_n / omega;

        let mode_factor = (iota * phi_m - phi_n) / (omega * g);
        let alphadot = -phidot * mode_factor;
        let dalpha_dtheta = -dphi_dtheta * mode_factor;
        let dalpha_dpsi =
            -dphi_dpsi * mode_factor - phi * (diota_dpsi * phi_m) / (omega * g);

        let sdot =
            (-dmodb_dtheta * fak1 / q + dalpha_dtheta * mod_b * v_par - dphi_dtheta) / psi0;
        let tdot = dmodb_dpsi * fak1 / q + (iota - dalpha_dpsi * g) * v_par * mod_b / g
            + dphi_dpsi;

        let (dy0, dy1) = push_flux_velocity(self.chart, s, theta, sdot, tdot);
        dydt[0] = dy0;
        dydt[1] = dy1;
        dydt[2] = v_par * mod_b / g;
        dydt[3] = -mod_b / (g * m)
            * (m * mu
                * (dmodb_dzeta
                    + dalpha_dtheta * dmodb_dpsi * g
                    + dmodb_dtheta * (iota - dalpha_dpsi * g))
                + q * (alphadot * g
                    + dalpha_dtheta * g * dphi_dpsi
                    + (iota - dalpha_dpsi * g) * dphi_dtheta
                    + dphi_dzeta))
            + v_par / mod_b * (dmodb_dtheta * dphi_dpsi - dmodb_dpsi * dphi_dtheta);
        dydt[4] = 1.0;
        Ok(())
    }
}

impl<F: BoozerMagneticField> OrbitRhs<5> for GuidingCenterVacuumBoozerPerturbedRhs<'_, F> {
    fn chart(&self) -> ChartKind {
        self.chart
    }
}

/// K = 0 guiding-center motion with finite I and a single-mode
/// electrostatic perturbation, size-5 state.
pub struct GuidingCenterNoKBoozerPerturbedRhs<'a, F: BoozerMagneticField> {
    field: &'a mut F,
    m: f64,
    q: f64,
    mu: f64,
    perturbation: Perturbation,
    chart: ChartKind,
    stz: Array2<f64>,
}

impl<'a, F: BoozerMagneticField> GuidingCenterNoKBoozerPerturbedRhs<'a, F> {
    pub fn new(
        field: &'a mut F,
        particle: &Particle,
        mu: f64,
        perturbation: Perturbation,
        chart: ChartKind,
    ) -> Self {
        GuidingCenterNoKBoozerPerturbedRhs {
            field,
            m: particle.mass_kg,
            q: particle.charge_c,
            mu,
            perturbation,
            chart,
            stz: Array2::zeros((1, 3)),
        }
    }
}

impl<F: BoozerMagneticField> OdeSystem<5> for GuidingCenterNoKBoozerPerturbedRhs<'_, F> {
    fn eval(&mut self, _t: f64, ys: &[f64; 5], dydt: &mut [f64; 5]) -> TracingResult<()> {
        let v_par = ys[3];
        let time = ys[4];
        let (s, theta) = to_canonical(self.chart, ys[0], ys[1]);
        self.stz[[0, 0]] = s;
        self.stz[[0, 1]] = theta;
        self.stz[[0, 2]] = ys[2];
        self.field.set_points(&self.stz)?;

        let psi0 = self.field.psi0();
        let mod_b = self.field.mod_b()[0];
        let g = self.field.g()[0];
        let i = self.field.i()[0];
        let dg_dpsi = self.field.dg_ds()[0] / psi0;
        let di_dpsi = self.field.di_ds()[0] / psi0;
        let iota = self.field.iota()[0];
        let diota_dpsi = self.field.diota_ds()[0] / psi0;
        let derivs = self.field.mod_b_derivs();
        let dmodb_dpsi = derivs[[0, 0]] / psi0;
        let dmodb_dtheta = derivs[[0, 1]];
        let dmodb_dzeta = derivs[[0, 2]];

        let (m, q, mu) = (self.m, self.q, self.mu);
        let phi_m = self.perturbation.mode_m as f64;
        let phi_n = self.perturbation.mode_n as f64;
        let omega = self.perturbation.omega;
        let fak1 = m * v_par * v_par / mod_b + m * mu;

        let arg = phi_m * theta - phi_n * ys[2] + omega * time + self.perturbation.phase;
        let phi = self.perturbation.phihat * arg.sin();
        let dphi_dpsi = 0.0;
        let phidot = self.perturbation.phihat * omega * arg.cos();
        let dphi_dtheta = phidot * phi_m / omega;
        let dphi_dzeta = -phidot * phi_n / omega;

        let gi = g + iota * i;
        let mode_factor = (iota * phi_m - phi_n) / (omega * gi);
        let alpha = -phi * mode_factor;
        let alphadot = -phidot * mode_factor;
        let dalpha_dtheta = -dphi_dtheta * mode_factor;
        let dalpha_dzeta = -dphi_dzeta * mode_factor;
        let dalpha_dpsi = -dphi_dpsi * mode_factor
            - (phi / omega)
                * (diota_dpsi * phi_m / gi
                    - (iota * phi_m - phi_n) / (gi * gi)
                        * (dg_dpsi + diota_dpsi * i + iota * di_dpsi));

        // q G in vacuum
        let denom = q * (g + i * (-alpha * dg_dpsi + iota) + alpha * g * di_dpsi)
            + m * v_par / mod_b * (-dg_dpsi * i + g * di_dpsi);

        let sdot = (-g * dphi_dtheta * q
            + i * dphi_dzeta * q
            + mod_b * q * v_par * (dalpha_dtheta * g - dalpha_dzeta * i)
            + (-dmodb_dtheta * g + dmodb_dzeta * i) * fak1)
            / (denom * psi0);
        let tdot = (g * q * dphi_dpsi
            + mod_b * q * v_par * (-dalpha_dpsi * g - alpha * dg_dpsi + iota)
            - dg_dpsi * m * v_par * v_par
            + dmodb_dpsi * g * fak1)
            / denom;

        let (dy0, dy1) = push_flux_velocity(self.chart, s, theta, sdot, tdot);
        dydt[0] = dy0;
        dydt[1] = dy1;
        dydt[2] = (-i * (dmodb_dpsi * m * mu + dphi_dpsi * q)
            + mod_b * q * v_par * (1.0 + dalpha_dpsi * i + alpha * di_dpsi)
            + m * v_par * v_par / mod_b * (mod_b * di_dpsi - dmodb_dpsi * i))
            / denom;
        dydt[3] = (mod_b * q / m
            * (-m * mu
                * (dmodb_dzeta * (1.0 + dalpha_dpsi * i + alpha * di_dpsi)
                    + dmodb_dpsi * (dalpha_dtheta * g - dalpha_dzeta * i)
                    + dmodb_dtheta * (iota - alpha * dg_dpsi - dalpha_dpsi * g))
                - q * (alphadot * (g + i * (iota - alpha * dg_dpsi) + alpha * g * di_dpsi)
                    + (dalpha_dtheta * g - dalpha_dzeta * i) * dphi_dpsi
                    + (iota - alpha * dg_dpsi - dalpha_dpsi * g) * dphi_dtheta
                    + (1.0 + alpha * di_dpsi + dalpha_dpsi * i) * dphi_dzeta))
            + q * v_par / mod_b
                * ((dmodb_dtheta * g - dmodb_dzeta * i) * dphi_dpsi
                    + dmodb_dpsi * (i * dphi_dzeta - g * dphi_dtheta))
            + v_par
                * (m * mu * (dmodb_dtheta * dg_dpsi - dmodb_dzeta * di_dpsi)
                    + q * (alphadot * (dg_dpsi * i - g * di_dpsi) + dg_dpsi * dphi_dtheta
                        - di_dpsi * dphi_dzeta)))
            / denom;
        dydt[4] = 1.0;
        Ok(())
    }
}

impl<F: BoozerMagneticField> OrbitRhs<5> for GuidingCenterNoKBoozerPerturbedRhs<'_, F> {
    fn chart(&self) -> ChartKind {
        self.chart
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytic::AnalyticBoozerField;

    fn field() -> AnalyticBoozerField {
        AnalyticBoozerField::new(1.0, 0.2, 1.3, 0.1, 0.9, 0.0, 1.0).expect("valid field")
    }

    #[test]
    fn test_vacuum_rhs_mu_zero_conserves_vpar() {
        let mut f = field();
        let particle = Particle::new(1.0, 1.0);
        let mut rhs = GuidingCenterVacuumBoozerRhs::new(&mut f, &particle, 0.0, ChartKind::Direct);
        let mut dydt = [0.0; 4];
        rhs.eval(0.0, &[0.4, 1.2, 0.3, 0.8], &mut dydt).expect("eval");
        assert_eq!(dydt[3], 0.0, "mu = 0 must freeze v_par");
        assert!(dydt[2] > 0.0, "positive v_par advances zeta");
    }

    #[test]
    fn test_full_k_reduces_to_nok_when_k_vanishes() {
        // The analytic field has K = 0 and constant G, I, so the full-K
        // equations must agree with the NoK equations exactly.
        let particle = Particle::new(2.0, 1.5);
        let ys = [0.35, 0.7, 1.1, 0.6];
        let mut f1 = field();
        let mut rhs_nok = GuidingCenterNoKBoozerRhs::new(&mut f1, &particle, 0.25, ChartKind::Direct);
        let mut d_nok = [0.0; 4];
        rhs_nok.eval(0.0, &ys, &mut d_nok).expect("eval");
        let mut f2 = field();
        let mut rhs_full = GuidingCenterBoozerRhs::new(&mut f2, &particle, 0.25, ChartKind::Direct);
        let mut d_full = [0.0; 4];
        rhs_full.eval(0.0, &ys, &mut d_full).expect("eval");
        for j in 0..4 {
            assert!(
                (d_nok[j] - d_full[j]).abs() < 1e-12,
                "component {j}: NoK {} vs full {}",
                d_nok[j],
                d_full[j]
            );
        }
    }

    #[test]
    fn test_nok_reduces_to_vacuum_when_i_vanishes() {
        // With I = 0 and constant G the NoK denominator collapses to
        // q G / iota and both formulations coincide.
        let mut f1 = AnalyticBoozerField::new(1.0, 0.2, 1.3, 0.0, 0.9, 0.0, 1.0).expect("field");
        let mut f2 = AnalyticBoozerField::new(1.0, 0.2, 1.3, 0.0, 0.9, 0.0, 1.0).expect("field");
        let particle = Particle::new(1.0, 1.0);
        let ys = [0.5, 0.4, 0.2, 0.7];
        let mut d_vac = [0.0; 4];
        GuidingCenterVacuumBoozerRhs::new(&mut f1, &particle, 0.3, ChartKind::Direct)
            .eval(0.0, &ys, &mut d_vac)
            .expect("eval");
        let mut d_nok = [0.0; 4];
        GuidingCenterNoKBoozerRhs::new(&mut f2, &particle, 0.3, ChartKind::Direct)
            .eval(0.0, &ys, &mut d_nok)
            .expect("eval");
        for j in 0..4 {
            assert!(
                (d_vac[j] - d_nok[j]).abs() < 1e-12,
                "component {j}: vacuum {} vs NoK {}",
                d_vac[j],
                d_nok[j]
            );
        }
    }

    #[test]
    fn test_chart_jacobian_consistency_across_charts() {
        // The same physical state expressed in each chart must give the
        // same canonical (sdot, thetadot) after inverting the Jacobian.
        let particle = Particle::new(1.0, 1.0);
        let (s, theta) = (0.3, 0.8);
        let mut reference = [0.0; 4];
        {
            let mut f = field();
            GuidingCenterVacuumBoozerRhs::new(&mut f, &particle, 0.2, ChartKind::Direct)
                .eval(0.0, &[s, theta, 0.5, 0.6], &mut reference)
                .expect("eval");
        }
        for chart in [ChartKind::SqrtRegularized, ChartKind::LinearRegularized] {
            let (y0, y1) = crate::chart::from_canonical(chart, s, theta);
            let mut f = field();
            let mut dydt = [0.0; 4];
            GuidingCenterVacuumBoozerRhs::new(&mut f, &particle, 0.2, chart)
                .eval(0.0, &[y0, y1, 0.5, 0.6], &mut dydt)
                .expect("eval");
            // Invert the Jacobian numerically via the canonical rates.
            let (sdot, tdot) = (reference[0], reference[1]);
            let (e0, e1) = crate::chart::push_flux_velocity(chart, s, theta, sdot, tdot);
            assert!((dydt[0] - e0).abs() < 1e-12, "{chart:?} dy0");
            assert!((dydt[1] - e1).abs() < 1e-12, "{chart:?} dy1");
            assert!((dydt[2] - reference[2]).abs() < 1e-12, "{chart:?} dzeta");
            assert!((dydt[3] - reference[3]).abs() < 1e-12, "{chart:?} dvpar");
        }
    }

    #[test]
    fn test_perturbed_vacuum_reduces_to_vacuum_at_zero_amplitude() {
        let particle = Particle::new(1.0, 1.0);
        let perturbation = Perturbation {
            phihat: 0.0,
            omega: 2.0,
            mode_m: 1,
            mode_n: 1,
            phase: 0.0,
        };
        let ys5 = [0.4, 1.0, 0.7, 0.5, 3.0];
        let mut f1 = field();
        let mut d5 = [0.0; 5];
        GuidingCenterVacuumBoozerPerturbedRhs::new(
            &mut f1,
            &particle,
            0.2,
            perturbation,
            ChartKind::Direct,
        )
        .eval(0.0, &ys5, &mut d5)
        .expect("eval");
        let mut f2 = field();
        let mut d4 = [0.0; 4];
        GuidingCenterVacuumBoozerRhs::new(&mut f2, &particle, 0.2, ChartKind::Direct)
            .eval(0.0, &[0.4, 1.0, 0.7, 0.5], &mut d4)
            .expect("eval");
        for j in 0..4 {
            assert!(
                (d5[j] - d4[j]).abs() < 1e-12,
                "component {j}: perturbed {} vs vacuum {}",
                d5[j],
                d4[j]
            );
        }
        assert_eq!(d5[4], 1.0, "time component advances at unit rate");
    }

    #[test]
    fn test_perturbed_nok_time_component() {
        let particle = Particle::new(1.0, 1.0);
        let perturbation = Perturbation {
            phihat: 1e-3,
            omega: 2.0,
            mode_m: 2,
            mode_n: 1,
            phase: 0.4,
        };
        let mut f = field();
        let mut dydt = [0.0; 5];
        GuidingCenterNoKBoozerPerturbedRhs::new(
            &mut f,
            &particle,
            0.2,
            perturbation,
            ChartKind::Direct,
        )
        .eval(0.0, &[0.4, 1.0, 0.7, 0.5, 0.0], &mut dydt)
        .expect("eval");
        assert_eq!(dydt[4], 1.0);
        assert!(dydt.iter().all(|v| v.is_finite()));
    }
}
