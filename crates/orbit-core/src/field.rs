// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — Field Interfaces
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Magnetic field evaluator contracts consumed by the tracing engine.
//!
//! Evaluators follow a set-points-then-read protocol: the engine writes a
//! batch of evaluation points, then reads field quantities as row-major
//! arrays indexed by point. The engine never caches field data; each RHS
//! evaluation sets exactly one point.

use ndarray::{Array1, Array2};
use orbit_types::error::TracingResult;

/// Magnetic field sampled at cylindrical points, read in Cartesian
/// components.
pub trait MagneticField {
    /// Set the evaluation points, an `[n, 3]` array of (R, phi, Z).
    fn set_points_cyl(&mut self, rphiz: &Array2<f64>) -> TracingResult<()>;
    /// Cartesian field components `[n, 3]` at the current points.
    fn b(&self) -> &Array2<f64>;
    /// Field magnitude `[n]`.
    fn abs_b(&self) -> &Array1<f64>;
    /// Cartesian gradient of the field magnitude, `[n, 3]`.
    fn grad_abs_b(&self) -> &Array2<f64>;
}

/// Magnetic field expressed in Boozer coordinates (s, theta, zeta).
pub trait BoozerMagneticField {
    /// Set the evaluation points, an `[n, 3]` array of (s, theta, zeta).
    fn set_points(&mut self, stz: &Array2<f64>) -> TracingResult<()>;
    /// Toroidal flux at the plasma edge (normalization constant).
    fn psi0(&self) -> f64;
    /// Field magnitude `[n]`.
    fn mod_b(&self) -> &Array1<f64>;
    /// Covariant toroidal component G `[n]`.
    fn g(&self) -> &Array1<f64>;
    /// Covariant poloidal component I `[n]`.
    fn i(&self) -> &Array1<f64>;
    /// Covariant radial component K `[n]`.
    fn k(&self) -> &Array1<f64>;
    /// Rotational transform `[n]`.
    fn iota(&self) -> &Array1<f64>;
    fn dg_ds(&self) -> &Array1<f64>;
    fn di_ds(&self) -> &Array1<f64>;
    fn diota_ds(&self) -> &Array1<f64>;
    /// `[n, 3]`: d|B|/ds, d|B|/dtheta, d|B|/dzeta.
    fn mod_b_derivs(&self) -> &Array2<f64>;
    /// `[n, 2]`: dK/dtheta, dK/dzeta.
    fn k_derivs(&self) -> &Array2<f64>;
}
