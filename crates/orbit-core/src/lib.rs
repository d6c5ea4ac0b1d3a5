// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — Orbit Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Particle and field-line tracing through toroidal magnetic fields.
//!
//! The engine integrates guiding-center, full-orbit and field-line
//! trajectories with an adaptive dense-output stepper, detects plane and
//! parallel-velocity crossings between accepted steps, and terminates on
//! configurable stopping criteria.

pub mod analytic;
pub mod chart;
pub mod field;
pub mod integrate;
pub mod rhs_boozer;
pub mod rhs_cartesian;
pub mod stopping;
pub mod trace;
