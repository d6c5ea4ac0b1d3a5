// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — Trace Entry Points
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Public trace entry points.
//!
//! Each entry point reads the field once at the initial point to size the
//! maximum step (at most a quarter revolution per step), derives the
//! magnetic moment where the physics requires it, seeds the chart
//! representation, and hands the assembled right-hand side to the driver.

use std::f64::consts::PI;

use ndarray::Array2;
use orbit_types::config::{
    resolve_omegas, BoozerTraceOptions, EventPlanes, Particle, Perturbation, TraceSettings,
};
use orbit_types::error::{TracingError, TracingResult};
use orbit_types::state::OrbitTrace;

use crate::chart::from_canonical;
use crate::field::{BoozerMagneticField, MagneticField};
use crate::integrate::{integrate, IntegrationParams};
use crate::rhs_boozer::{
    GuidingCenterBoozerRhs, GuidingCenterNoKBoozerPerturbedRhs, GuidingCenterNoKBoozerRhs,
    GuidingCenterVacuumBoozerPerturbedRhs, GuidingCenterVacuumBoozerRhs,
};
use crate::rhs_cartesian::{FieldLineRhs, FullOrbitRhs, GuidingCenterVacuumRhs};
use crate::stopping::StoppingCriterion;

fn check_xyz(xyz: [f64; 3], label: &str) -> TracingResult<f64> {
    if xyz.iter().any(|v| !v.is_finite()) {
        return Err(TracingError::InvalidArgument(format!(
            "{label} must be finite, got {xyz:?}"
        )));
    }
    let r0 = (xyz[0] * xyz[0] + xyz[1] * xyz[1]).sqrt();
    if r0 <= 0.0 {
        return Err(TracingError::InvalidArgument(format!(
            "{label} must have positive cylindrical radius"
        )));
    }
    Ok(r0)
}

fn cyl_of(xyz: [f64; 3]) -> Array2<f64> {
    let r = (xyz[0] * xyz[0] + xyz[1] * xyz[1]).sqrt();
    let mut phi = xyz[1].atan2(xyz[0]);
    if phi < 0.0 {
        phi += 2.0 * PI;
    }
    let mut points = Array2::zeros((1, 3));
    points[[0, 0]] = r;
    points[[0, 1]] = phi;
    points[[0, 2]] = xyz[2];
    points
}

fn initial_abs_b<F: MagneticField>(field: &mut F, xyz: [f64; 3]) -> TracingResult<f64> {
    field.set_points_cyl(&cyl_of(xyz))?;
    let abs_b = field.abs_b()[0];
    if !abs_b.is_finite() || abs_b <= 0.0 {
        return Err(TracingError::Numeric {
            t: 0.0,
            message: format!("field magnitude at the initial point is {abs_b}"),
        });
    }
    Ok(abs_b)
}

/// Trace a magnetic field line from a Cartesian point.
pub fn trace_fieldline<F: MagneticField>(
    field: &mut F,
    xyz_init: [f64; 3],
    settings: &TraceSettings,
    phis: &[f64],
    stopping_criteria: &mut [Box<dyn StoppingCriterion>],
) -> TracingResult<OrbitTrace<3>> {
    settings.validate()?;
    let r0 = check_xyz(xyz_init, "xyz_init")?;
    let abs_b = initial_abs_b(field, xyz_init)?;
    let dt_max = r0 * 0.5 * PI / abs_b;
    let params = IntegrationParams {
        tmax: settings.tmax_s,
        dt_initial: 1e-5 * dt_max,
        dt_max,
        abstol: settings.abstol,
        reltol: settings.reltol,
        phis: phis.to_vec(),
        omegas: vec![0.0; phis.len()],
        vpars: vec![],
        phis_stop: false,
        vpars_stop: false,
        flux: false,
        forget_exact_path: false,
    };
    let mut rhs = FieldLineRhs::new(field);
    integrate(&mut rhs, xyz_init, &params, stopping_criteria)
}

/// Trace a full Lorentz orbit from a Cartesian point and velocity.
#[allow(clippy::too_many_arguments)]
pub fn trace_particle_fullorbit<F: MagneticField>(
    field: &mut F,
    xyz_init: [f64; 3],
    v_init: [f64; 3],
    particle: &Particle,
    settings: &TraceSettings,
    phis: &[f64],
    stopping_criteria: &mut [Box<dyn StoppingCriterion>],
) -> TracingResult<OrbitTrace<6>> {
    settings.validate()?;
    particle.validate()?;
    let r0 = check_xyz(xyz_init, "xyz_init")?;
    let v_total = (v_init[0] * v_init[0] + v_init[1] * v_init[1] + v_init[2] * v_init[2]).sqrt();
    if !v_total.is_finite() || v_total <= 0.0 {
        return Err(TracingError::InvalidArgument(
            "v_init must be finite and non-zero".to_string(),
        ));
    }
    let dt_max = r0 * 0.5 * PI / v_total;
    let params = IntegrationParams {
        tmax: settings.tmax_s,
        dt_initial: 1e-3 * dt_max,
        dt_max,
        abstol: settings.abstol,
        reltol: settings.reltol,
        phis: phis.to_vec(),
        omegas: vec![0.0; phis.len()],
        vpars: vec![],
        phis_stop: false,
        vpars_stop: false,
        flux: false,
        forget_exact_path: false,
    };
    let y0 = [
        xyz_init[0],
        xyz_init[1],
        xyz_init[2],
        v_init[0],
        v_init[1],
        v_init[2],
    ];
    let mut rhs = FullOrbitRhs::new(field, particle);
    integrate(&mut rhs, y0, &params, stopping_criteria)
}

/// Trace a guiding center in Cartesian coordinates. Only vacuum fields are
/// supported; the magnetic moment is derived from the perpendicular speed
/// at the initial point.
#[allow(clippy::too_many_arguments)]
pub fn trace_particle_guiding_center<F: MagneticField>(
    field: &mut F,
    xyz_init: [f64; 3],
    particle: &Particle,
    v_total: f64,
    v_tang: f64,
    vacuum: bool,
    settings: &TraceSettings,
    phis: &[f64],
    omegas: &[f64],
    stopping_criteria: &mut [Box<dyn StoppingCriterion>],
) -> TracingResult<OrbitTrace<4>> {
    if !vacuum {
        return Err(TracingError::UnsupportedMode(
            "guiding-center tracing in Cartesian coordinates is only implemented for vacuum fields"
                .to_string(),
        ));
    }
    settings.validate()?;
    particle.validate()?;
    let r0 = check_xyz(xyz_init, "xyz_init")?;
    if !v_total.is_finite() || v_total <= 0.0 || !v_tang.is_finite() || v_tang.abs() > v_total {
        return Err(TracingError::InvalidArgument(format!(
            "velocities must satisfy 0 < v_total and |v_tang| <= v_total, got v_total = \
             {v_total}, v_tang = {v_tang}"
        )));
    }
    let omegas = resolve_omegas(phis, omegas)?;
    let abs_b = initial_abs_b(field, xyz_init)?;
    let v_perp2 = v_total * v_total - v_tang * v_tang;
    let mu = v_perp2 / (2.0 * abs_b);
    let dt_max = r0 * 0.5 * PI / v_total;
    let params = IntegrationParams {
        tmax: settings.tmax_s,
        dt_initial: 1e-3 * dt_max,
        dt_max,
        abstol: settings.abstol,
        reltol: settings.reltol,
        phis: phis.to_vec(),
        omegas,
        vpars: vec![],
        phis_stop: false,
        vpars_stop: false,
        flux: false,
        forget_exact_path: false,
    };
    let y0 = [xyz_init[0], xyz_init[1], xyz_init[2], v_tang];
    let mut rhs = GuidingCenterVacuumRhs::new(field, particle, mu);
    integrate(&mut rhs, y0, &params, stopping_criteria)
}

fn boozer_scales<F: BoozerMagneticField>(
    field: &mut F,
    stz_init: [f64; 3],
) -> TracingResult<(f64, f64)> {
    if stz_init.iter().any(|v| !v.is_finite()) {
        return Err(TracingError::InvalidArgument(format!(
            "stz_init must be finite, got {stz_init:?}"
        )));
    }
    let mut stz = Array2::zeros((1, 3));
    stz[[0, 0]] = stz_init[0];
    stz[[0, 1]] = stz_init[1];
    stz[[0, 2]] = stz_init[2];
    field.set_points(&stz)?;
    let mod_b = field.mod_b()[0];
    if !mod_b.is_finite() || mod_b <= 0.0 {
        return Err(TracingError::Numeric {
            t: 0.0,
            message: format!("field magnitude at the initial point is {mod_b}"),
        });
    }
    let g0 = field.g()[0].abs();
    Ok((mod_b, g0 / mod_b))
}

/// Trace a guiding center in Boozer coordinates.
#[allow(clippy::too_many_arguments)]
pub fn trace_particle_guiding_center_boozer<F: BoozerMagneticField>(
    field: &mut F,
    stz_init: [f64; 3],
    particle: &Particle,
    v_total: f64,
    v_tang: f64,
    options: &BoozerTraceOptions,
    settings: &TraceSettings,
    planes: &EventPlanes,
    stopping_criteria: &mut [Box<dyn StoppingCriterion>],
) -> TracingResult<OrbitTrace<4>> {
    settings.validate()?;
    particle.validate()?;
    if !v_total.is_finite() || v_total <= 0.0 || !v_tang.is_finite() || v_tang.abs() > v_total {
        return Err(TracingError::InvalidArgument(format!(
            "velocities must satisfy 0 < v_total and |v_tang| <= v_total, got v_total = \
             {v_total}, v_tang = {v_tang}"
        )));
    }
    let omegas = planes.resolved_omegas()?;
    let (mod_b, r0) = boozer_scales(field, stz_init)?;
    let v_perp2 = v_total * v_total - v_tang * v_tang;
    let mu = v_perp2 / (2.0 * mod_b);
    let dt_max = r0 * 0.5 * PI / v_total;
    let params = IntegrationParams {
        tmax: settings.tmax_s,
        dt_initial: 1e-3 * dt_max,
        dt_max,
        abstol: settings.abstol,
        reltol: settings.reltol,
        phis: planes.phis.clone(),
        omegas,
        vpars: planes.vpars.clone(),
        phis_stop: planes.phis_stop,
        vpars_stop: planes.vpars_stop,
        flux: true,
        forget_exact_path: options.forget_exact_path,
    };
    let (y0, y1) = from_canonical(options.chart, stz_init[0], stz_init[1]);
    let y = [y0, y1, stz_init[2], v_tang];
    if options.vacuum {
        let mut rhs = GuidingCenterVacuumBoozerRhs::new(field, particle, mu, options.chart);
        integrate(&mut rhs, y, &params, stopping_criteria)
    } else if options.no_k {
        let mut rhs = GuidingCenterNoKBoozerRhs::new(field, particle, mu, options.chart);
        integrate(&mut rhs, y, &params, stopping_criteria)
    } else {
        let mut rhs = GuidingCenterBoozerRhs::new(field, particle, mu, options.chart);
        integrate(&mut rhs, y, &params, stopping_criteria)
    }
}

/// Trace a guiding center in Boozer coordinates under a single-mode
/// electrostatic perturbation. The magnetic moment is caller-supplied; the
/// state carries an explicit time component for the rotating potential.
#[allow(clippy::too_many_arguments)]
pub fn trace_particle_guiding_center_boozer_perturbed<F: BoozerMagneticField>(
    field: &mut F,
    stz_init: [f64; 3],
    particle: &Particle,
    v_total: f64,
    v_tang: f64,
    mu: f64,
    perturbation: &Perturbation,
    options: &BoozerTraceOptions,
    settings: &TraceSettings,
    planes: &EventPlanes,
    stopping_criteria: &mut [Box<dyn StoppingCriterion>],
) -> TracingResult<OrbitTrace<5>> {
    settings.validate()?;
    particle.validate()?;
    perturbation.validate()?;
    if !v_total.is_finite() || v_total <= 0.0 || !v_tang.is_finite() {
        return Err(TracingError::InvalidArgument(format!(
            "velocities must satisfy 0 < v_total, got v_total = {v_total}, v_tang = {v_tang}"
        )));
    }
    if !mu.is_finite() || mu < 0.0 {
        return Err(TracingError::InvalidArgument(format!(
            "mu must be finite and >= 0, got {mu}"
        )));
    }
    let omegas = planes.resolved_omegas()?;
    let (_, r0) = boozer_scales(field, stz_init)?;
    let dt_max = r0 * 0.5 * PI / v_total;
    let params = IntegrationParams {
        tmax: settings.tmax_s,
        dt_initial: 1e-3 * dt_max,
        dt_max,
        abstol: settings.abstol,
        reltol: settings.reltol,
        phis: planes.phis.clone(),
        omegas,
        vpars: planes.vpars.clone(),
        phis_stop: planes.phis_stop,
        vpars_stop: planes.vpars_stop,
        flux: true,
        forget_exact_path: options.forget_exact_path,
    };
    let (y0, y1) = from_canonical(options.chart, stz_init[0], stz_init[1]);
    let y = [y0, y1, stz_init[2], v_tang, 0.0];
    if options.vacuum {
        let mut rhs = GuidingCenterVacuumBoozerPerturbedRhs::new(
            field,
            particle,
            mu,
            *perturbation,
            options.chart,
        );
        integrate(&mut rhs, y, &params, stopping_criteria)
    } else {
        let mut rhs = GuidingCenterNoKBoozerPerturbedRhs::new(
            field,
            particle,
            mu,
            *perturbation,
            options.chart,
        );
        integrate(&mut rhs, y, &params, stopping_criteria)
    }
}
