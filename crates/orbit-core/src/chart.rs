// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — Coordinate Charts
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Flux-coordinate charts and toroidal phase unwrapping.
//!
//! The regularized charts remove the coordinate singularity of (s, theta)
//! at the magnetic axis: chart 1 removes the 1/sqrt(s) singularity of the
//! radial equation, chart 2 the 1/s singularity of the angular equation.

use std::f64::consts::PI;

use orbit_types::config::ChartKind;

/// Map the first two state components of a chart to canonical (s, theta).
pub fn to_canonical(chart: ChartKind, y0: f64, y1: f64) -> (f64, f64) {
    match chart {
        ChartKind::Direct => (y0, y1),
        ChartKind::SqrtRegularized => (y0 * y0 + y1 * y1, y1.atan2(y0)),
        ChartKind::LinearRegularized => ((y0 * y0 + y1 * y1).sqrt(), y1.atan2(y0)),
    }
}

/// Inverse of [`to_canonical`] for s >= 0.
pub fn from_canonical(chart: ChartKind, s: f64, theta: f64) -> (f64, f64) {
    match chart {
        ChartKind::Direct => (s, theta),
        ChartKind::SqrtRegularized => (s.sqrt() * theta.cos(), s.sqrt() * theta.sin()),
        ChartKind::LinearRegularized => (s * theta.cos(), s * theta.sin()),
    }
}

/// Push a flux-coordinate velocity (sdot, thetadot) at (s, theta) through
/// the chart Jacobian, yielding (y0dot, y1dot).
pub fn push_flux_velocity(
    chart: ChartKind,
    s: f64,
    theta: f64,
    sdot: f64,
    thetadot: f64,
) -> (f64, f64) {
    match chart {
        ChartKind::Direct => (sdot, thetadot),
        ChartKind::SqrtRegularized => {
            let root_s = s.sqrt();
            (
                sdot * theta.cos() / (2.0 * root_s) - root_s * theta.sin() * thetadot,
                sdot * theta.sin() / (2.0 * root_s) + root_s * theta.cos() * thetadot,
            )
        }
        ChartKind::LinearRegularized => (
            sdot * theta.cos() - s * theta.sin() * thetadot,
            sdot * theta.sin() + s * theta.cos() * thetadot,
        ),
    }
}

/// Rewrite a state in canonical coordinates: only the first two components
/// depend on the chart.
pub fn canonicalize<const N: usize>(chart: ChartKind, y: &[f64; N]) -> [f64; N] {
    let mut out = *y;
    if chart != ChartKind::Direct {
        let (s, theta) = to_canonical(chart, y[0], y[1]);
        out[0] = s;
        out[1] = theta;
    }
    out
}

/// Lift atan2(y, x) onto the 2-pi branch nearest `reference`.
///
/// The raw angle is first shifted to [0, 2pi); the candidate on the branch
/// of `reference` and its two neighbours are compared and the closest one
/// returned. Keeping successive toroidal angles on one branch turns
/// plane-crossing detection into a finite floor comparison.
pub fn lift_angle(x: f64, y: f64, reference: f64) -> f64 {
    let mut phi = y.atan2(x);
    if phi < 0.0 {
        phi += 2.0 * PI;
    }
    let nearest_multiple = (reference / (2.0 * PI)).round() * 2.0 * PI;
    let opt1 = nearest_multiple - 2.0 * PI + phi;
    let opt2 = nearest_multiple + phi;
    let opt3 = nearest_multiple + 2.0 * PI + phi;
    let dist1 = (opt1 - reference).abs();
    let dist2 = (opt2 - reference).abs();
    let dist3 = (opt3 - reference).abs();
    if dist1 <= dist2.min(dist3) {
        opt1
    } else if dist2 <= dist1.min(dist3) {
        opt2
    } else {
        opt3
    }
}
