// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — Property-Based Tests (proptest) for orbit-core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for the chart and phase-unwrapping utilities.

use orbit_core::chart::{canonicalize, from_canonical, lift_angle, push_flux_velocity, to_canonical};
use orbit_types::config::ChartKind;
use proptest::prelude::*;
use std::f64::consts::PI;

fn charts() -> impl Strategy<Value = ChartKind> {
    prop_oneof![
        Just(ChartKind::Direct),
        Just(ChartKind::SqrtRegularized),
        Just(ChartKind::LinearRegularized),
    ]
}

proptest! {
    /// to_canonical(from_canonical(s, theta)) reproduces (s, theta mod 2 pi)
    /// for any chart and any s > 0.
    #[test]
    fn chart_round_trip(
        chart in charts(),
        s in 1e-6f64..1.0,
        theta in -10.0f64..10.0,
    ) {
        let (y0, y1) = from_canonical(chart, s, theta);
        let (s2, theta2) = to_canonical(chart, y0, y1);
        prop_assert!((s2 - s).abs() < 1e-10 * s.max(1e-3),
            "{:?}: s {} -> {}", chart, s, s2);
        let dtheta = (theta2 - theta).rem_euclid(2.0 * PI);
        let dtheta = dtheta.min(2.0 * PI - dtheta);
        prop_assert!(dtheta < 1e-9, "{:?}: theta {} -> {}", chart, theta, theta2);
    }

    /// The lifted angle is congruent to atan2(y, x) and within pi of the
    /// reference.
    #[test]
    fn lift_angle_branch_distance(
        a in -12.0f64..12.0,
        reference in -20.0f64..20.0,
    ) {
        let lifted = lift_angle(a.cos(), a.sin(), reference);
        prop_assert!((lifted - reference).abs() <= PI + 1e-9,
            "lift({}, ref {}) = {}", a, reference, lifted);
        let d = (lifted - a).rem_euclid(2.0 * PI);
        let d = d.min(2.0 * PI - d);
        prop_assert!(d < 1e-9, "lifted {} not congruent to {}", lifted, a);
    }

    /// The chart Jacobian agrees with central finite differences of the
    /// chart map along the flux-velocity direction.
    #[test]
    fn jacobian_matches_finite_differences(
        chart in charts(),
        s in 0.05f64..0.95,
        theta in -3.0f64..3.0,
        sdot in -1.0f64..1.0,
        thetadot in -1.0f64..1.0,
    ) {
        let (d0, d1) = push_flux_velocity(chart, s, theta, sdot, thetadot);
        let eps = 1e-6;
        let (a0, a1) = from_canonical(chart, s - eps * sdot, theta - eps * thetadot);
        let (b0, b1) = from_canonical(chart, s + eps * sdot, theta + eps * thetadot);
        let fd0 = (b0 - a0) / (2.0 * eps);
        let fd1 = (b1 - a1) / (2.0 * eps);
        prop_assert!((d0 - fd0).abs() < 1e-4, "{:?}: dy0 {} vs fd {}", chart, d0, fd0);
        prop_assert!((d1 - fd1).abs() < 1e-4, "{:?}: dy1 {} vs fd {}", chart, d1, fd1);
    }

    /// Canonicalization never touches components beyond the flux pair.
    #[test]
    fn canonicalize_preserves_tail(
        chart in charts(),
        y0 in -1.0f64..1.0,
        y1 in -1.0f64..1.0,
        zeta in -10.0f64..10.0,
        vpar in -2.0f64..2.0,
    ) {
        let y = [y0, y1, zeta, vpar];
        let out = canonicalize(chart, &y);
        prop_assert_eq!(out[2], zeta);
        prop_assert_eq!(out[3], vpar);
    }
}
