// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::constants::{M_ALPHA, M_PROTON, Q_ELEMENTARY};
use crate::error::{TracingError, TracingResult};

/// Charged test-particle properties.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Particle {
    pub mass_kg: f64,
    pub charge_c: f64,
}

impl Particle {
    pub const fn new(mass_kg: f64, charge_c: f64) -> Self {
        Particle { mass_kg, charge_c }
    }

    pub fn proton() -> Self {
        Particle::new(M_PROTON, Q_ELEMENTARY)
    }

    pub fn alpha() -> Self {
        Particle::new(M_ALPHA, 2.0 * Q_ELEMENTARY)
    }

    pub fn validate(&self) -> TracingResult<()> {
        if !self.mass_kg.is_finite() || self.mass_kg <= 0.0 {
            return Err(TracingError::InvalidArgument(format!(
                "mass_kg must be finite and > 0, got {}",
                self.mass_kg
            )));
        }
        if !self.charge_c.is_finite() || self.charge_c == 0.0 {
            return Err(TracingError::InvalidArgument(format!(
                "charge_c must be finite and non-zero, got {}",
                self.charge_c
            )));
        }
        Ok(())
    }
}

/// Integration-control settings shared by every trace entry point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TraceSettings {
    /// Integration horizon (s).
    pub tmax_s: f64,
    /// Absolute tolerance of the adaptive stepper.
    pub abstol: f64,
    /// Relative tolerance of the adaptive stepper.
    pub reltol: f64,
}

impl TraceSettings {
    pub const fn new(tmax_s: f64, abstol: f64, reltol: f64) -> Self {
        TraceSettings {
            tmax_s,
            abstol,
            reltol,
        }
    }

    pub fn validate(&self) -> TracingResult<()> {
        if !self.tmax_s.is_finite() {
            return Err(TracingError::InvalidArgument(format!(
                "tmax_s must be finite, got {}",
                self.tmax_s
            )));
        }
        if !self.abstol.is_finite() || self.abstol <= 0.0 {
            return Err(TracingError::InvalidArgument(format!(
                "abstol must be finite and > 0, got {}",
                self.abstol
            )));
        }
        if !self.reltol.is_finite() || self.reltol < 0.0 {
            return Err(TracingError::InvalidArgument(format!(
                "reltol must be finite and >= 0, got {}",
                self.reltol
            )));
        }
        Ok(())
    }
}

/// Resolve an omega list against a phi-plane list: an empty omega list means
/// stationary planes; otherwise the lengths must agree.
pub fn resolve_omegas(phis: &[f64], omegas: &[f64]) -> TracingResult<Vec<f64>> {
    if omegas.is_empty() {
        Ok(vec![0.0; phis.len()])
    } else if omegas.len() == phis.len() {
        Ok(omegas.to_vec())
    } else {
        Err(TracingError::InvalidArgument(format!(
            "phis/omegas length mismatch: {} phi planes, {} omegas",
            phis.len(),
            omegas.len()
        )))
    }
}

/// Event-plane lists consumed by the flux-coordinate trace entry points:
/// toroidal-angle planes (zeta in Boozer coordinates) with optional per-plane
/// rotation frequencies, and parallel-velocity planes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPlanes {
    pub phis: Vec<f64>,
    /// Rotation frequency of each phi plane; empty means all stationary.
    pub omegas: Vec<f64>,
    pub vpars: Vec<f64>,
    /// Terminate the trace at the first phi-plane crossing.
    pub phis_stop: bool,
    /// Terminate the trace at the first v_par-plane crossing.
    pub vpars_stop: bool,
}

impl EventPlanes {
    pub fn stationary(phis: Vec<f64>) -> Self {
        EventPlanes {
            phis,
            ..Default::default()
        }
    }

    pub fn resolved_omegas(&self) -> TracingResult<Vec<f64>> {
        resolve_omegas(&self.phis, &self.omegas)
    }
}

/// Chart used for the first two state components of a flux-coordinate trace.
/// The regularized charts keep the integrator smooth across the magnetic
/// axis s = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    /// (y0, y1) = (s, theta)
    Direct,
    /// (y0, y1) = (sqrt(s) cos theta, sqrt(s) sin theta)
    SqrtRegularized,
    /// (y0, y1) = (s cos theta, s sin theta)
    LinearRegularized,
}

impl ChartKind {
    pub fn from_index(index: i32) -> TracingResult<Self> {
        match index {
            0 => Ok(ChartKind::Direct),
            1 => Ok(ChartKind::SqrtRegularized),
            2 => Ok(ChartKind::LinearRegularized),
            other => Err(TracingError::InvalidArgument(format!(
                "chart selector must be 0, 1 or 2, got {other}"
            ))),
        }
    }

    pub fn index(self) -> i32 {
        match self {
            ChartKind::Direct => 0,
            ChartKind::SqrtRegularized => 1,
            ChartKind::LinearRegularized => 2,
        }
    }
}

impl Default for ChartKind {
    fn default() -> Self {
        ChartKind::Direct
    }
}

/// Mode flags for the Boozer guiding-center entry points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BoozerTraceOptions {
    /// Vacuum equations (G only).
    pub vacuum: bool,
    /// K = 0 equations with finite I; ignored when `vacuum` is set.
    pub no_k: bool,
    pub chart: ChartKind,
    /// Keep only the initial and terminal trajectory samples.
    pub forget_exact_path: bool,
}

/// Single-mode electrostatic perturbation
/// Phi(theta, zeta, t) = phihat * sin(m theta - n zeta + omega t + phase).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Perturbation {
    pub phihat: f64,
    pub omega: f64,
    pub mode_m: i32,
    pub mode_n: i32,
    pub phase: f64,
}

impl Perturbation {
    pub fn validate(&self) -> TracingResult<()> {
        if !self.phihat.is_finite() || !self.omega.is_finite() || !self.phase.is_finite() {
            return Err(TracingError::InvalidArgument(
                "perturbation parameters must be finite".to_string(),
            ));
        }
        if self.omega == 0.0 {
            return Err(TracingError::InvalidArgument(
                "perturbation omega must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_validation() {
        assert!(Particle::proton().validate().is_ok());
        assert!(Particle::alpha().validate().is_ok());
        assert!(Particle::new(0.0, Q_ELEMENTARY).validate().is_err());
        assert!(Particle::new(M_PROTON, 0.0).validate().is_err());
        assert!(Particle::new(f64::NAN, Q_ELEMENTARY).validate().is_err());
    }

    #[test]
    fn test_settings_validation() {
        assert!(TraceSettings::new(1e-4, 1e-9, 1e-9).validate().is_ok());
        assert!(TraceSettings::new(f64::INFINITY, 1e-9, 1e-9)
            .validate()
            .is_err());
        assert!(TraceSettings::new(1.0, 0.0, 1e-9).validate().is_err());
        assert!(TraceSettings::new(1.0, 1e-9, -1.0).validate().is_err());
    }

    #[test]
    fn test_resolve_omegas_defaults_to_stationary() {
        let omegas = resolve_omegas(&[0.0, 1.0, 2.0], &[]).unwrap();
        assert_eq!(omegas, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_resolve_omegas_rejects_mismatch() {
        assert!(resolve_omegas(&[0.0, 1.0], &[0.5]).is_err());
        // Empty phi list with non-empty omegas is a mismatch too.
        assert!(resolve_omegas(&[], &[0.5]).is_err());
    }

    #[test]
    fn test_chart_from_index() {
        assert_eq!(ChartKind::from_index(0).unwrap(), ChartKind::Direct);
        assert_eq!(
            ChartKind::from_index(1).unwrap(),
            ChartKind::SqrtRegularized
        );
        assert_eq!(
            ChartKind::from_index(2).unwrap(),
            ChartKind::LinearRegularized
        );
        assert!(ChartKind::from_index(3).is_err());
        assert!(ChartKind::from_index(-1).is_err());
        for index in 0..3 {
            assert_eq!(ChartKind::from_index(index).unwrap().index(), index);
        }
    }

    #[test]
    fn test_perturbation_validation() {
        let good = Perturbation {
            phihat: 1e-3,
            omega: 1e4,
            mode_m: 1,
            mode_n: 1,
            phase: 0.0,
        };
        assert!(good.validate().is_ok());
        assert!(Perturbation { omega: 0.0, ..good }.validate().is_err());
        assert!(Perturbation {
            phihat: f64::NAN,
            ..good
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_event_planes_serde_roundtrip() {
        let planes = EventPlanes {
            phis: vec![0.0, std::f64::consts::PI],
            omegas: vec![0.0, 1.0e3],
            vpars: vec![0.0],
            phis_stop: false,
            vpars_stop: true,
        };
        let json = serde_json::to_string(&planes).unwrap();
        let back: EventPlanes = serde_json::from_str(&json).unwrap();
        assert_eq!(back.phis, planes.phis);
        assert_eq!(back.omegas, planes.omegas);
        assert_eq!(back.vpars, planes.vpars);
        assert!(back.vpars_stop);
        assert!(!back.phis_stop);
    }
}
