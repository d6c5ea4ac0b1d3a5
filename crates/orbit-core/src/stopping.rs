// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — Stopping Criteria
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Stopping criteria evaluated after every accepted step.
//!
//! Criteria receive the canonical state: (x, y, z) for Cartesian traces,
//! (s, theta, zeta) for flux traces, plus v_par where the state carries
//! one. The first criterion to fire terminates the trace; its position in
//! the caller-supplied list becomes the event index.

use ndarray::Array3;
use orbit_math::interp::interp3d;
use orbit_types::error::{TracingError, TracingResult};
use orbit_types::state::Grid3D;
use std::f64::consts::PI;

/// Uniform interface of all stopping criteria.
///
/// `evaluate` takes `&mut self` because some variants compare against
/// state retained from the previous step.
pub trait StoppingCriterion {
    #[allow(clippy::too_many_arguments)]
    fn evaluate(
        &mut self,
        iter: usize,
        dt: f64,
        t: f64,
        c0: f64,
        c1: f64,
        c2: f64,
        vpar: f64,
    ) -> bool;
}

/// Fires once the step counter reaches the configured limit.
#[derive(Debug, Clone, Copy)]
pub struct IterationStoppingCriterion {
    pub max_iterations: usize,
}

impl IterationStoppingCriterion {
    pub fn new(max_iterations: usize) -> Self {
        IterationStoppingCriterion { max_iterations }
    }
}

impl StoppingCriterion for IterationStoppingCriterion {
    fn evaluate(&mut self, iter: usize, _dt: f64, _t: f64, _c0: f64, _c1: f64, _c2: f64, _vpar: f64) -> bool {
        iter >= self.max_iterations
    }
}

/// Fires when the normalized toroidal flux s leaves the outer bound.
#[derive(Debug, Clone, Copy)]
pub struct MaxToroidalFluxStoppingCriterion {
    pub s_max: f64,
}

impl MaxToroidalFluxStoppingCriterion {
    pub fn new(s_max: f64) -> Self {
        MaxToroidalFluxStoppingCriterion { s_max }
    }
}

impl StoppingCriterion for MaxToroidalFluxStoppingCriterion {
    fn evaluate(&mut self, _iter: usize, _dt: f64, _t: f64, c0: f64, _c1: f64, _c2: f64, _vpar: f64) -> bool {
        c0 > self.s_max
    }
}

/// Fires when the normalized toroidal flux s falls below the inner bound.
#[derive(Debug, Clone, Copy)]
pub struct MinToroidalFluxStoppingCriterion {
    pub s_min: f64,
}

impl MinToroidalFluxStoppingCriterion {
    pub fn new(s_min: f64) -> Self {
        MinToroidalFluxStoppingCriterion { s_min }
    }
}

impl StoppingCriterion for MinToroidalFluxStoppingCriterion {
    fn evaluate(&mut self, _iter: usize, _dt: f64, _t: f64, c0: f64, _c1: f64, _c2: f64, _vpar: f64) -> bool {
        c0 < self.s_min
    }
}

/// Fires after the configured number of toroidal transits, counted on the
/// signed angle by default or on |zeta| when `absolute` is set.
#[derive(Debug, Clone, Copy)]
pub struct ToroidalTransitStoppingCriterion {
    pub max_transits: f64,
    pub absolute: bool,
}

impl ToroidalTransitStoppingCriterion {
    pub fn new(max_transits: usize, absolute: bool) -> Self {
        ToroidalTransitStoppingCriterion {
            max_transits: max_transits as f64,
            absolute,
        }
    }
}

impl StoppingCriterion for ToroidalTransitStoppingCriterion {
    fn evaluate(&mut self, _iter: usize, _dt: f64, _t: f64, _c0: f64, _c1: f64, c2: f64, _vpar: f64) -> bool {
        let transits = c2 / (2.0 * PI);
        let transits = if self.absolute { transits.abs() } else { transits };
        transits >= self.max_transits
    }
}

/// Fires when |v_par| falls below the threshold (trapped-particle turning
/// point detection).
#[derive(Debug, Clone, Copy)]
pub struct VparStoppingCriterion {
    pub vpar_min: f64,
}

impl VparStoppingCriterion {
    pub fn new(vpar_min: f64) -> Self {
        VparStoppingCriterion { vpar_min }
    }
}

impl StoppingCriterion for VparStoppingCriterion {
    fn evaluate(&mut self, _iter: usize, _dt: f64, _t: f64, _c0: f64, _c1: f64, _c2: f64, vpar: f64) -> bool {
        vpar.abs() < self.vpar_min
    }
}

/// Fires when zeta crosses a multiple of the configured period. Stateful:
/// the first evaluation only latches the starting cell.
#[derive(Debug, Clone, Copy)]
pub struct ZetaStoppingCriterion {
    pub period: f64,
    last_cell: Option<f64>,
}

impl ZetaStoppingCriterion {
    pub fn new(period: f64) -> Self {
        ZetaStoppingCriterion {
            period,
            last_cell: None,
        }
    }
}

impl StoppingCriterion for ZetaStoppingCriterion {
    fn evaluate(&mut self, _iter: usize, _dt: f64, _t: f64, _c0: f64, _c1: f64, c2: f64, _vpar: f64) -> bool {
        let cell = (c2 / self.period).floor();
        match self.last_cell {
            None => {
                self.last_cell = Some(cell);
                false
            }
            Some(prev) => {
                self.last_cell = Some(cell);
                prev != cell
            }
        }
    }
}

/// Fires where a sampled 3D level-set function evaluates negative at the
/// current position (trilinear interpolation, boundary-clamped).
#[derive(Debug, Clone)]
pub struct LevelsetStoppingCriterion {
    grid: Grid3D,
    values: Array3<f64>,
}

impl LevelsetStoppingCriterion {
    pub fn new(grid: Grid3D, values: Array3<f64>) -> TracingResult<Self> {
        if values.dim() != (grid.nx, grid.ny, grid.nz) {
            return Err(TracingError::InvalidArgument(format!(
                "level-set sample shape {:?} does not match grid ({}, {}, {})",
                values.dim(),
                grid.nx,
                grid.ny,
                grid.nz
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(TracingError::InvalidArgument(
                "level-set samples must be finite".to_string(),
            ));
        }
        Ok(LevelsetStoppingCriterion { grid, values })
    }
}

impl StoppingCriterion for LevelsetStoppingCriterion {
    fn evaluate(&mut self, _iter: usize, _dt: f64, _t: f64, c0: f64, c1: f64, c2: f64, _vpar: f64) -> bool {
        interp3d(&self.values, &self.grid, c0, c1, c2) < 0.0
    }
}

/// Fires when the accepted step size falls below the floor, guarding
/// against step-size underflow near singular field regions.
#[derive(Debug, Clone, Copy)]
pub struct StepSizeStoppingCriterion {
    pub dt_min: f64,
}

impl StepSizeStoppingCriterion {
    pub fn new(dt_min: f64) -> Self {
        StepSizeStoppingCriterion { dt_min }
    }
}

impl StoppingCriterion for StepSizeStoppingCriterion {
    fn evaluate(&mut self, _iter: usize, dt: f64, _t: f64, _c0: f64, _c1: f64, _c2: f64, _vpar: f64) -> bool {
        dt < self.dt_min
    }
}
