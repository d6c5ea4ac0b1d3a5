// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — Adaptive Integrator and Event Detector
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! The shared trace driver: advances any right-hand side with the dense
//! Dormand-Prince stepper, scans each accepted step for plane and
//! parallel-velocity crossings, refines crossings with the TOMS 748
//! solver on the dense output, and applies the stopping criteria.
//!
//! Within one accepted step, events are emitted in the order v_par planes,
//! then phi planes, then stopping criteria.

use std::f64::consts::PI;

use orbit_math::dopri5::{DormandPrince5, OdeSystem};
use orbit_math::toms748::toms748;
use orbit_types::config::ChartKind;
use orbit_types::error::{TracingError, TracingResult};
use orbit_types::state::{EventKind, OrbitEvent, OrbitTrace, TraceSample};

use crate::chart::{canonicalize, lift_angle};
use crate::stopping::StoppingCriterion;

const ROOT_MAX_EVALS: usize = 200;

/// A right-hand side the driver can trace: an ODE system that also reports
/// the chart its first two state components are expressed in.
pub trait OrbitRhs<const N: usize>: OdeSystem<N> {
    fn chart(&self) -> ChartKind {
        ChartKind::Direct
    }
}

/// Fully resolved inputs of one driver call. Entry points in
/// [`crate::trace`] build this from their public parameters.
#[derive(Debug, Clone)]
pub struct IntegrationParams {
    pub tmax: f64,
    pub dt_initial: f64,
    pub dt_max: f64,
    pub abstol: f64,
    pub reltol: f64,
    /// Toroidal-angle planes; for flux traces these are zeta values.
    pub phis: Vec<f64>,
    /// Rotation frequency of each phi plane (same length as `phis`).
    pub omegas: Vec<f64>,
    /// Parallel-velocity planes (flux traces only).
    pub vpars: Vec<f64>,
    pub phis_stop: bool,
    pub vpars_stop: bool,
    /// Flux-coordinate trace: phi is read from the state's third component
    /// and v_par from its fourth, instead of unwrapping atan2(y, x).
    pub flux: bool,
    /// Record only the initial and terminal trajectory samples.
    pub forget_exact_path: bool,
}

fn vpar_component<const N: usize>(y: &[f64; N]) -> f64 {
    y.get(3).copied().unwrap_or(0.0)
}

/// Advance `rhs` from t = 0 to `params.tmax` or the first terminating
/// event, recording the canonical trajectory and the event log.
pub fn integrate<const N: usize, R: OrbitRhs<N>>(
    rhs: &mut R,
    y0: [f64; N],
    params: &IntegrationParams,
    stopping_criteria: &mut [Box<dyn StoppingCriterion>],
) -> TracingResult<OrbitTrace<N>> {
    if params.omegas.len() != params.phis.len() {
        return Err(TracingError::InvalidArgument(format!(
            "phis/omegas length mismatch: {} phi planes, {} omegas",
            params.phis.len(),
            params.omegas.len()
        )));
    }
    if !params.flux && !params.vpars.is_empty() {
        return Err(TracingError::InvalidArgument(
            "v_par planes require a flux-coordinate trace".to_string(),
        ));
    }

    let chart = rhs.chart();
    let mut trajectory: Vec<TraceSample<N>> = Vec::new();
    let mut events: Vec<OrbitEvent<N>> = Vec::new();
    let mut y = y0;
    let mut t = 0.0;

    if params.tmax <= 0.0 {
        trajectory.push(TraceSample {
            t,
            y: canonicalize(chart, &y),
        });
        return Ok(OrbitTrace { trajectory, events });
    }

    let mut dense = DormandPrince5::new(params.abstol, params.reltol, params.dt_max)?;
    dense.initialize(y, t, params.dt_initial);

    // Bracket-width tolerance of the root refinement, matched to abstol.
    let root_bits = (-params.abstol.log2()).ceil();
    let root_eps = 2.0_f64.powi(-(root_bits as i32));

    let mut iter = 0usize;
    let mut stop = false;
    let mut t_last = 0.0;
    let mut phi_last = if params.flux {
        y[2]
    } else {
        lift_angle(y[0], y[1], PI)
    };
    let mut vpar_last = if params.flux { vpar_component(&y) } else { 0.0 };
    let mut temp = [0.0; N];

    while t < params.tmax && !stop {
        if !params.forget_exact_path || t == 0.0 {
            trajectory.push(TraceSample {
                t,
                y: canonicalize(chart, &y),
            });
        }

        let (t_prev, t_curr) = dense.do_step(rhs)?;
        iter += 1;
        t = dense.current_time();
        y = *dense.current_state();

        let t_current = t;
        let (phi_current, vpar_current) = if params.flux {
            (y[2], vpar_component(&y))
        } else {
            (lift_angle(y[0], y[1], phi_last), 0.0)
        };
        let dt = t_curr - t_prev;

        // v_par plane crossings. Exactly-zero endpoints are excluded so a
        // crossing refined onto a plane is not re-detected next step.
        for (i, &vpar_plane) in params.vpars.iter().enumerate() {
            let f_last = vpar_last - vpar_plane;
            let f_curr = vpar_current - vpar_plane;
            if f_last != 0.0 && f_curr != 0.0 && (f_last > 0.0) != (f_curr > 0.0) {
                let mut rootfun = |tt: f64| {
                    let mut buf = [0.0; N];
                    dense.calc_state(tt, &mut buf);
                    vpar_component(&buf) - vpar_plane
                };
                let (ra, rb) = toms748(
                    &mut rootfun,
                    t_prev,
                    t_curr,
                    f_last,
                    f_curr,
                    root_eps,
                    ROOT_MAX_EVALS,
                )?;
                let t_root = if rootfun(ra).abs() < rootfun(rb).abs() {
                    ra
                } else {
                    rb
                };
                dense.calc_state(t_root, &mut temp);
                let y_keep = canonicalize(chart, &temp);
                events.push(OrbitEvent {
                    t: t_root,
                    kind: EventKind::VparPlane(i),
                    y: y_keep,
                });
                if params.vpars_stop {
                    trajectory.push(TraceSample { t: t_root, y: y_keep });
                    stop = true;
                    break;
                }
            }
        }

        // Phi plane crossings, detected in the co-rotating phase
        // phi - omega t. The first step is skipped to avoid a spurious
        // crossing at initialization.
        for (i, (&phi_plane, &omega)) in params.phis.iter().zip(&params.omegas).enumerate() {
            let phase_last = phi_last - omega * t_last;
            let phase_current = phi_current - omega * t_current;
            if t_last != 0.0
                && ((phase_last - phi_plane) / (2.0 * PI)).floor()
                    != ((phase_current - phi_plane) / (2.0 * PI)).floor()
            {
                // Branch of the plane actually crossed in this step.
                let branch =
                    ((0.5 * (phase_last + phase_current) - phi_plane) / (2.0 * PI)).round();
                let phase_shift = branch * 2.0 * PI + phi_plane;
                debug_assert!(
                    (phase_last <= phase_shift && phase_shift <= phase_current)
                        || (phase_current <= phase_shift && phase_shift <= phase_last),
                    "crossed plane branch must lie between the phase endpoints"
                );
                let mut rootfun = |tt: f64| {
                    let mut buf = [0.0; N];
                    dense.calc_state(tt, &mut buf);
                    let raw = if params.flux {
                        buf[2]
                    } else {
                        lift_angle(buf[0], buf[1], phi_last)
                    };
                    raw - omega * tt - phase_shift
                };
                let (ra, rb) = toms748(
                    &mut rootfun,
                    t_prev,
                    t_curr,
                    phase_last - phase_shift,
                    phase_current - phase_shift,
                    root_eps,
                    ROOT_MAX_EVALS,
                )?;
                let t_root = if rootfun(ra).abs() < rootfun(rb).abs() {
                    ra
                } else {
                    rb
                };
                dense.calc_state(t_root, &mut temp);
                let y_keep = canonicalize(chart, &temp);
                events.push(OrbitEvent {
                    t: t_root,
                    kind: EventKind::PhiPlane(i),
                    y: y_keep,
                });
                if params.phis_stop {
                    trajectory.push(TraceSample { t: t_root, y: y_keep });
                    stop = true;
                    break;
                }
            }
        }

        // Stopping criteria, in caller order; the first to fire wins.
        for (i, criterion) in stopping_criteria.iter_mut().enumerate() {
            let y_keep = canonicalize(chart, &y);
            if criterion.evaluate(
                iter,
                dt,
                t,
                y_keep[0],
                y_keep[1],
                y_keep[2],
                vpar_component(&y_keep),
            ) {
                stop = true;
                trajectory.push(TraceSample { t, y: y_keep });
                events.push(OrbitEvent {
                    t,
                    kind: EventKind::Stop(i),
                    y: y_keep,
                });
                break;
            }
        }

        t_last = t_current;
        phi_last = phi_current;
        vpar_last = vpar_current;
    }

    if !stop {
        dense.calc_state(params.tmax, &mut temp);
        trajectory.push(TraceSample {
            t: params.tmax,
            y: canonicalize(chart, &temp),
        });
    }

    Ok(OrbitTrace { trajectory, events })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Synthetic flux-like system with constant rates: zeta and v_par are
    /// linear in t, which makes every crossing time exact.
    struct LinearFluxRhs {
        s_rate: f64,
        zeta_rate: f64,
        vpar_rate: f64,
    }

    impl OdeSystem<4> for LinearFluxRhs {
        fn eval(&mut self, _t: f64, _y: &[f64; 4], dydt: &mut [f64; 4]) -> TracingResult<()> {
            dydt[0] = self.s_rate;
            dydt[1] = 0.0;
            dydt[2] = self.zeta_rate;
            dydt[3] = self.vpar_rate;
            Ok(())
        }
    }

    impl OrbitRhs<4> for LinearFluxRhs {}

    fn flux_params(tmax: f64) -> IntegrationParams {
        IntegrationParams {
            tmax,
            dt_initial: 1e-3,
            dt_max: 0.5,
            abstol: 1e-10,
            reltol: 1e-10,
            phis: vec![],
            omegas: vec![],
            vpars: vec![],
            phis_stop: false,
            vpars_stop: false,
            flux: true,
            forget_exact_path: false,
        }
    }

    fn assert_monotonic<const N: usize>(trace: &OrbitTrace<N>) {
        for pair in trace.trajectory.windows(2) {
            assert!(
                pair[1].t > pair[0].t,
                "trajectory times not strictly increasing: {} then {}",
                pair[0].t,
                pair[1].t
            );
        }
        for pair in trace.events.windows(2) {
            assert!(
                pair[1].t >= pair[0].t,
                "event times decreased: {} then {}",
                pair[0].t,
                pair[1].t
            );
        }
    }

    #[test]
    fn test_normal_completion_ends_at_tmax() {
        let mut rhs = LinearFluxRhs {
            s_rate: 0.01,
            zeta_rate: 1.0,
            vpar_rate: 0.0,
        };
        let mut criteria: Vec<Box<dyn StoppingCriterion>> = vec![];
        let trace = integrate(&mut rhs, [0.1, 0.0, 0.0, 1.0], &flux_params(3.0), &mut criteria)
            .expect("trace");
        assert_monotonic(&trace);
        let last = trace.trajectory.last().expect("non-empty");
        assert!((last.t - 3.0).abs() < 1e-12, "last sample at tmax");
        assert!((last.y[2] - 3.0).abs() < 1e-8, "zeta = t");
        assert!(trace.events.is_empty());
    }

    #[test]
    fn test_tmax_zero_returns_single_sample() {
        let mut rhs = LinearFluxRhs {
            s_rate: 0.0,
            zeta_rate: 1.0,
            vpar_rate: 0.0,
        };
        let mut criteria: Vec<Box<dyn StoppingCriterion>> = vec![];
        let trace = integrate(&mut rhs, [0.2, 0.1, 0.3, 1.0], &flux_params(0.0), &mut criteria)
            .expect("trace");
        assert_eq!(trace.trajectory.len(), 1);
        assert_eq!(trace.trajectory[0].t, 0.0);
        assert!(trace.events.is_empty());
    }

    #[test]
    fn test_vpar_crossing_time_is_exact_for_linear_vpar() {
        // v_par(t) = 1 - t crosses 0.4 at t = 0.6.
        let mut rhs = LinearFluxRhs {
            s_rate: 0.0,
            zeta_rate: 1.0,
            vpar_rate: -1.0,
        };
        let mut params = flux_params(2.0);
        params.vpars = vec![0.4];
        let mut criteria: Vec<Box<dyn StoppingCriterion>> = vec![];
        let trace =
            integrate(&mut rhs, [0.1, 0.0, 0.0, 1.0], &params, &mut criteria).expect("trace");
        assert_eq!(trace.events.len(), 1);
        let event = &trace.events[0];
        assert_eq!(event.kind, EventKind::VparPlane(0));
        assert!(
            (event.t - 0.6).abs() < 1e-8,
            "crossing at t = {}, expected 0.6",
            event.t
        );
        assert!((event.y[3] - 0.4).abs() < 1e-8);
    }

    #[test]
    fn test_vpar_plane_equal_to_initial_value_is_not_a_crossing() {
        let mut rhs = LinearFluxRhs {
            s_rate: 0.0,
            zeta_rate: 1.0,
            vpar_rate: -0.5,
        };
        let mut params = flux_params(1.0);
        params.vpars = vec![1.0]; // exactly the initial v_par
        let mut criteria: Vec<Box<dyn StoppingCriterion>> = vec![];
        let trace =
            integrate(&mut rhs, [0.1, 0.0, 0.0, 1.0], &params, &mut criteria).expect("trace");
        assert!(
            trace.events.is_empty(),
            "a plane equal to the initial v_par must not fire"
        );
    }

    #[test]
    fn test_vpars_stop_terminates_at_crossing() {
        let mut rhs = LinearFluxRhs {
            s_rate: 0.0,
            zeta_rate: 1.0,
            vpar_rate: -1.0,
        };
        let mut params = flux_params(5.0);
        params.vpars = vec![0.0];
        params.vpars_stop = true;
        let mut criteria: Vec<Box<dyn StoppingCriterion>> = vec![];
        let trace =
            integrate(&mut rhs, [0.1, 0.0, 0.0, 1.0], &params, &mut criteria).expect("trace");
        assert_eq!(trace.events.len(), 1);
        assert!((trace.events[0].t - 1.0).abs() < 1e-8);
        let last = trace.trajectory.last().expect("non-empty");
        assert!(
            (last.t - trace.events[0].t).abs() < 1e-14,
            "trajectory must terminate at the crossing"
        );
    }

    #[test]
    fn test_stationary_phi_plane_crossing() {
        // zeta(t) = 2t crosses the phi = 0 plane branch at zeta = 2 pi,
        // i.e. t = pi.
        let mut rhs = LinearFluxRhs {
            s_rate: 0.0,
            zeta_rate: 2.0,
            vpar_rate: 0.0,
        };
        let mut params = flux_params(4.0);
        params.phis = vec![0.0];
        params.omegas = vec![0.0];
        let mut criteria: Vec<Box<dyn StoppingCriterion>> = vec![];
        let trace =
            integrate(&mut rhs, [0.1, 0.0, 0.0, 1.0], &params, &mut criteria).expect("trace");
        assert_eq!(trace.events.len(), 1);
        let event = &trace.events[0];
        assert_eq!(event.kind, EventKind::PhiPlane(0));
        assert!(
            (event.t - PI).abs() < 1e-8,
            "crossing at t = {}, expected pi",
            event.t
        );
    }

    #[test]
    fn test_moving_phi_plane_uses_co_rotating_phase() {
        // zeta(t) = 2t against omega = 1: the phase (2 - 1) t crosses
        // 2 pi at t = 2 pi, not at zeta = 2 pi (t = pi).
        let mut rhs = LinearFluxRhs {
            s_rate: 0.0,
            zeta_rate: 2.0,
            vpar_rate: 0.0,
        };
        let mut params = flux_params(7.0);
        params.phis = vec![0.0];
        params.omegas = vec![1.0];
        let mut criteria: Vec<Box<dyn StoppingCriterion>> = vec![];
        let trace =
            integrate(&mut rhs, [0.1, 0.0, 0.0, 1.0], &params, &mut criteria).expect("trace");
        assert_eq!(trace.events.len(), 1);
        let event = &trace.events[0];
        assert!(
            (event.t - 2.0 * PI).abs() < 1e-7,
            "moving-plane crossing at t = {}, expected 2 pi",
            event.t
        );
    }

    #[test]
    fn test_starting_on_plane_emits_no_event_at_t_zero() {
        // zeta starts exactly on the phi = 0 plane; the first-step skip
        // must suppress a crossing at initialization.
        let mut rhs = LinearFluxRhs {
            s_rate: 0.0,
            zeta_rate: 1.0,
            vpar_rate: 0.0,
        };
        let mut params = flux_params(1.0);
        params.phis = vec![0.0];
        params.omegas = vec![0.0];
        let mut criteria: Vec<Box<dyn StoppingCriterion>> = vec![];
        let trace =
            integrate(&mut rhs, [0.1, 0.0, 0.0, 1.0], &params, &mut criteria).expect("trace");
        assert!(trace.events.is_empty(), "no event at t = 0");
    }

    #[test]
    fn test_iteration_criterion_bounds_trajectory_length() {
        let mut rhs = LinearFluxRhs {
            s_rate: 0.0,
            zeta_rate: 1.0,
            vpar_rate: 0.0,
        };
        let mut criteria: Vec<Box<dyn StoppingCriterion>> =
            vec![Box::new(crate::stopping::IterationStoppingCriterion::new(5))];
        let trace = integrate(
            &mut rhs,
            [0.1, 0.0, 0.0, 1.0],
            &flux_params(1e6),
            &mut criteria,
        )
        .expect("trace");
        assert!(
            trace.trajectory.len() <= 6,
            "expected at most 6 samples, got {}",
            trace.trajectory.len()
        );
        assert_eq!(trace.events.len(), 1);
        assert_eq!(trace.events[0].kind, EventKind::Stop(0));
    }

    #[test]
    fn test_forget_exact_path_keeps_two_samples() {
        let mut rhs = LinearFluxRhs {
            s_rate: 0.01,
            zeta_rate: 1.0,
            vpar_rate: 0.0,
        };
        let mut params = flux_params(3.0);
        params.forget_exact_path = true;
        let mut criteria: Vec<Box<dyn StoppingCriterion>> = vec![];
        let trace =
            integrate(&mut rhs, [0.1, 0.0, 0.0, 1.0], &params, &mut criteria).expect("trace");
        assert_eq!(trace.trajectory.len(), 2);
        assert_eq!(trace.trajectory[0].t, 0.0);
        assert!((trace.trajectory[1].t - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_multiple_vpar_planes_in_one_step_all_emit() {
        // Steep v_par ramp with a large step crosses both planes within
        // one accepted step; both events must appear, ordered in time.
        let mut rhs = LinearFluxRhs {
            s_rate: 0.0,
            zeta_rate: 0.1,
            vpar_rate: -10.0,
        };
        let mut params = flux_params(1.0);
        params.vpars = vec![0.75, 0.25];
        let mut criteria: Vec<Box<dyn StoppingCriterion>> = vec![];
        let trace =
            integrate(&mut rhs, [0.1, 0.0, 0.0, 1.0], &params, &mut criteria).expect("trace");
        assert_eq!(trace.events.len(), 2);
        let t_hi = trace
            .events
            .iter()
            .find(|e| e.kind == EventKind::VparPlane(0))
            .expect("plane 0")
            .t;
        let t_lo = trace
            .events
            .iter()
            .find(|e| e.kind == EventKind::VparPlane(1))
            .expect("plane 1")
            .t;
        assert!((t_hi - 0.025).abs() < 1e-8);
        assert!((t_lo - 0.075).abs() < 1e-8);
    }

    #[test]
    fn test_omegas_length_mismatch_rejected() {
        let mut rhs = LinearFluxRhs {
            s_rate: 0.0,
            zeta_rate: 1.0,
            vpar_rate: 0.0,
        };
        let mut params = flux_params(1.0);
        params.phis = vec![0.0, 1.0];
        params.omegas = vec![0.0];
        let mut criteria: Vec<Box<dyn StoppingCriterion>> = vec![];
        let err = integrate(&mut rhs, [0.1, 0.0, 0.0, 1.0], &params, &mut criteria).unwrap_err();
        assert!(matches!(err, TracingError::InvalidArgument(_)));
    }

    #[test]
    fn test_vpar_planes_without_flux_rejected() {
        let mut rhs = LinearFluxRhs {
            s_rate: 0.0,
            zeta_rate: 1.0,
            vpar_rate: 0.0,
        };
        let mut params = flux_params(1.0);
        params.flux = false;
        params.vpars = vec![0.0];
        let mut criteria: Vec<Box<dyn StoppingCriterion>> = vec![];
        let err = integrate(&mut rhs, [1.0, 0.0, 0.0, 1.0], &params, &mut criteria).unwrap_err();
        assert!(matches!(err, TracingError::InvalidArgument(_)));
    }

    #[test]
    fn test_event_state_is_dense_interpolation() {
        // s(t) = 0.1 + 0.05 t; at the v_par crossing t = 0.5 the event
        // state must hold the interpolated s, not a step endpoint.
        let mut rhs = LinearFluxRhs {
            s_rate: 0.05,
            zeta_rate: 1.0,
            vpar_rate: -2.0,
        };
        let mut params = flux_params(2.0);
        params.vpars = vec![0.0];
        let mut criteria: Vec<Box<dyn StoppingCriterion>> = vec![];
        let trace =
            integrate(&mut rhs, [0.1, 0.0, 0.0, 1.0], &params, &mut criteria).expect("trace");
        assert_eq!(trace.events.len(), 1);
        let event = &trace.events[0];
        assert!((event.t - 0.5).abs() < 1e-8);
        assert!(
            (event.y[0] - 0.125).abs() < 1e-8,
            "interpolated s = {}, expected 0.125",
            event.y[0]
        );
    }
}
