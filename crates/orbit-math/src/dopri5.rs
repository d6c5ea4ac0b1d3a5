// ─────────────────────────────────────────────────────────────────────
// SCPN Orbit Tracing — Dormand-Prince 5(4) Dense Stepper
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Adaptive Dormand-Prince 5(4) integration with dense output.
//!
//! Explicit 7-stage embedded pair (FSAL) after Hairer, Norsett & Wanner,
//! "Solving Ordinary Differential Equations I", with the 4th-order dense
//! output polynomial. The stepper exposes the accepted-step interval and
//! continuous interpolation inside it, which the event detector needs for
//! sub-step root refinement.

use orbit_types::error::{TracingError, TracingResult};

/// System of first-order ODEs dy/dt = f(t, y).
///
/// `eval` is fallible so that failures of an external collaborator (the
/// magnetic field evaluator) surface through the stepper unchanged.
pub trait OdeSystem<const N: usize> {
    fn eval(&mut self, t: f64, y: &[f64; N], dydt: &mut [f64; N]) -> TracingResult<()>;
}

// Butcher tableau (Dormand & Prince 1980).
const C2: f64 = 0.2;
const C3: f64 = 0.3;
const C4: f64 = 0.8;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 0.2;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const A71: f64 = 35.0 / 384.0;
const A73: f64 = 500.0 / 1113.0;
const A74: f64 = 125.0 / 192.0;
const A75: f64 = -2187.0 / 6784.0;
const A76: f64 = 11.0 / 84.0;

// Embedded error coefficients.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

// Dense-output coefficients.
const D1: f64 = -12715105075.0 / 11282082432.0;
const D3: f64 = 87487479700.0 / 32700410799.0;
const D4: f64 = -10690763975.0 / 1880347072.0;
const D5: f64 = 701980252875.0 / 199316789632.0;
const D6: f64 = -1453857185.0 / 822651844.0;
const D7: f64 = 69997945.0 / 29380423.0;

// Step-size controller (Lund stabilization).
const SAFETY: f64 = 0.9;
const BETA: f64 = 0.04;
const EXPO1: f64 = 0.2 - BETA * 0.75;
const FACC1: f64 = 5.0; // 1 / fac1, max shrink per attempt
const FACC2: f64 = 0.1; // 1 / fac2, max growth per step
const MAX_ATTEMPTS: usize = 100;

/// Dormand-Prince 5(4) stepper with dense output over the last accepted
/// step. Integration is forward in time.
#[derive(Debug, Clone)]
pub struct DormandPrince5<const N: usize> {
    abstol: f64,
    reltol: f64,
    h_max: f64,
    h: f64,
    h_last: f64,
    t_old: f64,
    t: f64,
    y: [f64; N],
    k1: [f64; N],
    cont: [[f64; N]; 5],
    fresh: bool,
    facold: f64,
    pub n_evals: u64,
    pub n_accepted: u64,
    pub n_rejected: u64,
}

impl<const N: usize> DormandPrince5<N> {
    pub fn new(abstol: f64, reltol: f64, h_max: f64) -> TracingResult<Self> {
        if !abstol.is_finite() || abstol <= 0.0 {
            return Err(TracingError::InvalidArgument(format!(
                "abstol must be finite and > 0, got {abstol}"
            )));
        }
        if !reltol.is_finite() || reltol < 0.0 {
            return Err(TracingError::InvalidArgument(format!(
                "reltol must be finite and >= 0, got {reltol}"
            )));
        }
        if !h_max.is_finite() || h_max <= 0.0 {
            return Err(TracingError::InvalidArgument(format!(
                "h_max must be finite and > 0, got {h_max}"
            )));
        }
        Ok(DormandPrince5 {
            abstol,
            reltol,
            h_max,
            h: h_max,
            h_last: 0.0,
            t_old: 0.0,
            t: 0.0,
            y: [0.0; N],
            k1: [0.0; N],
            cont: [[0.0; N]; 5],
            fresh: true,
            facold: 1e-4,
            n_evals: 0,
            n_accepted: 0,
            n_rejected: 0,
        })
    }

    /// Seed the stepper with an initial state and step-size guess.
    pub fn initialize(&mut self, y0: [f64; N], t0: f64, h0: f64) {
        self.y = y0;
        self.t = t0;
        self.t_old = t0;
        self.h = h0.abs().min(self.h_max).max(f64::MIN_POSITIVE);
        self.h_last = 0.0;
        self.cont = [[0.0; N]; 5];
        self.fresh = true;
        self.facold = 1e-4;
    }

    pub fn current_time(&self) -> f64 {
        self.t
    }

    pub fn current_state(&self) -> &[f64; N] {
        &self.y
    }

    /// Take one accepted step, retrying with smaller step sizes on error
    /// rejection. Returns the accepted interval (t_prev, t_curr).
    pub fn do_step<S: OdeSystem<N>>(&mut self, sys: &mut S) -> TracingResult<(f64, f64)> {
        if self.fresh {
            let (t, y) = (self.t, self.y);
            sys.eval(t, &y, &mut self.k1)?;
            self.n_evals += 1;
            self.fresh = false;
        }

        let mut k2 = [0.0; N];
        let mut k3 = [0.0; N];
        let mut k4 = [0.0; N];
        let mut k5 = [0.0; N];
        let mut k6 = [0.0; N];
        let mut k7 = [0.0; N];
        let mut y1 = [0.0; N];
        let mut y_stage = [0.0; N];

        for _ in 0..MAX_ATTEMPTS {
            let h = self.h.min(self.h_max);
            if 0.1 * h <= self.t.abs() * f64::EPSILON {
                return Err(TracingError::Numeric {
                    t: self.t,
                    message: format!("step size underflow: h = {h:e}"),
                });
            }

            for i in 0..N {
                y_stage[i] = self.y[i] + h * A21 * self.k1[i];
            }
            sys.eval(self.t + C2 * h, &y_stage, &mut k2)?;

            for i in 0..N {
                y_stage[i] = self.y[i] + h * (A31 * self.k1[i] + A32 * k2[i]);
            }
            sys.eval(self.t + C3 * h, &y_stage, &mut k3)?;

            for i in 0..N {
                y_stage[i] = self.y[i] + h * (A41 * self.k1[i] + A42 * k2[i] + A43 * k3[i]);
            }
            sys.eval(self.t + C4 * h, &y_stage, &mut k4)?;

            for i in 0..N {
                y_stage[i] = self.y[i]
                    + h * (A51 * self.k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
            }
            sys.eval(self.t + C5 * h, &y_stage, &mut k5)?;

            for i in 0..N {
                y_stage[i] = self.y[i]
                    + h * (A61 * self.k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i]
                        + A65 * k5[i]);
            }
            let t_new = self.t + h;
            sys.eval(t_new, &y_stage, &mut k6)?;

            for i in 0..N {
                y1[i] = self.y[i]
                    + h * (A71 * self.k1[i] + A73 * k3[i] + A74 * k4[i] + A75 * k5[i]
                        + A76 * k6[i]);
            }
            sys.eval(t_new, &y1, &mut k7)?;
            self.n_evals += 6;

            // Scaled RMS error of the embedded 4th-order solution.
            let mut err = 0.0;
            for i in 0..N {
                let e = h
                    * (E1 * self.k1[i]
                        + E3 * k3[i]
                        + E4 * k4[i]
                        + E5 * k5[i]
                        + E6 * k6[i]
                        + E7 * k7[i]);
                let scale = self.abstol + self.reltol * self.y[i].abs().max(y1[i].abs());
                err += (e / scale) * (e / scale);
            }
            err = (err / N as f64).sqrt();

            let fac11 = err.powf(EXPO1);
            if err <= 1.0 {
                self.facold = err.max(1e-4);
                let fac = (fac11 / self.facold.powf(BETA) / SAFETY).clamp(FACC2, FACC1);
                let h_next = (h / fac).min(self.h_max);

                if !y1.iter().all(|v| v.is_finite()) {
                    return Err(TracingError::Numeric {
                        t: t_new,
                        message: "state became non-finite".to_string(),
                    });
                }

                for i in 0..N {
                    let ydiff = y1[i] - self.y[i];
                    let bspl = h * self.k1[i] - ydiff;
                    self.cont[0][i] = self.y[i];
                    self.cont[1][i] = ydiff;
                    self.cont[2][i] = bspl;
                    self.cont[3][i] = ydiff - h * k7[i] - bspl;
                    self.cont[4][i] = h
                        * (D1 * self.k1[i]
                            + D3 * k3[i]
                            + D4 * k4[i]
                            + D5 * k5[i]
                            + D6 * k6[i]
                            + D7 * k7[i]);
                }

                self.t_old = self.t;
                self.t = t_new;
                self.h_last = h;
                self.y = y1;
                self.k1 = k7;
                self.h = h_next;
                self.n_accepted += 1;
                return Ok((self.t_old, self.t));
            }

            self.h = h / FACC1.min(fac11 / SAFETY);
            self.n_rejected += 1;
        }

        Err(TracingError::Numeric {
            t: self.t,
            message: format!("no accepted step within {MAX_ATTEMPTS} attempts"),
        })
    }

    /// Evaluate the dense-output polynomial of the last accepted step at
    /// `t`, which must lie inside [t_prev, t_curr].
    pub fn calc_state(&self, t: f64, y_out: &mut [f64; N]) {
        let theta = (t - self.t_old) / self.h_last;
        let theta1 = 1.0 - theta;
        for i in 0..N {
            y_out[i] = self.cont[0][i]
                + theta
                    * (self.cont[1][i]
                        + theta1
                            * (self.cont[2][i]
                                + theta * (self.cont[3][i] + theta1 * self.cont[4][i])));
        }
    }
}
