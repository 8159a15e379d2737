//! # Controllers module
//!
//! This module provides the PID controller used to hold the chassis heading
//! while following a trajectory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::{Deserialize, Serialize};

// Internal
use util::maths::fit_to_range;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The time step assumed for the first call after a reset, in milliseconds.
pub const FIRST_TICK_MS: f64 = 1.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains and limits of a PID controller.
#[derive(Debug, Copy, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PidParams {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Feed-forward gain, applied with the sign of the error
    pub k_f: f64,

    /// Output saturation as `[min, max]`, or no saturation if missing
    #[serde(default)]
    pub output_limits: Option<[f64; 2]>,
}

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Feed-forward gain
    k_f: f64,

    /// Output limits
    limits: Option<(f64, f64)>,

    /// Time (ms) and error of the previous call, `None` until the controller
    /// has been armed by its first call after a reset.
    prev: Option<(f64, f64)>,

    /// The integral accumulation
    integral: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum PidError {
    /// The controller was called again without any time passing.
    #[error("PID controller called with a non-positive time step ({0} ms)")]
    DegenerateTimestep(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains and no output limits.
    pub fn new(k_p: f64, k_i: f64, k_d: f64, k_f: f64) -> Self {
        Self {
            k_p, k_i, k_d, k_f,
            limits: None,
            prev: None,
            integral: 0f64,
        }
    }

    /// Create a new controller from its parameters.
    pub fn from_params(params: &PidParams) -> Self {
        let ctrl = Self::new(params.k_p, params.k_i, params.k_d, params.k_f);

        match params.output_limits {
            Some([min, max]) => ctrl.with_limits(min, max),
            None => ctrl
        }
    }

    /// Saturate the output of the controller to `[min, max]`.
    pub fn with_limits(mut self, min: f64, max: f64) -> Self {
        self.limits = Some((min, max));
        self
    }

    /// Get the value of the controller for the given position and setpoint at
    /// time `now_ms`.
    ///
    /// The first call after construction or `reset` assumes the previous call
    /// was one tick earlier with the same error, so it produces no derivative
    /// kick. Calls without time passing are rejected and leave the controller
    /// unchanged.
    pub fn get(&mut self, position: f64, setpoint: f64, now_ms: f64) -> Result<f64, PidError> {
        let error = setpoint - position;

        let (prev_time, prev_error) = match self.prev {
            Some(p) => p,
            None => {
                self.integral = 0f64;
                (now_ms - FIRST_TICK_MS, error)
            }
        };

        let dt = now_ms - prev_time;
        if dt <= 0f64 {
            return Err(PidError::DegenerateTimestep(dt));
        }

        // Accumulate the integral term
        self.integral += error * dt;

        let p = self.k_p * error;
        let i = self.k_i * self.integral;
        let d = self.k_d * (error - prev_error) / dt;
        let f = if error == 0f64 { 0f64 } else { self.k_f.copysign(error) };

        // Remember the previous error and time
        self.prev = Some((now_ms, error));

        let out = p + i + d + f;

        trace!("PID: err {:.4}, p {:.4}, i {:.4}, d {:.4}, f {:.4}", error, p, i, d, f);

        Ok(match self.limits {
            Some((min, max)) => fit_to_range(out, min, max),
            None => out
        })
    }

    /// Re-arm the controller so that the next call initialises it again.
    ///
    /// Gains and limits are unchanged.
    pub fn reset(&mut self) {
        self.prev = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_proportional() {
        let mut pid = PidController::new(2.0, 0.0, 0.0, 0.0);
        assert_eq!(pid.get(1.0, 1.5, 100.0).unwrap(), 1.0);
        assert_eq!(pid.get(2.0, 1.5, 110.0).unwrap(), -1.0);
    }

    #[test]
    fn test_first_call_has_no_derivative_kick() {
        let mut pid = PidController::new(0.0, 1.0, 1.0, 0.0);

        // First call: dt is one tick, integral is error * 1, derivative is 0
        assert_relative_eq!(pid.get(0.0, 2.0, 500.0).unwrap(), 2.0);

        // Second call: integral 2 + 3 * 10, derivative (3 - 2) / 10
        assert_relative_eq!(pid.get(0.0, 3.0, 510.0).unwrap(), 32.0 + 0.1);
    }

    #[test]
    fn test_feed_forward_and_limits() {
        let mut pid = PidController::new(0.008, 0.0, 0.0, 0.008).with_limits(-1.0, 1.0);

        assert_relative_eq!(pid.get(10.0, 0.0, 0.0).unwrap(), -0.088);
        assert_relative_eq!(pid.get(-10.0, 0.0, 10.0).unwrap(), 0.088);
        assert_eq!(pid.get(0.0, 0.0, 20.0).unwrap(), 0.0);
        assert_eq!(pid.get(-1000.0, 0.0, 30.0).unwrap(), 1.0);
        assert_eq!(pid.get(1000.0, 0.0, 40.0).unwrap(), -1.0);
    }

    #[test]
    fn test_degenerate_timestep() {
        let mut pid = PidController::new(1.0, 1.0, 0.0, 0.0);
        let first = pid.get(0.0, 1.0, 50.0).unwrap();

        assert_eq!(pid.get(0.0, 1.0, 50.0), Err(PidError::DegenerateTimestep(0.0)));

        // Rejected call must not have touched the integral
        assert_relative_eq!(pid.get(0.0, 1.0, 51.0).unwrap(), first + 1.0);
    }

    #[test]
    fn test_reset() {
        let mut pid = PidController::new(0.0, 1.0, 0.0, 0.0);
        pid.get(0.0, 1.0, 0.0).unwrap();
        pid.get(0.0, 1.0, 100.0).unwrap();

        pid.reset();

        // Integral starts from zero again
        assert_relative_eq!(pid.get(0.0, 1.0, 200.0).unwrap(), 1.0);
    }

    #[test]
    fn test_from_params() {
        let params: PidParams = util::params::from_str(
            "k_p = 0.015\nk_i = 0.0\nk_d = 0.0\nk_f = 0.008\noutput_limits = [-1.0, 1.0]",
        )
        .unwrap();
        let mut pid = PidController::from_params(&params);

        assert_eq!(pid.get(0.0, 1000.0, 0.0).unwrap(), 1.0);

        let mut pid = PidController::from_params(&PidParams { k_p: 1.0, ..Default::default() });
        assert_eq!(pid.get(0.0, 1000.0, 0.0).unwrap(), 1000.0);
    }
}
