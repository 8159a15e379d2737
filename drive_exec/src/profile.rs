//! # Velocity profile
//!
//! A closed form S-curve giving the demanded speed at a position along a
//! trajectory. The curve is the product of two logistic functions, one rising
//! from the initial speed towards the maximum and one falling from the maximum
//! towards the final speed:
//!
//! ```text
//! speed(x) = m^2 / ((1 + (m/s1 - 1) e^(-k1 x)) (1 + (m/s2 - 1) e^(k2 x - k2 d)))
//! ```
//!
//! The output is a dimensionless actuation fraction and is not clamped.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default length of the profile's domain.
pub const DEFAULT_DOMAIN: f64 = 100.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A stateless S-curve velocity profile.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct VelocityProfile {
    /// Initial speed (s1), non-zero
    initial_speed: f64,

    /// Final speed (s2), non-zero
    final_speed: f64,

    /// Acceleration slope (k1), non-negative
    accel_slope: f64,

    /// Deceleration slope (k2), non-negative
    decel_slope: f64,

    /// Maximum speed (m)
    max_speed: f64,

    /// Domain length (d)
    domain: f64,
}

/// Parameters describing a velocity profile, as found in parameter files.
#[derive(Debug, Copy, Clone, Deserialize, Serialize)]
pub struct ProfileParams {
    pub initial_speed: f64,
    pub final_speed: f64,
    pub accel_slope: f64,
    pub decel_slope: f64,
    pub max_speed: f64,

    #[serde(default = "default_domain")]
    pub domain: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProfileError {
    #[error(
        "Initial and final speeds of a velocity profile must be non-zero numbers, \
         found {initial_speed} and {final_speed}"
    )]
    InvalidProfile { initial_speed: f64, final_speed: f64 },

    #[error(
        "Slopes of a velocity profile must not be negative, found {accel_slope} and \
         {decel_slope}"
    )]
    InvalidSlope { accel_slope: f64, decel_slope: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VelocityProfile {
    /// Create a new profile over the default domain of 100.
    pub fn new(
        initial_speed: f64,
        final_speed: f64,
        accel_slope: f64,
        decel_slope: f64,
        max_speed: f64,
    ) -> Result<Self, ProfileError> {
        Self::with_domain(
            initial_speed,
            final_speed,
            accel_slope,
            decel_slope,
            max_speed,
            DEFAULT_DOMAIN,
        )
    }

    /// Create a new profile over the given domain length.
    pub fn with_domain(
        initial_speed: f64,
        final_speed: f64,
        accel_slope: f64,
        decel_slope: f64,
        max_speed: f64,
        domain: f64,
    ) -> Result<Self, ProfileError> {
        let invalid_speed = |s: f64| s == 0.0 || s.is_nan();
        if invalid_speed(initial_speed) || invalid_speed(final_speed) {
            return Err(ProfileError::InvalidProfile {
                initial_speed,
                final_speed,
            });
        }

        // Negated so that NaN slopes are caught too
        if !(accel_slope >= 0.0 && decel_slope >= 0.0) {
            return Err(ProfileError::InvalidSlope {
                accel_slope,
                decel_slope,
            });
        }

        Ok(Self {
            initial_speed,
            final_speed,
            accel_slope,
            decel_slope,
            max_speed,
            domain,
        })
    }

    /// Create a profile from its parameters.
    pub fn from_params(params: &ProfileParams) -> Result<Self, ProfileError> {
        Self::with_domain(
            params.initial_speed,
            params.final_speed,
            params.accel_slope,
            params.decel_slope,
            params.max_speed,
            params.domain,
        )
    }

    /// Speed demand at the given position in the domain.
    pub fn get(&self, position: f64) -> f64 {
        let m = self.max_speed;

        let c1 = 1.0 + (m / self.initial_speed - 1.0) * (-self.accel_slope * position).exp();
        let c2 = 1.0
            + (m / self.final_speed - 1.0)
                * (self.decel_slope * position - self.decel_slope * self.domain).exp();

        (m * m) / (c1 * c2)
    }

    /// The length of the profile's domain.
    pub fn domain(&self) -> f64 {
        self.domain
    }
}

fn default_domain() -> f64 {
    DEFAULT_DOMAIN
}
