//! Drive controller parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::controllers::PidParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the differential chassis.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiffDriveParams {
    /// Motor speed at a full demand of 1, in rpm
    pub max_velocity_rpm: f64,

    /// Scale applied to rotation demands before mixing
    pub rotation_scaler: f64,

    /// Diameter of the odometry wheels in inches
    pub odometry_wheel_diameter_in: f64,

    /// Heading hold controller
    pub omega_pid: PidParams,

    pub left_encoder_reversed: bool,
    pub right_encoder_reversed: bool,

    /// Period with which to poll the heading sensor during calibration
    pub calibration_poll_ms: f64,

    /// Time after which a calibration that hasn't finished is a failure
    pub calibration_timeout_ms: f64,
}

/// Parameters for the holonomic (X-drive) chassis.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HoloDriveParams {
    /// Motor speed at a full demand of 1, in rpm
    pub wheel_max_rpm: f64,

    /// Diameter of the odometry wheels in inches
    pub odometry_wheel_diameter_in: f64,

    /// If true translation demands are in the field frame, otherwise they are
    /// in the chassis frame.
    pub field_centric: bool,

    /// Heading hold controller
    pub omega_pid: PidParams,

    pub left_encoder_reversed: bool,
    pub right_encoder_reversed: bool,
    pub rear_encoder_reversed: bool,

    pub calibration_poll_ms: f64,
    pub calibration_timeout_ms: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DiffDriveParams {
    fn default() -> Self {
        Self {
            max_velocity_rpm: 200.0,
            rotation_scaler: 0.6,
            odometry_wheel_diameter_in: 2.75,
            omega_pid: PidParams {
                k_p: 0.008,
                k_i: 0.0,
                k_d: 0.0,
                k_f: 0.008,
                output_limits: Some([-1.0, 1.0]),
            },
            left_encoder_reversed: false,
            right_encoder_reversed: true,
            calibration_poll_ms: 100.0,
            calibration_timeout_ms: 3000.0,
        }
    }
}

impl Default for HoloDriveParams {
    fn default() -> Self {
        Self {
            wheel_max_rpm: 180.0,
            odometry_wheel_diameter_in: 2.75,
            field_centric: true,
            omega_pid: PidParams {
                k_p: 0.015,
                k_i: 0.0,
                k_d: 0.0,
                k_f: 0.008,
                output_limits: Some([-1.0, 1.0]),
            },
            left_encoder_reversed: true,
            right_encoder_reversed: false,
            rear_encoder_reversed: false,
            calibration_poll_ms: 20.0,
            calibration_timeout_ms: 3000.0,
        }
    }
}
