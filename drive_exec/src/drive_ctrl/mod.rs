//! # Drive control module
//!
//! Drive controllers own the chassis' motors and sensors. Each control loop
//! tick they update a dead reckoning estimate of the chassis pose from the
//! heading sensor and the odometry wheel encoders, and while following a
//! trajectory they convert the waypoint at the current travelled distance
//! into wheel commands.
//!
//! Within one tick the order is always: odometry update, waypoint lookup,
//! heading correction, wheel commands.
//!
//! Following is a one way state machine, `Running` until the distance
//! travelled covers the trajectory and `Complete` after that. Once complete
//! the controller keeps the motors stopped until [`DriveController::reset`]
//! starts a new follow session.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod differential;
pub mod holonomic;
pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use serde::Serialize;

// Internal
pub use differential::{DifferentialDrive, DifferentialHal};
pub use holonomic::{HolonomicDrive, HolonomicHal};
pub use params::{DiffDriveParams, HoloDriveParams};
pub use state::DriveState;

use crate::{
    controllers::PidError,
    geom::{Pose, Vector},
    hal::{Clock, OrientationSensor},
    traj::TrajError,
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Follow state machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum FollowMode {
    Running,
    Complete,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriveError {
    #[error("Heading sensor calibration did not complete within {0} ms")]
    SensorTimeout(f64),

    #[error("No time has passed since the previous tick ({0} ms)")]
    DegenerateTimestep(f64),

    #[error("Trajectory error: {0}")]
    TrajError(#[from] TrajError),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

pub trait DriveController {
    /// The kind of trajectory this chassis can follow.
    type Trajectory;

    /// Calibrate the sensors and prepare for a follow session.
    ///
    /// Blocks, using the controller's clock, until the heading sensor has
    /// calibrated. A calibration that doesn't complete in time is an error.
    fn init(&mut self) -> Result<(), DriveError>;

    /// Set the pose estimate, also setting the heading sensor to match.
    fn set_pose(&mut self, pose: Pose);

    /// Start a new follow session. Distance travelled is zeroed and the
    /// heading controller re-armed, the pose is kept.
    fn reset(&mut self);

    /// Update the pose estimate.
    fn localize(&mut self) -> Result<(), DriveError>;

    /// Run one tick of trajectory following, returning the progress along
    /// the trajectory in [0, 1].
    ///
    /// A tick in which no time has passed is skipped, returning the
    /// progress of the previous tick.
    fn follow(&mut self, traj: &Self::Trajectory) -> Result<f64, DriveError>;

    /// Drive with a translation and a rotation demand, both in [-1, 1].
    fn arcade_drive(&mut self, translation: Vector, rotation: f64);

    /// Stop all motors.
    fn stop(&mut self);

    /// The current odometry state.
    fn state(&self) -> &DriveState;
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Wait for the heading sensor to finish calibrating, polling it every
/// `poll_ms` for up to `timeout_ms`.
pub(crate) fn wait_for_calibration(
    sensor: &dyn OrientationSensor,
    clock: &mut dyn Clock,
    poll_ms: f64,
    timeout_ms: f64,
) -> Result<(), DriveError> {
    let start_ms = clock.now_ms();

    while sensor.is_calibrating() {
        let waited_ms = clock.now_ms() - start_ms;
        if waited_ms >= timeout_ms {
            return Err(DriveError::SensorTimeout(waited_ms));
        }

        clock.sleep_ms(poll_ms);
    }

    debug!("Heading sensor calibrated after {} ms", clock.now_ms() - start_ms);

    Ok(())
}

/// Run the heading hold controller, treating a degenerate time step as no
/// correction for this tick.
pub(crate) fn heading_correction(result: Result<f64, PidError>) -> f64 {
    match result {
        Ok(w) => w,
        Err(e) => {
            warn!("Heading correction skipped: {}", e);
            0.0
        }
    }
}

impl From<PidError> for DriveError {
    fn from(e: PidError) -> Self {
        match e {
            PidError::DegenerateTimestep(dt) => DriveError::DegenerateTimestep(dt),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::SimWorld;

    #[test]
    fn test_wait_for_calibration() {
        let world = SimWorld::new_differential(Default::default());
        world.borrow_mut().calibration_ms = 250.0;

        let mut gyro = SimWorld::gyro(&world);
        let mut clock = SimWorld::clock(&world);

        gyro.calibrate();
        assert!(gyro.is_calibrating());
        wait_for_calibration(&gyro, &mut clock, 100.0, 3000.0).unwrap();
        assert!(!gyro.is_calibrating());
        assert_eq!(clock.now_ms(), 300.0);
    }

    #[test]
    fn test_calibration_timeout() {
        let world = SimWorld::new_differential(Default::default());
        world.borrow_mut().calibration_ms = f64::INFINITY;

        let mut gyro = SimWorld::gyro(&world);
        let mut clock = SimWorld::clock(&world);

        gyro.calibrate();
        assert_eq!(
            wait_for_calibration(&gyro, &mut clock, 20.0, 100.0),
            Err(DriveError::SensorTimeout(100.0))
        );
    }

    #[test]
    fn test_pid_error_conversion() {
        assert_eq!(
            DriveError::from(PidError::DegenerateTimestep(0.0)),
            DriveError::DegenerateTimestep(0.0)
        );
        assert_eq!(heading_correction(Err(PidError::DegenerateTimestep(0.0))), 0.0);
        assert_eq!(heading_correction(Ok(0.25)), 0.25);
    }
}
