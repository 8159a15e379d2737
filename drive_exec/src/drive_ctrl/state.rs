//! Odometry state shared by the drive controllers

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use util::{maths::fit_to_range, time::millis_to_seconds};

use super::{DriveError, FollowMode};
use crate::{
    controllers::FIRST_TICK_MS,
    geom::{Pose, Vector, VectorExt},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The dead reckoning estimate of a drive controller.
#[derive(Debug, Clone, Serialize)]
pub struct DriveState {
    /// Estimated pose in the field frame
    pub pose: Pose,

    /// Field frame velocity over the last tick, in inches per second
    pub velocity: Vector,

    /// Odometric distance travelled since the last reset
    pub distance_traveled: f64,

    /// Clock time of the previous tick
    pub last_tick_ms: f64,

    pub mode: FollowMode,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveState {
    pub fn new(now_ms: f64) -> Self {
        Self {
            pose: Pose::default(),
            velocity: Vector::zeros(),
            distance_traveled: 0.0,
            last_tick_ms: now_ms - FIRST_TICK_MS,
            mode: FollowMode::Running,
        }
    }

    /// Start a new follow session, keeping the pose.
    pub fn reset(&mut self, now_ms: f64) {
        self.distance_traveled = 0.0;
        self.velocity = Vector::zeros();
        self.last_tick_ms = now_ms - FIRST_TICK_MS;
        self.mode = FollowMode::Running;
    }

    /// Integrate a chassis frame velocity over the time since the last tick.
    ///
    /// The heading is taken as absolute, from the heading sensor. If no time
    /// has passed since the last tick the state is left untouched.
    pub fn integrate(
        &mut self,
        heading_deg: f64,
        body_velocity: Vector,
        now_ms: f64,
    ) -> Result<(), DriveError> {
        let dt_ms = now_ms - self.last_tick_ms;
        if dt_ms <= 0.0 {
            return Err(DriveError::DegenerateTimestep(dt_ms));
        }

        self.pose.heading_deg = heading_deg;
        self.last_tick_ms = now_ms;

        self.velocity = body_velocity.rotated(heading_deg);
        let displacement = self.velocity * millis_to_seconds(dt_ms);

        self.distance_traveled += displacement.norm();
        self.pose.set_vector(self.pose.vector() + displacement);

        Ok(())
    }

    /// Fraction of a trajectory of the given length that has been travelled.
    pub fn progress(&self, length: f64) -> f64 {
        // Nothing to travel on an empty trajectory
        if length <= 0.0 {
            return 1.0;
        }

        fit_to_range(self.distance_traveled / length, 0.0, 1.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_integrate() {
        let mut state = DriveState::new(1000.0);
        assert_eq!(state.last_tick_ms, 999.0);

        // 10 in/s forward for half a second at zero heading goes up the field
        state.last_tick_ms = 1000.0;
        state.integrate(0.0, Vector::new(0.0, 10.0), 1500.0).unwrap();
        assert_relative_eq!(state.pose.y, 5.0, epsilon = 1e-9);
        assert_relative_eq!(state.pose.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(state.distance_traveled, 5.0, epsilon = 1e-9);

        // Turned a quarter, forwards is now along -x
        state.integrate(90.0, Vector::new(0.0, 10.0), 2000.0).unwrap();
        assert_relative_eq!(state.pose.x, -5.0, epsilon = 1e-9);
        assert_relative_eq!(state.pose.y, 5.0, epsilon = 1e-9);
        assert_relative_eq!(state.distance_traveled, 10.0, epsilon = 1e-9);
        assert_eq!(state.pose.heading_deg, 90.0);
    }

    #[test]
    fn test_degenerate_timestep() {
        let mut state = DriveState::new(0.0);
        state.integrate(0.0, Vector::new(0.0, 1.0), 100.0).unwrap();
        let before = state.clone();

        assert_eq!(
            state.integrate(45.0, Vector::new(0.0, 1.0), 100.0),
            Err(DriveError::DegenerateTimestep(0.0))
        );
        assert_eq!(state.pose, before.pose);
        assert_eq!(state.distance_traveled, before.distance_traveled);
    }

    #[test]
    fn test_progress() {
        let mut state = DriveState::new(0.0);
        assert_eq!(state.progress(10.0), 0.0);
        assert_eq!(state.progress(0.0), 1.0);

        state.distance_traveled = 2.5;
        assert_eq!(state.progress(10.0), 0.25);

        state.distance_traveled = 12.0;
        assert_eq!(state.progress(10.0), 1.0);

        state.reset(50.0);
        assert_eq!(state.distance_traveled, 0.0);
        assert_eq!(state.last_tick_ms, 49.0);
    }
}
