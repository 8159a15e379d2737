//! # Differential drive controller
//!
//! A two sided chassis with one group of motors per side, a heading sensor
//! and an unpowered odometry wheel on each side.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use std::f64::consts::PI;

// Internal
use super::{
    heading_correction, wait_for_calibration, DiffDriveParams, DriveController, DriveError,
    DriveState, FollowMode,
};
use crate::{
    controllers::PidController,
    geom::{Pose, Vector},
    hal::{Actuator, Clock, Direction, OrientationSensor, WheelEncoder},
    traj::{DifferentialTrajectory, PathKind},
};
use util::maths::wrap;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Hardware used by a [`DifferentialDrive`].
pub struct DifferentialHal {
    pub gyro: Box<dyn OrientationSensor>,
    pub left_encoder: Box<dyn WheelEncoder>,
    pub right_encoder: Box<dyn WheelEncoder>,
    pub left_motors: Vec<Box<dyn Actuator>>,
    pub right_motors: Vec<Box<dyn Actuator>>,
    pub clock: Box<dyn Clock>,
}

pub struct DifferentialDrive {
    params: DiffDriveParams,
    hal: DifferentialHal,
    state: DriveState,
    omega_pid: PidController,

    /// Conversion from encoder degrees per second to inches per second
    dps_to_ips: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DifferentialDrive {
    pub fn new(params: DiffDriveParams, hal: DifferentialHal) -> Self {
        let state = DriveState::new(hal.clock.now_ms());
        let omega_pid = PidController::from_params(&params.omega_pid);
        let dps_to_ips = params.odometry_wheel_diameter_in * PI / 360.0;

        Self {
            params,
            hal,
            state,
            omega_pid,
            dps_to_ips,
        }
    }

    /// Command each side of the chassis with a demand in [-1, 1].
    fn drive(&mut self, left: f64, right: f64) {
        let (left_dir, left_rpm) = Direction::split(left * self.params.max_velocity_rpm);
        let (right_dir, right_rpm) = Direction::split(right * self.params.max_velocity_rpm);

        for m in self.hal.left_motors.iter_mut() {
            m.spin(left_dir, left_rpm);
        }
        for m in self.hal.right_motors.iter_mut() {
            m.spin(right_dir, right_rpm);
        }
    }
}

impl DriveController for DifferentialDrive {
    type Trajectory = DifferentialTrajectory;

    fn init(&mut self) -> Result<(), DriveError> {
        self.hal.gyro.calibrate();
        self.hal.left_encoder.set_reversed(self.params.left_encoder_reversed);
        self.hal.right_encoder.set_reversed(self.params.right_encoder_reversed);

        wait_for_calibration(
            self.hal.gyro.as_ref(),
            self.hal.clock.as_mut(),
            self.params.calibration_poll_ms,
            self.params.calibration_timeout_ms,
        )?;

        self.reset();

        info!("Differential drive initialised");

        Ok(())
    }

    fn set_pose(&mut self, pose: Pose) {
        self.state.pose = pose;
        self.hal.gyro.set_heading(pose.heading_deg);
    }

    fn reset(&mut self) {
        self.state.reset(self.hal.clock.now_ms());
        self.omega_pid.reset();
    }

    fn localize(&mut self) -> Result<(), DriveError> {
        let heading = self.hal.gyro.heading();
        let left = self.hal.left_encoder.angular_velocity_dps() * self.dps_to_ips;
        let right = self.hal.right_encoder.angular_velocity_dps() * self.dps_to_ips;

        // No sideways motion on a differential chassis
        let body_velocity = Vector::new(0.0, 0.5 * (left + right));

        self.state.integrate(heading, body_velocity, self.hal.clock.now_ms())?;

        trace!(
            "Pose ({:.2}, {:.2}, {:.2}), distance {:.2}",
            self.state.pose.x, self.state.pose.y, self.state.pose.heading_deg,
            self.state.distance_traveled
        );

        Ok(())
    }

    fn follow(&mut self, traj: &DifferentialTrajectory) -> Result<f64, DriveError> {
        if self.state.mode == FollowMode::Complete {
            self.stop();
            return Ok(1.0);
        }

        match self.localize() {
            Err(DriveError::DegenerateTimestep(dt)) => {
                warn!("Skipping follow tick, time step was {} ms", dt);
                return Ok(self.state.progress(traj.length()));
            }
            r => r?,
        }

        let progress = self.state.progress(traj.length());

        if progress >= 1.0 {
            info!("Trajectory complete after {:.2}", self.state.distance_traveled);
            self.state.mode = FollowMode::Complete;
            self.stop();
            return Ok(1.0);
        }

        let waypoint = *traj.get(self.state.distance_traveled)?;

        // Only splines hold a heading, straight lines drive open loop
        let w = match (traj.kind(), waypoint.heading_deg) {
            (PathKind::Spline, Some(target)) => {
                let error = wrap(self.state.pose.heading_deg, target);
                heading_correction(self.omega_pid.get(error, 0.0, self.hal.clock.now_ms()))
            }
            _ => 0.0,
        };

        trace!(
            "Progress {:.3}, translation {:.3}, rotation {:.3}",
            progress, waypoint.translation.y, w
        );

        self.arcade_drive(waypoint.translation, w);

        Ok(progress)
    }

    fn arcade_drive(&mut self, translation: Vector, rotation: f64) {
        let y = translation.y;
        let w = rotation * self.params.rotation_scaler;

        let mut left = y + w;
        let mut right = y - w;

        // Keep both sides within [-1, 1] while preserving their ratio
        let max = left.abs().max(right.abs());
        if max > 1.0 {
            left /= max;
            right /= max;
        }

        self.drive(left, right);
    }

    fn stop(&mut self) {
        for m in self
            .hal
            .left_motors
            .iter_mut()
            .chain(self.hal.right_motors.iter_mut())
        {
            m.stop();
        }
    }

    fn state(&self) -> &DriveState {
        &self.state
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        profile::VelocityProfile,
        path::Path,
        sim::{SimParams, SimWorld, DIFF_LEFT_MOTORS, DIFF_RIGHT_MOTORS},
        traj::TrajParams,
    };
    use approx::assert_relative_eq;

    fn profile() -> VelocityProfile {
        VelocityProfile::new(0.15, 0.05, 0.45, 0.35, 0.8).unwrap()
    }

    fn drive() -> (std::rc::Rc<std::cell::RefCell<SimWorld>>, DifferentialDrive) {
        let world = SimWorld::new_differential(SimParams::default());
        let hal = SimWorld::differential_hal(&world);
        let mut drive = DifferentialDrive::new(DiffDriveParams::default(), hal);
        drive.init().unwrap();

        (world, drive)
    }

    /// Follow until complete, checking progress never goes backwards.
    fn run(
        world: &std::rc::Rc<std::cell::RefCell<SimWorld>>,
        drive: &mut DifferentialDrive,
        traj: &DifferentialTrajectory,
    ) -> usize {
        let mut prev = 0.0;
        let mut ticks = 0;

        loop {
            let progress = drive.follow(traj).unwrap();
            assert!(progress >= prev);
            assert!(progress >= 0.0 && progress <= 1.0);
            prev = progress;

            if progress >= 1.0 {
                break;
            }

            world.borrow_mut().step(10.0);
            ticks += 1;
            assert!(ticks < 10_000, "Trajectory never completed");
        }

        ticks
    }

    #[test]
    fn test_arcade_normalisation() {
        let (world, mut drive) = drive();

        drive.arcade_drive(Vector::new(0.0, 1.0), 1.0);
        let w = world.borrow();

        // 1 + 0.6 and 1 - 0.6, scaled so the larger is 1
        for &i in DIFF_LEFT_MOTORS.iter() {
            assert_relative_eq!(w.motor_rpm(i), 200.0);
        }
        for &i in DIFF_RIGHT_MOTORS.iter() {
            assert_relative_eq!(w.motor_rpm(i), 200.0 * 0.4 / 1.6);
        }
        drop(w);

        drive.arcade_drive(Vector::new(0.0, -1.0), -1.0);
        let w = world.borrow();
        assert_relative_eq!(w.motor_rpm(DIFF_LEFT_MOTORS[0]), -200.0);
        assert_relative_eq!(w.motor_rpm(DIFF_RIGHT_MOTORS[0]), -200.0 * 0.4 / 1.6);
        drop(w);

        // Within range nothing is scaled
        drive.arcade_drive(Vector::new(0.0, 0.5), 0.25);
        assert_relative_eq!(world.borrow().motor_rpm(DIFF_LEFT_MOTORS[1]), 130.0);
        assert_relative_eq!(world.borrow().motor_rpm(DIFF_RIGHT_MOTORS[1]), 70.0);
    }

    #[test]
    fn test_follow_straight() {
        let (world, mut drive) = drive();
        let traj = DifferentialTrajectory::straight(24.0, &profile());

        run(&world, &mut drive, &traj);

        assert_eq!(drive.state().mode, FollowMode::Complete);
        assert!(drive.state().distance_traveled >= 24.0);
        assert_relative_eq!(drive.state().pose.x, 0.0, epsilon = 1e-6);
        assert!(drive.state().pose.y >= 24.0);

        // Completion is idempotent and keeps the motors stopped
        let pose = drive.state().pose;
        world.borrow_mut().set_motor_rpm(0, 50.0);
        world.borrow_mut().step(10.0);
        assert_eq!(drive.follow(&traj).unwrap(), 1.0);
        assert_eq!(drive.state().pose, pose);
        assert_eq!(world.borrow().motor_rpm(0), 0.0);
    }

    #[test]
    fn test_follow_spline() {
        let (world, mut drive) = drive();
        let path = Path {
            p0: Vector::new(0.0, 0.0),
            p1: Vector::new(-24.0, 36.0),
            t0: Vector::new(0.0, 40.0),
            t1: Vector::new(0.0, 40.0),
        };
        let traj = DifferentialTrajectory::spline(&path, &profile(), false, &TrajParams::default());

        drive.set_pose(traj.initial_pose());
        drive.reset();
        run(&world, &mut drive, &traj);

        // Dead reckoning agrees with the simulated truth
        let truth = world.borrow().pose();
        let est = drive.state().pose;
        assert_relative_eq!(est.x, truth.x, epsilon = 1e-6);
        assert_relative_eq!(est.y, truth.y, epsilon = 1e-6);

        // And the chassis ends up near the end of the path
        assert!((est.vector() - path.p1).norm() < 8.0);
    }

    #[test]
    fn test_degenerate_tick_skipped() {
        let (world, mut drive) = drive();
        let traj = DifferentialTrajectory::straight(24.0, &profile());

        world.borrow_mut().step(10.0);
        let first = drive.follow(&traj).unwrap();
        let pose = drive.state().pose;

        // Same clock time again
        assert_eq!(drive.follow(&traj).unwrap(), first);
        assert_eq!(drive.state().pose, pose);
    }

    #[test]
    fn test_init_timeout() {
        let world = SimWorld::new_differential(SimParams::default());
        world.borrow_mut().calibration_ms = 1e6;
        let hal = SimWorld::differential_hal(&world);
        let mut drive = DifferentialDrive::new(DiffDriveParams::default(), hal);

        match drive.init() {
            Err(DriveError::SensorTimeout(ms)) => assert!(ms >= 3000.0),
            r => panic!("Expected a timeout, got {:?}", r),
        }
    }
}
