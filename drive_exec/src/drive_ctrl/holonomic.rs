//! # Holonomic drive controller
//!
//! An X-drive chassis: four omni wheels at the corners, each driving along a
//! diagonal, so the chassis can translate in any direction while rotating.
//! Odometry comes from three unpowered wheels, two facing forwards on the
//! left and right and one facing sideways at the rear.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use std::f64::consts::PI;

// Internal
use super::{
    heading_correction, wait_for_calibration, DriveController, DriveError, DriveState,
    FollowMode, HoloDriveParams,
};
use crate::{
    controllers::PidController,
    geom::{Pose, Vector, VectorExt},
    hal::{Actuator, Clock, Direction, OrientationSensor, WheelEncoder},
    traj::HolonomicTrajectory,
};
use util::maths::wrap;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Directions along which each wheel drives the chassis
const FR_ANGLE_DEG: f64 = 135.0;
const FL_ANGLE_DEG: f64 = 45.0;
const RL_ANGLE_DEG: f64 = 135.0;
const RR_ANGLE_DEG: f64 = 45.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Hardware used by a [`HolonomicDrive`].
pub struct HolonomicHal {
    pub gyro: Box<dyn OrientationSensor>,
    pub left_encoder: Box<dyn WheelEncoder>,
    pub right_encoder: Box<dyn WheelEncoder>,
    pub rear_encoder: Box<dyn WheelEncoder>,
    pub front_right: Box<dyn Actuator>,
    pub front_left: Box<dyn Actuator>,
    pub rear_left: Box<dyn Actuator>,
    pub rear_right: Box<dyn Actuator>,
    pub clock: Box<dyn Clock>,
}

pub struct HolonomicDrive {
    params: HoloDriveParams,
    hal: HolonomicHal,
    state: DriveState,
    omega_pid: PidController,
    dps_to_ips: f64,

    /// Unit drive directions of the FR, FL, RL and RR wheels
    components: [Vector; 4],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HolonomicDrive {
    pub fn new(params: HoloDriveParams, hal: HolonomicHal) -> Self {
        let state = DriveState::new(hal.clock.now_ms());
        let omega_pid = PidController::from_params(&params.omega_pid);
        let dps_to_ips = params.odometry_wheel_diameter_in * PI / 360.0;

        Self {
            params,
            hal,
            state,
            omega_pid,
            dps_to_ips,
            components: [
                Vector::from_angle(FR_ANGLE_DEG),
                Vector::from_angle(FL_ANGLE_DEG),
                Vector::from_angle(RL_ANGLE_DEG),
                Vector::from_angle(RR_ANGLE_DEG),
            ],
        }
    }

    /// Per wheel demands in [-1, 1] for FR, FL, RL and RR.
    pub fn mix(&self, translation: Vector, rotation: f64) -> [f64; 4] {
        let translation = if self.params.field_centric {
            translation.rotated(-self.state.pose.heading_deg)
        }
        else {
            translation
        };

        // Project the translation onto each wheel's drive direction
        let project = |c: &Vector| {
            let p = translation.elementwise(c);
            p.x + p.y
        };

        let mut demands = [
            project(&self.components[0]) - rotation,
            project(&self.components[1]) + rotation,
            project(&self.components[2]) + rotation,
            project(&self.components[3]) - rotation,
        ];

        let max = demands.iter().fold(0f64, |m, d| m.max(d.abs()));
        if max > 1.0 {
            for d in demands.iter_mut() {
                *d /= max;
            }
        }

        demands
    }
}

impl DriveController for HolonomicDrive {
    type Trajectory = HolonomicTrajectory;

    fn init(&mut self) -> Result<(), DriveError> {
        self.hal.gyro.calibrate();
        self.hal.left_encoder.set_reversed(self.params.left_encoder_reversed);
        self.hal.right_encoder.set_reversed(self.params.right_encoder_reversed);
        self.hal.rear_encoder.set_reversed(self.params.rear_encoder_reversed);

        wait_for_calibration(
            self.hal.gyro.as_ref(),
            self.hal.clock.as_mut(),
            self.params.calibration_poll_ms,
            self.params.calibration_timeout_ms,
        )?;

        self.reset();

        info!("Holonomic drive initialised");

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
        let rear = self.hal.rear_encoder.angular_velocity_dps() * self.dps_to_ips;

        // Remove the rotation of the chassis from the tracking wheels
        let rot = 0.5 * (left - right);
        let lateral = rear - rot;
        let forward = 0.5 * ((right + rot) + (left - rot));

        self.state
            .integrate(heading, Vector::new(lateral, forward), self.hal.clock.now_ms())?;

        trace!(
            "Pose ({:.2}, {:.2}, {:.2}), distance {:.2}",
            self.state.pose.x, self.state.pose.y, self.state.pose.heading_deg,
            self.state.distance_traveled
        );

        Ok(())
    }

    fn follow(&mut self, traj: &HolonomicTrajectory) -> Result<f64, DriveError> {
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

        let w = match waypoint.heading_deg {
            Some(target) => {
                let error = wrap(self.state.pose.heading_deg, target);
                heading_correction(self.omega_pid.get(error, 0.0, self.hal.clock.now_ms()))
            }
            None => 0.0,
        };

        trace!(
            "Progress {:.3}, translation ({:.3}, {:.3}), rotation {:.3}",
            progress, waypoint.translation.x, waypoint.translation.y, w
        );

        self.arcade_drive(waypoint.translation, w);

        Ok(progress)
    }

    fn arcade_drive(&mut self, translation: Vector, rotation: f64) {
        let [fr, fl, rl, rr] = self.mix(translation, rotation);
        let max_rpm = self.params.wheel_max_rpm;

        let spin = |motor: &mut Box<dyn Actuator>, demand: f64| {
            let (dir, rpm) = Direction::split(demand * max_rpm);
            motor.spin(dir, rpm);
        };

        spin(&mut self.hal.front_right, fr);
        spin(&mut self.hal.front_left, fl);
        spin(&mut self.hal.rear_left, rl);
        spin(&mut self.hal.rear_right, rr);
    }

    fn stop(&mut self) {
        self.hal.front_right.stop();
        self.hal.front_left.stop();
        self.hal.rear_left.stop();
        self.hal.rear_right.stop();
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
        sim::{SimParams, SimWorld, HOLO_FL, HOLO_FR, HOLO_RL, HOLO_RR},
        traj::{test::path_plus, Keyframe, TrajParams},
    };
    use approx::assert_relative_eq;
    use std::{cell::RefCell, rc::Rc};
    use util::maths::bound;

    fn profile() -> VelocityProfile {
        VelocityProfile::new(0.15, 0.05, 0.45, 0.35, 0.8).unwrap()
    }

    fn drive(params: HoloDriveParams) -> (Rc<RefCell<SimWorld>>, HolonomicDrive) {
        let world = SimWorld::new_holonomic(SimParams::default());
        let hal = SimWorld::holonomic_hal(&world);
        let mut drive = HolonomicDrive::new(params, hal);
        drive.init().unwrap();

        (world, drive)
    }

    fn run(
        world: &Rc<RefCell<SimWorld>>,
        drive: &mut HolonomicDrive,
        traj: &HolonomicTrajectory,
    ) {
        let mut prev = 0.0;
        let mut ticks = 0;

        loop {
            let progress = drive.follow(traj).unwrap();
            assert!(progress >= prev);
            prev = progress;

            if progress >= 1.0 {
                break;
            }

            world.borrow_mut().step(10.0);
            ticks += 1;
            assert!(ticks < 10_000, "Trajectory never completed");
        }
    }

    #[test]
    fn test_mix() {
        let (_, drive) = drive(HoloDriveParams::default());
        let a = 0.5 * 2f64.sqrt();

        // Forwards drives every wheel equally
        let d = drive.mix(Vector::new(0.0, 1.0), 0.0);
        for x in d.iter() {
            assert_relative_eq!(*x, a, epsilon = 1e-12);
        }

        // Rotation alone, left side forwards
        assert_eq!(drive.mix(Vector::zeros(), 0.5), [-0.5, 0.5, 0.5, -0.5]);

        // Saturated demands keep their ratios
        let d = drive.mix(Vector::new(0.0, 1.0), 1.0);
        assert_relative_eq!(d[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(d[0], (a - 1.0) / (a + 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_field_centric() {
        let (_, mut field) = drive(HoloDriveParams::default());
        let (_, mut chassis) = drive(HoloDriveParams {
            field_centric: false,
            ..Default::default()
        });

        // Turned a quarter, so field forwards is along the chassis' x axis
        field.set_pose(Pose::new(0.0, 0.0, 90.0));
        chassis.set_pose(Pose::new(0.0, 0.0, 90.0));

        let f = field.mix(Vector::new(0.0, 1.0), 0.0);
        let c = chassis.mix(Vector::new(1.0, 0.0), 0.0);
        for (f, c) in f.iter().zip(c.iter()) {
            assert_relative_eq!(*f, *c, epsilon = 1e-12);
        }

        // Without field centric control the heading is ignored
        let c = chassis.mix(Vector::new(0.0, 1.0), 0.0);
        assert!(c.iter().all(|x| *x > 0.0));
    }

    #[test]
    fn test_arcade_rpm() {
        let (world, mut drive) = drive(HoloDriveParams::default());

        drive.arcade_drive(Vector::zeros(), -0.5);
        let w = world.borrow();
        assert_eq!(w.motor_rpm(HOLO_FR), 90.0);
        assert_eq!(w.motor_rpm(HOLO_FL), -90.0);
        assert_eq!(w.motor_rpm(HOLO_RL), -90.0);
        assert_eq!(w.motor_rpm(HOLO_RR), 90.0);
    }

    #[test]
    fn test_follow_composite() {
        let (world, mut drive) = drive(HoloDriveParams::default());
        let keyframes = [
            Keyframe::new(0.0, 0.0),
            Keyframe::new(0.3, 180.0),
            Keyframe::new(1.0, 300.0),
            Keyframe::new(0.5, 90.0),
            Keyframe::new(2.0, 5.0),
        ];
        let traj = HolonomicTrajectory::spline_plus(
            &path_plus(),
            &profile(),
            &keyframes,
            &TrajParams::default(),
        )
        .unwrap();

        world.borrow_mut().set_pose(traj.initial_pose());
        drive.set_pose(traj.initial_pose());
        world.borrow_mut().step(10.0);
        drive.reset();
        run(&world, &mut drive, &traj);

        // Dead reckoning agrees with the simulated truth
        let truth = world.borrow().pose();
        let est = drive.state().pose;
        assert_relative_eq!(est.x, truth.x, epsilon = 1e-6);
        assert_relative_eq!(est.y, truth.y, epsilon = 1e-6);
        assert!(drive.state().distance_traveled >= traj.length());

        // Once complete follow keeps stopping the motors
        world.borrow_mut().set_motor_rpm(HOLO_FL, 10.0);
        world.borrow_mut().step(10.0);
        assert_eq!(drive.follow(&traj).unwrap(), 1.0);
        assert_eq!(world.borrow().motor_rpm(HOLO_FL), 0.0);
        assert_eq!(drive.state().pose, est);

        // A new session starts again from zero
        drive.reset();
        world.borrow_mut().step(10.0);
        let p = drive.follow(&traj).unwrap();
        assert!(p < 0.01);
        assert_eq!(drive.state().mode, FollowMode::Running);
    }

    #[test]
    fn test_follow_straight_holds_heading() {
        let (world, mut drive) = drive(HoloDriveParams::default());
        let traj = HolonomicTrajectory::straight(
            Vector::new(24.0, 0.0),
            &profile(),
            &[Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 0.0)],
        )
        .unwrap();

        run(&world, &mut drive, &traj);

        let truth = world.borrow().pose();
        assert!(truth.x > 23.99);
        assert_relative_eq!(truth.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(wrap(truth.heading_deg, 0.0), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_follow_turns_to_keyframe() {
        let (world, mut drive) = drive(HoloDriveParams::default());
        let traj = HolonomicTrajectory::straight(
            Vector::new(0.0, 48.0),
            &profile(),
            &[Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 90.0)],
        )
        .unwrap();

        // True heading as each quarter of the route is passed
        let checkpoints = [0.25, 0.5, 0.75];
        let mut headings = Vec::new();
        let mut ticks = 0;

        loop {
            let progress = drive.follow(&traj).unwrap();
            if progress >= 1.0 {
                break;
            }

            if headings.len() < checkpoints.len() && progress >= checkpoints[headings.len()] {
                headings.push(wrap(0.0, world.borrow().pose().heading_deg));
            }

            world.borrow_mut().step(10.0);
            ticks += 1;
            assert!(ticks < 10_000, "Trajectory never completed");
        }

        // Turns steadily anticlockwise towards the target
        assert_eq!(headings.len(), checkpoints.len());
        assert!(headings[0] > 0.0);
        assert!(headings[0] < headings[1]);
        assert!(headings[1] < headings[2]);
        assert!(headings[2] < 90.0);

        let truth = world.borrow().pose();
        assert!(wrap(truth.heading_deg, 90.0).abs() < 1.0);
        assert_relative_eq!(
            drive.state().pose.heading_deg,
            bound(truth.heading_deg),
            epsilon = 1e-6
        );
    }
}
