//! # Simulated chassis
//!
//! A headless, single threaded chassis simulation used to run the drive
//! controllers without hardware. The [`SimWorld`] holds the true state of the
//! chassis and the last motor commands, and hands out simulated devices which
//! implement the [`crate::hal`] traits on top of it.
//!
//! Time only passes when something sleeps on the simulated clock (or calls
//! [`SimWorld::step`]), at which point the chassis is moved according to the
//! motor commands held over the step. Motors reach their commanded speed
//! instantly and wheels never slip, so a controller's dead reckoning should
//! agree with the simulated truth.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Deserialize;
use std::{cell::RefCell, f64::consts::PI, rc::Rc};
use util::maths::{bound, RAD_TO_DEG};

// Internal
use crate::{
    drive_ctrl::{DifferentialHal, HolonomicHal},
    geom::{Pose, Vector, VectorExt},
    hal::{Actuator, Clock, Direction, OrientationSensor, WheelEncoder},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Differential motor indices, two motors on each side
pub const DIFF_LEFT_MOTORS: [usize; 2] = [0, 1];
pub const DIFF_RIGHT_MOTORS: [usize; 2] = [2, 3];

/// X-drive motor indices
pub const HOLO_FR: usize = 0;
pub const HOLO_FL: usize = 1;
pub const HOLO_RL: usize = 2;
pub const HOLO_RR: usize = 3;

/// Encoder indices
pub const ENC_LEFT: usize = 0;
pub const ENC_RIGHT: usize = 1;
pub const ENC_REAR: usize = 2;

const NUM_MOTORS: usize = 4;
const NUM_ENCODERS: usize = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Physical properties of the simulated chassis.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Diameter of the driven wheels
    pub drive_wheel_diameter_in: f64,

    /// Distance between the left and right wheels of a differential chassis
    pub track_width_in: f64,

    /// Distance from the centre of an X-drive chassis to its wheels
    pub chassis_radius_in: f64,

    /// Distance from the centre of the chassis to the odometry wheels
    pub tracking_radius_in: f64,

    pub odometry_wheel_diameter_in: f64,

    /// Time the heading sensor takes to calibrate
    pub calibration_ms: f64,
}

/// The simulated world.
pub struct SimWorld {
    pub params: SimParams,

    /// Calibration time of the heading sensor, initially from the params
    pub calibration_ms: f64,

    chassis: Chassis,
    time_ms: f64,
    pose: Pose,

    /// Signed motor speeds in rpm
    motor_rpm: [f64; NUM_MOTORS],

    /// Encoders physically mounted backwards
    encoder_mounted_reversed: [bool; NUM_ENCODERS],

    /// Reversal configured through [`WheelEncoder::set_reversed`]
    encoder_reversed: [bool; NUM_ENCODERS],

    calibrated_at_ms: f64,

    /// Difference between the heading sensor's reading and the true heading
    gyro_offset_deg: f64,
}

pub struct SimGyro {
    world: Rc<RefCell<SimWorld>>,
}

pub struct SimEncoder {
    world: Rc<RefCell<SimWorld>>,
    index: usize,
}

pub struct SimMotor {
    world: Rc<RefCell<SimWorld>>,
    index: usize,
}

pub struct SimClock {
    world: Rc<RefCell<SimWorld>>,
}

/// Chassis frame motion produced by the current motor commands.
struct ChassisMotion {
    /// Lateral (x) and forward (y) velocity in inches per second
    body_velocity: Vector,

    /// Rate of change of heading in degrees per second
    heading_rate: f64,

    /// Surface speeds of the left, right and rear odometry wheels
    odometry_ips: [f64; NUM_ENCODERS],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chassis {
    Differential,
    Holonomic,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            drive_wheel_diameter_in: 4.0,
            track_width_in: 12.0,
            chassis_radius_in: 9.0,
            tracking_radius_in: 5.0,
            odometry_wheel_diameter_in: 2.75,
            calibration_ms: 200.0,
        }
    }
}

impl SimWorld {
    pub fn new_differential(params: SimParams) -> Rc<RefCell<Self>> {
        // The right odometry wheel faces the other way to the left
        Self::new(params, Chassis::Differential, [false, true, false])
    }

    pub fn new_holonomic(params: SimParams) -> Rc<RefCell<Self>> {
        Self::new(params, Chassis::Holonomic, [true, false, false])
    }

    fn new(
        params: SimParams,
        chassis: Chassis,
        encoder_mounted_reversed: [bool; NUM_ENCODERS],
    ) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            calibration_ms: params.calibration_ms,
            params,
            chassis,
            time_ms: 0.0,
            pose: Pose::default(),
            motor_rpm: [0.0; NUM_MOTORS],
            encoder_mounted_reversed,
            encoder_reversed: [false; NUM_ENCODERS],
            calibrated_at_ms: 0.0,
            gyro_offset_deg: 0.0,
        }))
    }

    pub fn gyro(world: &Rc<RefCell<Self>>) -> SimGyro {
        SimGyro {
            world: world.clone(),
        }
    }

    pub fn encoder(world: &Rc<RefCell<Self>>, index: usize) -> SimEncoder {
        SimEncoder {
            world: world.clone(),
            index,
        }
    }

    pub fn motor(world: &Rc<RefCell<Self>>, index: usize) -> SimMotor {
        SimMotor {
            world: world.clone(),
            index,
        }
    }

    pub fn clock(world: &Rc<RefCell<Self>>) -> SimClock {
        SimClock {
            world: world.clone(),
        }
    }

    /// Devices for a differential drive controller.
    pub fn differential_hal(world: &Rc<RefCell<Self>>) -> DifferentialHal {
        let motors = |indices: [usize; 2]| -> Vec<Box<dyn Actuator>> {
            indices
                .iter()
                .map(|&i| Box::new(Self::motor(world, i)) as Box<dyn Actuator>)
                .collect()
        };

        DifferentialHal {
            gyro: Box::new(Self::gyro(world)),
            left_encoder: Box::new(Self::encoder(world, ENC_LEFT)),
            right_encoder: Box::new(Self::encoder(world, ENC_RIGHT)),
            left_motors: motors(DIFF_LEFT_MOTORS),
            right_motors: motors(DIFF_RIGHT_MOTORS),
            clock: Box::new(Self::clock(world)),
        }
    }

    /// Devices for a holonomic drive controller.
    pub fn holonomic_hal(world: &Rc<RefCell<Self>>) -> HolonomicHal {
        HolonomicHal {
            gyro: Box::new(Self::gyro(world)),
            left_encoder: Box::new(Self::encoder(world, ENC_LEFT)),
            right_encoder: Box::new(Self::encoder(world, ENC_RIGHT)),
            rear_encoder: Box::new(Self::encoder(world, ENC_REAR)),
            front_right: Box::new(Self::motor(world, HOLO_FR)),
            front_left: Box::new(Self::motor(world, HOLO_FL)),
            rear_left: Box::new(Self::motor(world, HOLO_RL)),
            rear_right: Box::new(Self::motor(world, HOLO_RR)),
            clock: Box::new(Self::clock(world)),
        }
    }

    /// Advance time, moving the chassis under the current motor commands.
    pub fn step(&mut self, dt_ms: f64) {
        let motion = self.motion();
        let dt_s = dt_ms / 1000.0;

        self.pose.heading_deg += motion.heading_rate * dt_s;
        let displacement = motion.body_velocity.rotated(self.pose.heading_deg) * dt_s;
        self.pose.set_vector(self.pose.vector() + displacement);
        self.time_ms += dt_ms;

        trace!(
            "Sim t = {} ms, pose ({:.2}, {:.2}, {:.2})",
            self.time_ms, self.pose.x, self.pose.y, self.pose.heading_deg
        );
    }

    /// The true pose of the chassis.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Place the chassis. The heading sensor turns with it, keeping its
    /// offset from the true heading.
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    pub fn motor_rpm(&self, index: usize) -> f64 {
        self.motor_rpm[index]
    }

    pub fn set_motor_rpm(&mut self, index: usize, rpm: f64) {
        self.motor_rpm[index] = rpm;
    }

    fn rpm_to_ips(&self, rpm: f64) -> f64 {
        rpm / 60.0 * PI * self.params.drive_wheel_diameter_in
    }

    fn motion(&self) -> ChassisMotion {
        let s: Vec<f64> = self.motor_rpm.iter().map(|&r| self.rpm_to_ips(r)).collect();

        match self.chassis {
            Chassis::Differential => {
                let left = 0.5 * (s[DIFF_LEFT_MOTORS[0]] + s[DIFF_LEFT_MOTORS[1]]);
                let right = 0.5 * (s[DIFF_RIGHT_MOTORS[0]] + s[DIFF_RIGHT_MOTORS[1]]);

                ChassisMotion {
                    body_velocity: Vector::new(0.0, 0.5 * (left + right)),
                    heading_rate: (right - left) / self.params.track_width_in * RAD_TO_DEG,
                    odometry_ips: [left, right, 0.0],
                }
            }
            Chassis::Holonomic => {
                // Invert the X-drive mixing
                let a = 0.5 * 2f64.sqrt();
                let spin = 0.25 * (s[HOLO_FL] + s[HOLO_RL] - s[HOLO_FR] - s[HOLO_RR]);
                let diag_a = 0.5 * (s[HOLO_FL] + s[HOLO_RR]);
                let diag_b = 0.5 * (s[HOLO_FR] + s[HOLO_RL]);
                let body_velocity = Vector::new(
                    (diag_a - diag_b) / (2.0 * a),
                    (diag_a + diag_b) / (2.0 * a),
                );

                let rate_rad = -spin / self.params.chassis_radius_in;
                let rot = -rate_rad * self.params.tracking_radius_in;

                ChassisMotion {
                    body_velocity,
                    heading_rate: rate_rad * RAD_TO_DEG,
                    odometry_ips: [
                        body_velocity.y + rot,
                        body_velocity.y - rot,
                        body_velocity.x + rot,
                    ],
                }
            }
        }
    }
}

impl OrientationSensor for SimGyro {
    fn heading(&self) -> f64 {
        let w = self.world.borrow();
        bound(w.pose.heading_deg + w.gyro_offset_deg)
    }

    /// Redefine the current reading, the chassis itself does not move.
    fn set_heading(&mut self, heading_deg: f64) {
        let mut w = self.world.borrow_mut();
        w.gyro_offset_deg = heading_deg - w.pose.heading_deg;
    }

    fn calibrate(&mut self) {
        let mut w = self.world.borrow_mut();
        w.calibrated_at_ms = w.time_ms + w.calibration_ms;
    }

    fn is_calibrating(&self) -> bool {
        let w = self.world.borrow();
        w.time_ms < w.calibrated_at_ms
    }
}

impl WheelEncoder for SimEncoder {
    fn angular_velocity_dps(&self) -> f64 {
        let w = self.world.borrow();
        let dps_to_ips = w.params.odometry_wheel_diameter_in * PI / 360.0;
        let dps = w.motion().odometry_ips[self.index] / dps_to_ips;

        if w.encoder_mounted_reversed[self.index] != w.encoder_reversed[self.index] {
            -dps
        }
        else {
            dps
        }
    }

    fn set_reversed(&mut self, reversed: bool) {
        self.world.borrow_mut().encoder_reversed[self.index] = reversed;
    }
}

impl Actuator for SimMotor {
    fn spin(&mut self, direction: Direction, speed_rpm: f64) {
        self.world.borrow_mut().motor_rpm[self.index] = direction.signum() * speed_rpm;
    }

    fn stop(&mut self) {
        self.world.borrow_mut().motor_rpm[self.index] = 0.0;
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> f64 {
        self.world.borrow().time_ms
    }

    fn sleep_ms(&mut self, duration_ms: f64) {
        self.world.borrow_mut().step(duration_ms);
    }
}
