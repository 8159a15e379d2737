//! # Hardware abstraction
//!
//! Interfaces to the sensors, motors and clock used by the drive controllers.
//! Controllers are given boxed implementations of these at construction,
//! which are either bindings to real hardware or the simulated devices in
//! [`crate::sim`].

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Direction in which to spin an actuator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// An absolute heading sensor, such as an inertial measurement unit.
///
/// Headings are in degrees, clockwise positive.
pub trait OrientationSensor {
    fn heading(&self) -> f64;

    fn set_heading(&mut self, heading_deg: f64);

    /// Begin calibrating the sensor. Calibration completes in the
    /// background, poll [`OrientationSensor::is_calibrating`] to wait for it.
    fn calibrate(&mut self);

    fn is_calibrating(&self) -> bool;
}

/// A rotation sensor on an odometry wheel.
pub trait WheelEncoder {
    /// Angular velocity of the wheel in degrees per second.
    fn angular_velocity_dps(&self) -> f64;

    fn set_reversed(&mut self, reversed: bool);
}

/// A single motor.
pub trait Actuator {
    fn spin(&mut self, direction: Direction, speed_rpm: f64);

    fn stop(&mut self);
}

/// Source of time for the control loop.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed point.
    fn now_ms(&self) -> f64;

    fn sleep_ms(&mut self, duration_ms: f64);
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Direction {
    /// Split a signed demand into a direction and a magnitude.
    pub fn split(demand: f64) -> (Self, f64) {
        if demand < 0.0 {
            (Direction::Reverse, -demand)
        }
        else {
            (Direction::Forward, demand)
        }
    }

    /// The sign applied to a magnitude spun in this direction.
    pub fn signum(&self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }
}
