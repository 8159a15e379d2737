//! # Geometry
//!
//! Vector and pose algebra in the robot's 2D plane.
//!
//! Angles are in degrees and follow the heading sensor's convention rather
//! than the textbook one, every rotation, unit vector and angle extraction in
//! the crate is written against this convention.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

// Internal
use util::maths::{wrap, RAD_TO_DEG};

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// A free vector or point in the robot's plane.
pub type Vector = Vector2<f64>;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Heading-convention operations on [`Vector`].
pub trait VectorExt {
    /// Unit vector pointing along `angle_deg`.
    fn from_angle(angle_deg: f64) -> Self;

    /// Return this vector rotated by `angle_deg`.
    fn rotated(&self, angle_deg: f64) -> Self;

    /// Angle of the vector in degrees, in the range [-180, 180].
    fn angle_deg(&self) -> f64;

    /// Elementwise product of the two vectors.
    ///
    /// This is the chassis code's historical "dot", it is NOT the scalar dot
    /// product (use `nalgebra`'s `dot` for that).
    fn elementwise(&self, other: &Self) -> Self;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Position and heading of the robot.
///
/// The heading is only wrapped when poses are compared, the stored value may
/// leave [0, 360).
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VectorExt for Vector {
    fn from_angle(angle_deg: f64) -> Self {
        let rad = angle_deg / RAD_TO_DEG;
        Vector::new(rad.cos(), rad.sin())
    }

    fn rotated(&self, angle_deg: f64) -> Self {
        Rotation2::new(angle_deg / RAD_TO_DEG) * *self
    }

    fn angle_deg(&self) -> f64 {
        self.y.atan2(self.x) * RAD_TO_DEG
    }

    fn elementwise(&self, other: &Self) -> Self {
        self.component_mul(other)
    }
}

impl Pose {
    pub fn new(x: f64, y: f64, heading_deg: f64) -> Self {
        Self { x, y, heading_deg }
    }

    /// Build a pose from a position vector and a heading.
    pub fn from_vector(position: Vector, heading_deg: f64) -> Self {
        Self {
            x: position.x,
            y: position.y,
            heading_deg,
        }
    }

    /// The position part of the pose.
    pub fn vector(&self) -> Vector {
        Vector::new(self.x, self.y)
    }

    /// Overwrite the position, keeping the heading.
    pub fn set_vector(&mut self, position: Vector) {
        self.x = position.x;
        self.y = position.y;
    }

    /// Difference between this pose and `other`.
    ///
    /// The position is `other - self` and the heading is the shortest signed
    /// angle from this heading to the other one.
    pub fn get_error(&self, other: &Pose) -> Pose {
        Pose {
            x: other.x - self.x,
            y: other.y - self.y,
            heading_deg: wrap(self.heading_deg, other.heading_deg),
        }
    }
}
