//! # Differential trajectories
//!
//! Trajectories for a chassis that can only drive along its own forward axis.
//! The translation demand of each waypoint is purely forwards (or backwards
//! for a reversed trajectory) and headings are those of the path tangent.
//!
//! Path headings are measured from the field `x` axis, while the chassis
//! heading is measured from the field `y` axis (the direction the robot faces
//! at zero heading), so path headings are rotated by -90 degrees. A reversed
//! trajectory is driven backwards, which adds a further half turn.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;
use std::ops::Deref;
use util::maths::bound;

// Internal
use super::{
    sample_segment, PathKind, SegmentOffset, SegmentSample, TrajParams, Trajectory, Waypoint,
    NUM_SAMPLES,
};
use crate::{
    geom::{Pose, Vector, VectorExt},
    path::{Path, PathPlus},
    profile::VelocityProfile,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Offset between a path heading and the chassis heading.
const PATH_TO_CHASSIS_DEG: f64 = -90.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A trajectory for a differential chassis.
#[derive(Debug, Clone, Serialize)]
pub struct DifferentialTrajectory {
    traj: Trajectory,
    reversed: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DifferentialTrajectory {
    /// Drive `distance` straight ahead, or backwards if `distance` is
    /// negative, without heading control.
    ///
    /// Poses are relative to the start of the manoeuvre.
    pub fn straight(distance: f64, profile: &VelocityProfile) -> Self {
        let length = distance.abs();

        let waypoints = (1..=NUM_SAMPLES)
            .map(|i| {
                let x = i as f64 / NUM_SAMPLES as f64;
                Waypoint {
                    dist: x * length,
                    translation: Vector::new(0.0, profile.get(i as f64).copysign(distance)),
                    heading_deg: None,
                    kind: PathKind::Linear,
                }
            })
            .collect();

        debug!("Generated straight differential trajectory of length {:.3}", length);

        Self {
            traj: Trajectory::new(
                waypoints,
                Pose::default(),
                Pose::new(0.0, distance, 0.0),
                length,
                PathKind::Linear,
                false,
            ),
            reversed: distance < 0.0,
        }
    }

    /// Follow a single Hermite segment.
    pub fn spline(
        path: &Path,
        profile: &VelocityProfile,
        reversed: bool,
        params: &TrajParams,
    ) -> Self {
        let (samples, length) =
            sample_segment(path, NUM_SAMPLES, &SegmentOffset::default(), profile, params);

        let waypoints = samples
            .iter()
            .map(|s| Self::waypoint(s, reversed))
            .collect();

        debug!("Generated differential spline of length {:.3}", length);

        Self {
            traj: Trajectory::new(
                waypoints,
                Self::pose(path.p0, path.t0, reversed),
                Self::pose(path.p1, path.t1, reversed),
                length,
                PathKind::Spline,
                true,
            ),
            reversed,
        }
    }

    /// Follow two chained Hermite segments.
    ///
    /// Each segment takes half of the samples, and the velocity profile runs
    /// across both of them, so there is no slow down at the joint.
    pub fn spline_plus(
        path: &PathPlus,
        profile: &VelocityProfile,
        reversed: bool,
        params: &TrajParams,
    ) -> Self {
        let half = NUM_SAMPLES / 2;
        let (first, second) = path.segments();

        let (mut samples, first_length) =
            sample_segment(&first, half, &SegmentOffset::default(), profile, params);
        let offset = SegmentOffset {
            profile_index: half,
            length: first_length,
            position: 1.0,
        };
        let (second_samples, second_length) =
            sample_segment(&second, half, &offset, profile, params);
        samples.extend(second_samples);

        let length = first_length + second_length;
        let waypoints = samples
            .iter()
            .map(|s| Self::waypoint(s, reversed))
            .collect();

        debug!("Generated differential composite spline of length {:.3}", length);

        Self {
            traj: Trajectory::new(
                waypoints,
                Self::pose(path.p0, path.t0, reversed),
                Self::pose(path.p2, path.t2, reversed),
                length,
                PathKind::Spline,
                true,
            ),
            reversed,
        }
    }

    /// True if the trajectory is driven backwards.
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    fn waypoint(sample: &SegmentSample, reversed: bool) -> Waypoint {
        let speed = if reversed { -sample.speed } else { sample.speed };

        Waypoint {
            dist: sample.dist,
            translation: Vector::new(0.0, speed),
            heading_deg: Some(Self::chassis_heading(sample.heading_deg, reversed)),
            kind: PathKind::Spline,
        }
    }

    fn pose(position: Vector, tangent: Vector, reversed: bool) -> Pose {
        Pose::from_vector(position, Self::chassis_heading(tangent.angle_deg(), reversed))
    }

    fn chassis_heading(path_heading_deg: f64, reversed: bool) -> f64 {
        let reverse_offset = if reversed { 180.0 } else { 0.0 };
        bound(path_heading_deg + PATH_TO_CHASSIS_DEG + reverse_offset)
    }
}

impl Deref for DifferentialTrajectory {
    type Target = Trajectory;

    fn deref(&self) -> &Self::Target {
        &self.traj
    }
}
