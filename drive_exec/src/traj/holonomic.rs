//! # Holonomic trajectories
//!
//! Trajectories for a chassis that can translate in any direction while
//! rotating independently. Translation demands are field frame vectors along
//! the direction of travel, and the heading is taken from an optional
//! [`OrientationSchedule`] rather than from the path.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;
use std::ops::Deref;

// Internal
use super::{
    sample_segment, Keyframe, OrientationSchedule, PathKind, SegmentOffset, SegmentSample,
    TrajError, TrajParams, Trajectory, Waypoint, NUM_SAMPLES,
};
use crate::{
    geom::{Pose, Vector, VectorExt},
    path::{Path, PathPlus},
    profile::VelocityProfile,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A trajectory for a holonomic chassis.
#[derive(Debug, Clone, Serialize)]
pub struct HolonomicTrajectory {
    traj: Trajectory,
    schedule: Option<OrientationSchedule>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HolonomicTrajectory {
    /// Translate by `displacement`, relative to the start of the manoeuvre.
    pub fn straight(
        displacement: Vector,
        profile: &VelocityProfile,
        keyframes: &[Keyframe],
    ) -> Result<Self, TrajError> {
        let schedule = OrientationSchedule::new(keyframes, 1.0)?;
        let length = displacement.norm();
        let direction = Vector::from_angle(displacement.angle_deg());

        let waypoints = (1..=NUM_SAMPLES)
            .map(|i| {
                let x = i as f64 / NUM_SAMPLES as f64;
                Waypoint {
                    dist: x * length,
                    translation: direction * profile.get(i as f64),
                    heading_deg: schedule.as_ref().map(|s| s.interpolate(x)),
                    kind: PathKind::Linear,
                }
            })
            .collect();

        debug!("Generated straight holonomic trajectory of length {:.3}", length);

        Ok(Self::build(
            waypoints,
            Vector::zeros(),
            displacement,
            length,
            PathKind::Linear,
            schedule,
        ))
    }

    /// Follow a single Hermite segment, with keyframe positions in [0, 1].
    pub fn spline(
        path: &Path,
        profile: &VelocityProfile,
        keyframes: &[Keyframe],
        params: &TrajParams,
    ) -> Result<Self, TrajError> {
        let schedule = OrientationSchedule::new(keyframes, 1.0)?;

        let (samples, length) =
            sample_segment(path, NUM_SAMPLES, &SegmentOffset::default(), profile, params);
        let waypoints = samples
            .iter()
            .map(|s| Self::waypoint(s, schedule.as_ref()))
            .collect();

        debug!("Generated holonomic spline of length {:.3}", length);

        Ok(Self::build(
            waypoints,
            path.p0,
            path.p1,
            length,
            PathKind::Spline,
            schedule,
        ))
    }

    /// Follow two chained Hermite segments, with keyframe positions in
    /// [0, 2]. The joint between the segments is at position 1.
    pub fn spline_plus(
        path: &PathPlus,
        profile: &VelocityProfile,
        keyframes: &[Keyframe],
        params: &TrajParams,
    ) -> Result<Self, TrajError> {
        let schedule = OrientationSchedule::new(keyframes, 2.0)?;
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
            .map(|s| Self::waypoint(s, schedule.as_ref()))
            .collect();

        debug!("Generated holonomic composite spline of length {:.3}", length);

        Ok(Self::build(
            waypoints,
            path.p0,
            path.p2,
            length,
            PathKind::Spline,
            schedule,
        ))
    }

    /// The orientation schedule, if the heading is controlled.
    pub fn schedule(&self) -> Option<&OrientationSchedule> {
        self.schedule.as_ref()
    }

    fn build(
        waypoints: Vec<Waypoint>,
        start: Vector,
        end: Vector,
        length: f64,
        kind: PathKind,
        schedule: Option<OrientationSchedule>,
    ) -> Self {
        let (first, last) = schedule
            .as_ref()
            .map(|s| (s.first_angle(), s.last_angle()))
            .unwrap_or((0.0, 0.0));

        Self {
            traj: Trajectory::new(
                waypoints,
                Pose::from_vector(start, first),
                Pose::from_vector(end, last),
                length,
                kind,
                schedule.is_some(),
            ),
            schedule,
        }
    }

    fn waypoint(sample: &SegmentSample, schedule: Option<&OrientationSchedule>) -> Waypoint {
        Waypoint {
            dist: sample.dist,
            translation: Vector::from_angle(sample.heading_deg) * sample.speed,
            heading_deg: schedule.map(|s| s.interpolate(sample.position)),
            kind: PathKind::Spline,
        }
    }
}

impl Deref for HolonomicTrajectory {
    type Target = Trajectory;

    fn deref(&self) -> &Self::Target {
        &self.traj
    }
}
