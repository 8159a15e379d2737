//! # Trajectory module
//!
//! Trajectories are the discretised form of a path. A path description (a
//! straight line, a single Hermite segment or a pair of chained segments) is
//! sampled into an ordered sequence of waypoints, each one carrying the
//! distance along the path at which it applies, the translation demand at that
//! point and, if the chassis should hold a heading there, the target heading.
//!
//! Translation demands are derived from a [`VelocityProfile`] evaluated on a
//! 100 sample scale. On splines the demand is additionally reduced in corners:
//! the change in travel direction between consecutive samples acts as a
//! curvature proxy, and the speed is divided by
//! `curvature_scale * |change| + 1`.
//!
//! Distances are accumulated along the sampled polyline, so they approximate
//! the arc length of the spline rather than being exact.
//!
//! Trajectories are immutable once built and are looked up by the distance
//! the robot has travelled, see [`Trajectory::get`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod differential;
pub mod holonomic;
pub mod orientation;
pub mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use differential::DifferentialTrajectory;
pub use holonomic::HolonomicTrajectory;
pub use orientation::{Keyframe, OrientationSchedule};
pub use params::TrajParams;

use crate::{
    geom::{Pose, Vector},
    path::Path,
    profile::VelocityProfile,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of waypoints generated for one trajectory. Composite paths split
/// these evenly between their two segments.
pub const NUM_SAMPLES: usize = 100;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One sample of a trajectory.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Waypoint {
    /// Distance along the path from its start at which this waypoint applies.
    pub dist: f64,

    /// Translation demand as a fraction of full speed. For a differential
    /// chassis only `y` (forwards) is used, for a holonomic chassis this is a
    /// field frame vector.
    pub translation: Vector,

    /// Heading the chassis should hold at this waypoint, `None` if the
    /// heading is not controlled.
    pub heading_deg: Option<f64>,

    /// How the waypoint was generated
    pub kind: PathKind,
}

/// An immutable, discretised trajectory.
#[derive(Debug, Clone, Serialize)]
pub struct Trajectory {
    waypoints: Vec<Waypoint>,
    initial_pose: Pose,
    final_pose: Pose,
    length: f64,
    kind: PathKind,
    orientation_enabled: bool,
}

/// Offsets of a segment within a composite path.
///
/// Generating the second segment of a composite path needs to know where the
/// first one ended, these are passed explicitly rather than being left behind
/// in the generator.
#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct SegmentOffset {
    /// Index on the velocity profile's scale of the sample before the first
    pub profile_index: usize,

    /// Length of the path before this segment
    pub length: f64,

    /// Normalised path position at the start of this segment
    pub position: f64,
}

/// A sample of a Hermite segment.
#[derive(Debug, Copy, Clone)]
pub(crate) struct SegmentSample {
    /// Normalised path position of the sample, including the segment offset
    pub position: f64,

    /// Cumulative distance, including the segment offset
    pub dist: f64,

    /// Finite difference heading of the path at the sample
    pub heading_deg: f64,

    /// Profile speed reduced for the local curvature
    pub speed: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The interpolation used to generate a trajectory.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum PathKind {
    Linear,
    Spline,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrajError {
    #[error("Attempted to look up a waypoint on an empty trajectory")]
    EmptyTrajectory,

    #[error("Distance {distance} is beyond the end of the trajectory ({length})")]
    OutOfRange { distance: f64, length: f64 },

    #[error("The orientation schedule must contain a keyframe at position {0}")]
    MissingBoundaryKeyframe(f64),

    #[error("Orientation keyframe position {position} is outside [0, {terminal}]")]
    KeyframeOutOfRange { position: f64, terminal: f64 },

    #[error("The orientation schedule contains more than one keyframe at position {0}")]
    DuplicateKeyframe(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    pub(crate) fn new(
        waypoints: Vec<Waypoint>,
        initial_pose: Pose,
        final_pose: Pose,
        length: f64,
        kind: PathKind,
        orientation_enabled: bool,
    ) -> Self {
        Self {
            waypoints,
            initial_pose,
            final_pose,
            length,
            kind,
            orientation_enabled,
        }
    }

    /// Get the waypoint to execute after travelling `distance` along the
    /// trajectory.
    ///
    /// This is the first waypoint whose distance is at least `distance`.
    pub fn get(&self, distance: f64) -> Result<&Waypoint, TrajError> {
        if self.waypoints.is_empty() {
            return Err(TrajError::EmptyTrajectory);
        }

        if distance > self.length {
            return Err(TrajError::OutOfRange {
                distance,
                length: self.length,
            });
        }

        self.waypoints
            .iter()
            .find(|w| w.dist >= distance)
            .ok_or(TrajError::OutOfRange {
                distance,
                length: self.length,
            })
    }

    /// The waypoints of the trajectory, in order of increasing distance.
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn initial_pose(&self) -> Pose {
        self.initial_pose
    }

    pub fn final_pose(&self) -> Pose {
        self.final_pose
    }

    /// Total length of the trajectory.
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    /// True if an orientation schedule was supplied.
    pub fn orientation_enabled(&self) -> bool {
        self.orientation_enabled
    }
}

/// Sample a single Hermite segment.
///
/// Returns the samples, in order, and the length of the segment.
pub(crate) fn sample_segment(
    path: &Path,
    num_samples: usize,
    offset: &SegmentOffset,
    profile: &VelocityProfile,
    params: &TrajParams,
) -> (Vec<SegmentSample>, f64) {
    let mut samples = Vec::with_capacity(num_samples);
    let mut previous = path.start_pose();
    let mut dist = 0f64;

    for i in 1..=num_samples {
        let x = i as f64 / num_samples as f64;
        let current = path.sample(&previous, x);

        // Change in direction between samples is the curvature proxy
        let step = previous.get_error(&current);
        let corner_factor = 1.0 / (params.curvature_scale * step.heading_deg.abs() + 1.0);
        let speed = corner_factor * profile.get((i + offset.profile_index) as f64);

        dist += step.vector().norm();

        samples.push(SegmentSample {
            position: offset.position + x,
            dist: offset.length + dist,
            heading_deg: current.heading_deg,
            speed,
        });

        previous = current;
    }

    (samples, dist)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::path::PathPlus;

    pub(crate) fn profile() -> VelocityProfile {
        VelocityProfile::new(0.15, 0.05, 0.45, 0.35, 0.8).unwrap()
    }

    pub(crate) fn path_plus() -> PathPlus {
        PathPlus {
            p0: Vector::new(0.0, -57.0),
            p1: Vector::new(32.3, 22.2),
            p2: Vector::new(-30.0, 52.0),
            t0: Vector::new(-95.0, 2.0),
            t1: Vector::new(172.7, 101.8),
            t2: Vector::new(-65.0, -1.0),
        }
    }

    /// Checks the ordering and lookup properties every trajectory must have.
    pub(crate) fn check_trajectory(traj: &Trajectory) {
        let wps = traj.waypoints();
        assert!(!wps.is_empty());

        for pair in wps.windows(2) {
            assert!(pair[0].dist <= pair[1].dist);
        }
        assert_eq!(wps[wps.len() - 1].dist, traj.length());

        assert_eq!(traj.get(0.0).unwrap(), &wps[0]);
        assert_eq!(traj.get(traj.length()).unwrap(), &wps[wps.len() - 1]);

        for i in 1..wps.len() {
            if wps[i - 1].dist < wps[i].dist {
                let mid = 0.5 * (wps[i - 1].dist + wps[i].dist);
                assert_eq!(traj.get(mid).unwrap(), &wps[i]);
                assert_eq!(traj.get(wps[i].dist).unwrap(), &wps[i]);
            }
        }

        assert_eq!(
            traj.get(traj.length() + 1.0),
            Err(TrajError::OutOfRange {
                distance: traj.length() + 1.0,
                length: traj.length()
            })
        );
    }

    #[test]
    fn test_sample_segment_offsets() {
        let (a, b) = path_plus().segments();
        let params = TrajParams::default();

        let (samples_a, len_a) = sample_segment(&a, 50, &SegmentOffset::default(), &profile(), &params);
        let offset = SegmentOffset {
            profile_index: 50,
            length: len_a,
            position: 1.0,
        };
        let (samples_b, len_b) = sample_segment(&b, 50, &offset, &profile(), &params);

        assert_eq!(samples_a.len(), 50);
        assert_eq!(samples_a[49].dist, len_a);
        assert_eq!(samples_a[49].position, 1.0);
        approx::assert_relative_eq!(samples_b[0].position, 1.02);
        assert_eq!(samples_b[49].position, 2.0);
        assert_eq!(samples_b[49].dist, len_a + len_b);
        assert!(samples_b[0].dist > len_a);

        // The chord is never longer than the polyline
        assert!(len_a >= (a.p1 - a.p0).norm());
    }

    #[test]
    fn test_corner_slow_down() {
        // A straight spline has no direction changes after the first sample,
        // so speeds follow the profile exactly
        let straight = Path {
            p0: Vector::new(0.0, 0.0),
            p1: Vector::new(0.0, 100.0),
            t0: Vector::new(0.0, 100.0),
            t1: Vector::new(0.0, 100.0),
        };
        let (samples, len) = sample_segment(
            &straight, 100, &SegmentOffset::default(), &profile(), &TrajParams::default());

        approx::assert_relative_eq!(len, 100.0, epsilon = 1e-9);
        for (i, s) in samples.iter().enumerate() {
            approx::assert_relative_eq!(s.speed, profile().get((i + 1) as f64), epsilon = 1e-9);
        }

        // On a curve the demanded speed is below the profile
        let (curve, _) = path_plus().segments();
        let (samples, _) = sample_segment(
            &curve, 100, &SegmentOffset::default(), &profile(), &TrajParams::default());
        assert!(samples.iter().enumerate().any(|(i, s)| s.speed < 0.99 * profile().get((i + 1) as f64)));
        for (i, s) in samples.iter().enumerate() {
            assert!(s.speed <= profile().get((i + 1) as f64));
        }
    }

    #[test]
    fn test_empty_trajectory() {
        let traj = Trajectory::new(
            Vec::new(), Pose::default(), Pose::default(), 0.0, PathKind::Linear, false);
        assert_eq!(traj.get(0.0), Err(TrajError::EmptyTrajectory));
    }
}
