//! # Path
//!
//! Cubic Hermite path descriptions and their evaluation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::geom::{Pose, Vector, VectorExt};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single Hermite segment from `p0` to `p1` leaving along `t0` and arriving
/// along `t1`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub p0: Vector,
    pub p1: Vector,
    pub t0: Vector,
    pub t1: Vector,
}

/// Two Hermite segments chained through the midpoint `p1`, which they both
/// share along with its tangent `t1`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathPlus {
    pub p0: Vector,
    pub p1: Vector,
    pub p2: Vector,
    pub t0: Vector,
    pub t1: Vector,
    pub t2: Vector,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Path {
    /// Position on the segment at the normalised parameter `x` in [0, 1].
    pub fn position(&self, x: f64) -> Vector {
        let xx = x * x;
        let xxx = xx * x;

        let h1 = 2.0 * xxx - 3.0 * xx + 1.0;
        let h2 = -2.0 * xxx + 3.0 * xx;
        let h3 = xxx - 2.0 * xx + x;
        let h4 = xxx - xx;

        self.p0 * h1 + self.p1 * h2 + self.t0 * h3 + self.t1 * h4
    }

    /// Sample the segment at `x`, following on from the `previous` sample.
    ///
    /// The heading of the returned pose is the direction of travel from the
    /// previous sample rather than the analytic tangent, so its accuracy
    /// depends on how densely the segment is sampled.
    pub fn sample(&self, previous: &Pose, x: f64) -> Pose {
        let position = self.position(x);
        let heading_deg = (position - previous.vector()).angle_deg();

        Pose::from_vector(position, heading_deg)
    }

    /// The pose at the start of the segment, heading along the start tangent.
    pub fn start_pose(&self) -> Pose {
        Pose::from_vector(self.p0, self.t0.angle_deg())
    }
}

impl PathPlus {
    /// Split into the first (`p0` to `p1`) and second (`p1` to `p2`) segments.
    pub fn segments(&self) -> (Path, Path) {
        (
            Path {
                p0: self.p0,
                p1: self.p1,
                t0: self.t0,
                t1: self.t1,
            },
            Path {
                p0: self.p1,
                p1: self.p2,
                t0: self.t1,
                t1: self.t2,
            },
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn path() -> Path {
        Path {
            p0: Vector::new(0.0, -57.0),
            p1: Vector::new(32.3, 22.2),
            t0: Vector::new(-95.0, 2.0),
            t1: Vector::new(172.7, 101.8),
        }
    }

    #[test]
    fn test_endpoints_exact() {
        let paths = [
            path(),
            Path {
                p0: Vector::new(-3.25, 7.5),
                p1: Vector::new(1e3, -0.1),
                t0: Vector::new(0.0, 0.0),
                t1: Vector::new(-12.0, 44.4),
            },
        ];

        for p in paths.iter() {
            assert_eq!(p.position(0.0), p.p0);
            assert_eq!(p.position(1.0), p.p1);
        }
    }

    #[test]
    fn test_straight_midpoint() {
        // Tangents along the chord give uniform motion along a straight line
        let p = Path {
            p0: Vector::new(0.0, 0.0),
            p1: Vector::new(10.0, 0.0),
            t0: Vector::new(10.0, 0.0),
            t1: Vector::new(10.0, 0.0),
        };
        let mid = p.position(0.5);
        assert_relative_eq!(mid.x, 5.0, epsilon = 1e-12);
        assert_relative_eq!(mid.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sample_heading() {
        let p = path();
        let start = p.start_pose();
        assert_eq!(start.vector(), p.p0);
        assert_relative_eq!(start.heading_deg, Vector::new(-95.0, 2.0).angle_deg());

        // Heading points from the previous sample to the new one
        let prev = Pose::from_vector(p.position(0.5), 0.0);
        let s = p.sample(&prev, 0.51);
        let d = p.position(0.51) - p.position(0.5);
        assert_relative_eq!(s.heading_deg, d.y.atan2(d.x).to_degrees(), epsilon = 1e-9);
    }

    #[test]
    fn test_segments() {
        let pp = PathPlus {
            p0: Vector::new(0.0, -57.0),
            p1: Vector::new(32.3, 22.2),
            p2: Vector::new(-30.0, 52.0),
            t0: Vector::new(-95.0, 2.0),
            t1: Vector::new(172.7, 101.8),
            t2: Vector::new(-65.0, -1.0),
        };
        let (a, b) = pp.segments();
        assert_eq!(a, path());
        assert_eq!(a.position(1.0), b.position(0.0));
        assert_eq!(b.position(1.0), pp.p2);
    }
}
