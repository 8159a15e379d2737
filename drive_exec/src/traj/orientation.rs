//! # Orientation schedule
//!
//! Holonomic trajectories may hold a heading independent of their direction
//! of travel. The heading is given as a set of keyframes over the normalised
//! path position (0 to 1 for a single segment, 0 to 2 for a composite path)
//! and linearly interpolated between them along the shortest rotation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use util::maths::{bound, wrap};

// Internal
use super::TrajError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A target heading at a normalised path position.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub position: f64,
    pub angle_deg: f64,
}

/// A validated set of keyframes, sorted by position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrientationSchedule {
    keyframes: Vec<Keyframe>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Keyframe {
    pub fn new(position: f64, angle_deg: f64) -> Self {
        Self { position, angle_deg }
    }
}

impl OrientationSchedule {
    /// Build a schedule for a path whose last position is `terminal`.
    ///
    /// Keyframes may be given in any order. An empty set of keyframes means
    /// the heading is not controlled, and gives `Ok(None)`. Otherwise the
    /// schedule must cover both ends of the path, each keyframe must lie on
    /// the path and no two keyframes may share a position.
    pub fn new(keyframes: &[Keyframe], terminal: f64) -> Result<Option<Self>, TrajError> {
        if keyframes.is_empty() {
            return Ok(None);
        }

        for k in keyframes {
            // Written as a negated range check so that NaN positions fail
            if !(k.position >= 0.0 && k.position <= terminal) {
                return Err(TrajError::KeyframeOutOfRange {
                    position: k.position,
                    terminal,
                });
            }
        }

        let mut sorted = keyframes.to_vec();
        sorted.sort_by(|a, b| {
            a.position
                .partial_cmp(&b.position)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if let Some(pair) = sorted.windows(2).find(|p| p[0].position == p[1].position) {
            return Err(TrajError::DuplicateKeyframe(pair[0].position));
        }

        if sorted[0].position != 0.0 {
            return Err(TrajError::MissingBoundaryKeyframe(0.0));
        }
        if sorted[sorted.len() - 1].position != terminal {
            return Err(TrajError::MissingBoundaryKeyframe(terminal));
        }

        Ok(Some(Self { keyframes: sorted }))
    }

    /// Heading at the normalised path position `x`.
    ///
    /// Positions before the second keyframe interpolate between the first
    /// two, positions beyond the last keyframe extrapolate from the last two.
    pub fn interpolate(&self, x: f64) -> f64 {
        // A single keyframe must sit at both 0 and the terminal position,
        // which is only possible on a zero length path
        if self.keyframes.len() == 1 {
            return self.keyframes[0].angle_deg;
        }

        let last = self.keyframes.len() - 1;
        let s = self.keyframes[1..]
            .iter()
            .position(|k| k.position >= x)
            .map(|i| i + 1)
            .unwrap_or(last);

        let start = &self.keyframes[s - 1];
        let end = &self.keyframes[s];

        let sweep = wrap(start.angle_deg, end.angle_deg);
        let fraction = (x - start.position) / (end.position - start.position);

        bound(start.angle_deg + fraction * sweep)
    }

    /// Heading of the keyframe at the start of the path.
    pub fn first_angle(&self) -> f64 {
        self.keyframes[0].angle_deg
    }

    /// Heading of the keyframe at the end of the path.
    pub fn last_angle(&self) -> f64 {
        self.keyframes[self.keyframes.len() - 1].angle_deg
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }
}
