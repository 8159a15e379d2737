//! Trajectory generation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, Deserialize)]
pub struct TrajParams {
    /// Sensitivity of the spline corner slow down to the change in direction
    /// between samples, in 1/degrees.
    #[serde(default = "default_curvature_scale")]
    pub curvature_scale: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TrajParams {
    fn default() -> Self {
        Self {
            curvature_scale: default_curvature_scale(),
        }
    }
}

fn default_curvature_scale() -> f64 {
    0.4
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let p: TrajParams = util::params::from_str("").unwrap();
        assert_eq!(p.curvature_scale, 0.4);

        let p: TrajParams = util::params::from_str("curvature_scale = 0.1").unwrap();
        assert_eq!(p.curvature_scale, 0.1);
    }
}
