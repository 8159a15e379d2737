//! # Route
//!
//! Description of an autonomous route, as loaded from `route.toml`, and the
//! construction of the trajectory that drives it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use serde::{Deserialize, Serialize};

// Internal
use crate::{
    geom::Vector,
    path::{Path, PathPlus},
    profile::{ProfileError, ProfileParams, VelocityProfile},
    sim::{Chassis, SimParams},
    traj::{
        DifferentialTrajectory, HolonomicTrajectory, Keyframe, TrajError, TrajParams, Trajectory,
    },
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RouteParams {
    /// Which chassis drives the route
    pub chassis: Chassis,

    pub profile: ProfileParams,

    pub route: RouteSpec,

    /// Orientation schedule, holonomic only
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,

    /// Period of the control loop
    #[serde(default = "default_cycle_period_ms")]
    pub cycle_period_ms: f64,

    /// Simulated time after which the route is abandoned
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: f64,

    #[serde(default)]
    pub sim: SimParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The geometry of a route.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteSpec {
    /// Straight forwards (or backwards if negative) on a differential chassis
    Straight { distance: f64 },

    /// Straight translation on a holonomic chassis
    Translate { displacement: Vector },

    Spline {
        path: Path,
        #[serde(default)]
        reversed: bool,
    },

    SplinePlus {
        path: PathPlus,
        #[serde(default)]
        reversed: bool,
    },
}

/// A trajectory for either chassis.
#[derive(Debug, Clone, Serialize)]
pub enum RouteTrajectory {
    Differential(DifferentialTrajectory),
    Holonomic(HolonomicTrajectory),
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Invalid velocity profile: {0}")]
    ProfileError(#[from] ProfileError),

    #[error("Could not build the trajectory: {0}")]
    TrajError(#[from] TrajError),

    #[error("A {0:?} chassis cannot drive a {1} route")]
    UnsupportedRoute(Chassis, &'static str),

    #[error("Reversed routes are only supported on a differential chassis")]
    ReversedHolonomic,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RouteSpec {
    fn name(&self) -> &'static str {
        match self {
            RouteSpec::Straight { .. } => "straight",
            RouteSpec::Translate { .. } => "translate",
            RouteSpec::Spline { .. } => "spline",
            RouteSpec::SplinePlus { .. } => "spline_plus",
        }
    }
}

impl RouteTrajectory {
    /// The chassis independent part of the trajectory.
    pub fn trajectory(&self) -> &Trajectory {
        match self {
            RouteTrajectory::Differential(t) => &**t,
            RouteTrajectory::Holonomic(t) => &**t,
        }
    }
}

/// Build the trajectory for a route.
pub fn build(params: &RouteParams, traj_params: &TrajParams) -> Result<RouteTrajectory, RouteError> {
    let profile = VelocityProfile::from_params(&params.profile)?;

    let traj = match (params.chassis, &params.route) {
        (Chassis::Differential, RouteSpec::Straight { distance }) => RouteTrajectory::Differential(
            DifferentialTrajectory::straight(*distance, &profile),
        ),
        (Chassis::Differential, RouteSpec::Spline { path, reversed }) => {
            RouteTrajectory::Differential(DifferentialTrajectory::spline(
                path, &profile, *reversed, traj_params,
            ))
        }
        (Chassis::Differential, RouteSpec::SplinePlus { path, reversed }) => {
            RouteTrajectory::Differential(DifferentialTrajectory::spline_plus(
                path, &profile, *reversed, traj_params,
            ))
        }
        (Chassis::Holonomic, RouteSpec::Translate { displacement }) => RouteTrajectory::Holonomic(
            HolonomicTrajectory::straight(*displacement, &profile, &params.keyframes)?,
        ),
        (Chassis::Holonomic, RouteSpec::Spline { reversed: true, .. })
        | (Chassis::Holonomic, RouteSpec::SplinePlus { reversed: true, .. }) => {
            return Err(RouteError::ReversedHolonomic)
        }
        (Chassis::Holonomic, RouteSpec::Spline { path, .. }) => RouteTrajectory::Holonomic(
            HolonomicTrajectory::spline(path, &profile, &params.keyframes, traj_params)?,
        ),
        (Chassis::Holonomic, RouteSpec::SplinePlus { path, .. }) => RouteTrajectory::Holonomic(
            HolonomicTrajectory::spline_plus(path, &profile, &params.keyframes, traj_params)?,
        ),
        (chassis, route) => return Err(RouteError::UnsupportedRoute(chassis, route.name())),
    };

    info!(
        "Built {} trajectory for a {:?} chassis, length {:.2}",
        params.route.name(),
        params.chassis,
        traj.trajectory().length()
    );

    Ok(traj)
}

fn default_cycle_period_ms() -> f64 {
    10.0
}

fn default_max_duration_ms() -> f64 {
    60_000.0
}
