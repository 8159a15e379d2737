//! # Drive library.
//!
//! Motion planning and execution for a mobile robot chassis. This library
//! allows other crates in the workspace, and the benchmarks, to access items
//! defined inside the drive crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Geometry - vectors and poses in the robot's plane
pub mod geom;

/// Velocity profile - S-curve speed demands along a path
pub mod profile;

/// Controllers - the PID controller
pub mod controllers;

/// Path - cubic Hermite path descriptions
pub mod path;

/// Trajectory module - discretises paths into waypoints
pub mod traj;

/// Hardware abstraction - sensor, actuator and clock interfaces
pub mod hal;

/// Drive control module - odometry and trajectory following
pub mod drive_ctrl;

/// Simulation - a headless simulated chassis
pub mod sim;

/// Route - autonomous route descriptions
pub mod route;
