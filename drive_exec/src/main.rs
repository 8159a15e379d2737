//! Main drive executable entry point.
//!
//! Runs a single autonomous route against the simulated chassis.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Load parameters and build the route's trajectory
//!     - Initialise the drive controller, waiting for sensor calibration
//!     - Main loop, once per cycle period:
//!         - Localisation
//!         - Trajectory following
//!         - Simulated time advances by one cycle
//!
//! The executable finishes once the trajectory reports completion.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::info;
use std::{cell::RefCell, rc::Rc};

// Internal
use drive_lib::{
    drive_ctrl::{
        DiffDriveParams, DifferentialDrive, DriveController, HoloDriveParams, HolonomicDrive,
    },
    route::{self, RouteParams, RouteTrajectory},
    sim::{Chassis, SimWorld},
    traj::TrajParams,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drive_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    // Initialise logger, the simulator is only interesting when debugging it
    logger_init(LevelFilter::Debug, &[("drive_lib::sim", LevelFilter::Info)], &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let route_params: RouteParams =
        util::params::load("route.toml").wrap_err("Could not load route params")?;
    let traj_params: TrajParams =
        util::params::load("traj.toml").wrap_err("Could not load trajectory params")?;

    info!("Exec parameters loaded");

    // ---- BUILD TRAJECTORY ----

    let traj = route::build(&route_params, &traj_params)
        .wrap_err("Failed to build the route's trajectory")?;

    session
        .save("trajectory.json", &traj)
        .wrap_err("Failed to save the trajectory")?;

    // ---- RUN ----

    match (route_params.chassis, &traj) {
        (Chassis::Differential, RouteTrajectory::Differential(t)) => {
            let params: DiffDriveParams = util::params::load("diff_drive.toml")
                .wrap_err("Could not load differential drive params")?;
            let world = SimWorld::new_differential(route_params.sim.clone());
            let drive = DifferentialDrive::new(params, SimWorld::differential_hal(&world));

            run(drive, t, &world, &route_params)
        }
        (Chassis::Holonomic, RouteTrajectory::Holonomic(t)) => {
            let params: HoloDriveParams = util::params::load("holo_drive.toml")
                .wrap_err("Could not load holonomic drive params")?;
            let world = SimWorld::new_holonomic(route_params.sim.clone());
            let drive = HolonomicDrive::new(params, SimWorld::holonomic_hal(&world));

            run(drive, t, &world, &route_params)
        }
        (chassis, _) => Err(eyre!("Built trajectory does not match the {:?} chassis", chassis)),
    }
}

/// Follow the trajectory to completion.
fn run<D: DriveController>(
    mut drive: D,
    traj: &D::Trajectory,
    world: &Rc<RefCell<SimWorld>>,
    params: &RouteParams,
) -> Result<(), Report>
where
    D::Trajectory: std::ops::Deref<Target = drive_lib::traj::Trajectory>,
{
    drive.init().wrap_err("Failed to initialise the drive")?;

    // Start the chassis where the trajectory does
    world.borrow_mut().set_pose(traj.initial_pose());
    drive.set_pose(traj.initial_pose());
    drive.reset();

    info!("Beginning main loop\n");

    let start_ms = world.borrow().time_ms();
    let mut last_report = 0.0;

    loop {
        let progress = drive
            .follow(traj)
            .wrap_err("Error while following the trajectory")?;

        if progress >= 1.0 {
            break;
        }

        // Report every tenth of the way
        if progress - last_report >= 0.1 {
            info!("Progress {:.0} %", progress * 100.0);
            last_report = progress;
        }

        let elapsed_ms = world.borrow().time_ms() - start_ms;
        if elapsed_ms > params.max_duration_ms {
            drive.stop();
            return Err(eyre!("Route not complete after {} ms", elapsed_ms));
        }

        world.borrow_mut().step(params.cycle_period_ms);
    }

    let state = drive.state();
    let truth = world.borrow().pose();

    info!(
        "Route complete, estimated pose ({:.2}, {:.2}, {:.2}), true pose ({:.2}, {:.2}, {:.2})",
        state.pose.x, state.pose.y, state.pose.heading_deg, truth.x, truth.y, truth.heading_deg
    );
    info!("Planned end ({:.2}, {:.2})", traj.final_pose().x, traj.final_pose().y);

    Ok(())
}
