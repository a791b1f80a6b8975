//! # Rotator Executable
//!
//! Drives the two axis antenna rotator. One of the following is performed per run:
//! - `zero` - move to (0, 0)
//! - `goto` - move to a single orientation
//! - `calibrate` - step through the calibration checkpoints with the operator
//! - `track` - follow the setpoints sent by the tracking program over a serial link
//!
//! The rotator is attached at startup and always detached (zeroed and released) before exiting.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command line interface
mod cli;

/// Setpoints from the tracking program.
mod cmd_source;

/// Parameters for the rotator executable.
mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::{error, info, warn};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::{
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
};
use structopt::StructOpt;

// Internal
use cli::{Cmd, Opts};
use cmd_source::CmdSource;
use params::RotExecParams;
use rot_lib::{
    hardware::HardwareContext,
    rotator::MoveReport,
    MotionRequest, Rotator, RotatorError,
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("rot_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    let min_level = if opts.verbose {
        LevelFilter::Trace
    }
    else {
        LevelFilter::Debug
    };
    logger_init(min_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Rotator Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut params: RotExecParams =
        util::params::load("rot_exec.toml").wrap_err("Could not load rot_exec params")?;

    if params.rotator.state_file_path.is_relative() {
        params.rotator.state_file_path = host::get_sw_root()
            .wrap_err("Failed to get the software root")?
            .join(&params.rotator.state_file_path);
    }

    info!("Parameters loaded");

    // ---- HARDWARE ----

    #[cfg(all(feature = "rpi", target_os = "linux"))]
    let hw = rot_lib::hardware::rpi::RpiHardware::new();

    #[cfg(not(all(feature = "rpi", target_os = "linux")))]
    let hw = {
        warn!("Built without Raspberry Pi support, running against simulated hardware");
        rot_lib::hardware::sim::SimHardware::new()
    };

    run(hw, opts.cmd, params, &session)
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Attach, execute the command, then detach whatever the command's result.
fn run<H: HardwareContext>(
    mut hw: H,
    cmd: Cmd,
    params: RotExecParams,
    session: &Session,
) -> Result<()> {
    let mut archiver = if params.archive_moves {
        Some(
            Archiver::from_path(session, "moves.csv")
                .wrap_err("Failed to create the moves archive")?,
        )
    }
    else {
        None
    };

    let mut rotator =
        Rotator::new(params.rotator.clone()).wrap_err("Invalid rotator parameters")?;

    let initial = rotator
        .attach(&mut hw)
        .wrap_err("Failed to attach the rotator")?;
    info!("Rotator attached at {:?}", initial);

    let exec_result = execute(&mut rotator, cmd, &params, &mut archiver);

    info!("Detaching");
    let detach_result = rotator.detach().wrap_err("Failed to detach the rotator");

    match (exec_result, detach_result) {
        (Err(e), Err(detach_err)) => {
            error!("{:?}", detach_err);
            Err(e)
        }
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn execute<H: HardwareContext>(
    rotator: &mut Rotator<H>,
    cmd: Cmd,
    params: &RotExecParams,
    archiver: &mut Option<Archiver>,
) -> Result<()> {
    match cmd {
        Cmd::Zero => {
            let report = rotator.zero().wrap_err("Failed to zero the rotator")?;
            record(archiver, &report)
        }
        Cmd::Goto {
            az_deg,
            el_deg,
            duration_s,
        } => {
            let request = MotionRequest {
                azimuth_deg: az_deg,
                elevation_deg: el_deg,
                duration_s: duration_s.unwrap_or(params.rotator.el_move_duration_s),
            };

            let report = rotator
                .move_request(&request)
                .wrap_err_with(|| format!("Failed to move to ({}, {})", az_deg, el_deg))?;

            info!(
                "Reached ({:.3}, {:.3}) after {} steps",
                report.achieved_az_deg, report.achieved_el_deg, report.num_steps
            );

            record(archiver, &report)
        }
        Cmd::Calibrate => calibrate(rotator),
        Cmd::Track { device, run_flag } => track(
            rotator,
            device.or_else(|| params.serial_device.clone()),
            run_flag.or_else(|| params.run_flag_path.clone()),
            archiver,
        ),
    }
}

/// Run calibration, asking the operator on the terminal before each checkpoint.
fn calibrate<H: HardwareContext>(rotator: &mut Rotator<H>) -> Result<()> {
    let mut editor = DefaultEditor::new().wrap_err("Failed to open the operator prompt")?;

    let outcome = rotator
        .calibrate(|step| {
            let prompt = format!(
                "[{}/{}] Move to AZ {:.1} EL {:.1}? [Y/n] ",
                step.index + 1,
                step.total,
                step.target.azimuth_deg,
                step.target.elevation_deg
            );

            match editor.readline(&prompt) {
                Ok(answer) => !answer.trim().to_lowercase().starts_with('n'),
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => false,
                Err(e) => {
                    warn!("Operator prompt failed: {}", e);
                    false
                }
            }
        })
        .wrap_err("Calibration failed")?;

    info!("Calibration finished: {:?}", outcome);

    Ok(())
}

/// Follow the tracking program until its input closes or the run flag is deleted.
fn track<H: HardwareContext>(
    rotator: &mut Rotator<H>,
    device: Option<PathBuf>,
    run_flag: Option<PathBuf>,
    archiver: &mut Option<Archiver>,
) -> Result<()> {
    if let Some(flag) = &run_flag {
        fs::write(flag, "")
            .wrap_err_with(|| format!("Failed to create the run flag {:?}", flag))?;
        info!("Tracking until {:?} is deleted", flag);
    }

    match device {
        Some(path) => {
            let file = File::open(&path)
                .wrap_err_with(|| format!("Failed to open the command device {:?}", path))?;
            info!("Reading commands from {:?}", path);
            follow(rotator, CmdSource::new(file), run_flag.as_deref(), archiver)
        }
        None => {
            info!("Reading commands from stdin");
            follow(rotator, CmdSource::new(io::stdin()), run_flag.as_deref(), archiver)
        }
    }
}

fn follow<H: HardwareContext, R: Read>(
    rotator: &mut Rotator<H>,
    mut source: CmdSource<R>,
    run_flag: Option<&Path>,
    archiver: &mut Option<Archiver>,
) -> Result<()> {
    loop {
        if let Some(flag) = run_flag {
            if !flag.exists() {
                info!("Run flag removed, stopping");
                return Ok(());
            }
        }

        let setpoint = match source
            .next_setpoint()
            .wrap_err("Failed to read the command source")?
        {
            Some(s) => s,
            None => {
                info!("Command source closed, stopping");
                return Ok(());
            }
        };

        match rotator.move_to(setpoint.azimuth_deg, setpoint.elevation_deg) {
            Ok(report) => record(archiver, &report)?,
            Err(RotatorError::OutOfRange(e)) => warn!("Ignoring setpoint {:?}: {}", setpoint, e),
            Err(e) => return Err(e).wrap_err("Tracking move failed"),
        }
    }
}

fn record(archiver: &mut Option<Archiver>, report: &MoveReport) -> Result<()> {
    if let Some(a) = archiver {
        a.serialise(report).wrap_err("Failed to archive the move")?;
    }
    Ok(())
}
