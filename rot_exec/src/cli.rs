//! # Command line interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;
use structopt::{clap::AppSettings, StructOpt};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "rot_exec", about = "Antenna rotator executable")]
pub struct Opts {
    /// Log every actuator call.
    #[structopt(short, long)]
    pub verbose: bool,

    #[structopt(subcommand)]
    pub cmd: Cmd,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
pub enum Cmd {
    /// Move the rotator to (0, 0).
    #[structopt(name = "zero")]
    Zero,

    /// Visit each calibration checkpoint in turn, asking for confirmation before each one.
    #[structopt(name = "calibrate")]
    Calibrate,

    /// Move to the given orientation.
    #[structopt(name = "goto", setting = AppSettings::AllowNegativeNumbers)]
    Goto {
        /// Target azimuth in degrees, any value is wrapped into [0, 360).
        az_deg: f64,

        /// Target elevation in degrees.
        el_deg: f64,

        /// Duration of the elevation move in seconds, 0 moves in a single jump. Defaults to the
        /// value in the parameter file.
        #[structopt(short, long)]
        duration_s: Option<f64>,
    },

    /// Follow the setpoints sent by the tracking program.
    #[structopt(name = "track")]
    Track {
        /// Device to read commands from, overriding the parameter file.
        #[structopt(short, long, parse(from_os_str))]
        device: Option<PathBuf>,

        /// Run flag file, overriding the parameter file. Tracking stops once it is deleted.
        #[structopt(short, long, parse(from_os_str))]
        run_flag: Option<PathBuf>,
    },
}
