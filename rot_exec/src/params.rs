//! # Rotator Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use rot_lib::RotatorParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RotExecParams {
    /// Parameters for the rotator itself
    pub rotator: RotatorParams,

    /// Serial device the tracking program writes to. Stdin is read if this is not set.
    pub serial_device: Option<PathBuf>,

    /// Tracking continues only while this file exists.
    pub run_flag_path: Option<PathBuf>,

    /// Write a row to `moves.csv` in the session archive for every completed move.
    pub archive_moves: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shipped_params() {
        let params: RotExecParams =
            util::params::parse(include_str!("../../params/rot_exec.toml")).unwrap();

        assert!(params.rotator.validate().is_ok());
        assert_eq!(params.rotator.step_angle_deg, 1.8);
        assert_eq!(params.rotator.pins.step_pin, 18);
        assert_eq!(params.rotator.pins.servo_pin, 22);
        assert_eq!(params.serial_device, Some(PathBuf::from("/dev/ttyS11")));
        assert!(params.archive_moves);
    }
}
