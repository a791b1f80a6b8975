//! Rotator module
//!
//! The [`Rotator`] façade owns the lifecycle of the hardware and hands each move to the
//! [`ActuatorCoordinator`], which drives both axes at once and keeps the position record up to
//! date.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod coordinator;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use coordinator::*;
pub use params::*;
pub use state::*;

use crate::{
    angle::OutOfRangeError,
    hardware::{ActuatorError, HardwareError},
    pos_store::PersistenceError,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Azimuth checkpoints visited during calibration.
///
/// Units: degrees
pub const CALIB_AZ_DEG: [f64; 3] = [90.0, 180.0, 270.0];

/// Elevation checkpoints visited during calibration.
///
/// Units: degrees
pub const CALIB_EL_DEG: [f64; 5] = [-10.0, 30.0, 45.0, 60.0, 90.0];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The two axes of the rotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Axis {
    Azimuth,
    Elevation,
}

/// Possible errors that can occur during Rotator operation.
#[derive(Debug, thiserror::Error)]
pub enum RotatorError {
    #[error("Invalid rotator parameters: {0}")]
    InvalidParams(String),

    #[error("Target out of range: {0}")]
    OutOfRange(OutOfRangeError),

    #[error("The rotator is not attached")]
    NotAttached,

    #[error("Could not attach the rotator: {0}")]
    Attachment(HardwareError),

    #[error(
        "Could not persist the orientation, the physical position may no longer match the \
         record: {0}"
    )]
    Persistence(PersistenceError),

    #[error("Actuator failure on the {0:?} axis: {1}")]
    Actuator(Axis, ActuatorError),

    #[error("The {0:?} axis unit panicked")]
    AxisUnitPanicked(Axis),
}

impl From<OutOfRangeError> for RotatorError {
    fn from(e: OutOfRangeError) -> Self {
        RotatorError::OutOfRange(e)
    }
}

impl From<PersistenceError> for RotatorError {
    fn from(e: PersistenceError) -> Self {
        RotatorError::Persistence(e)
    }
}
