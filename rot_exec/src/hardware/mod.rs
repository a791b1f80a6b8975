//! # Hardware Module
//!
//! This module provides the capability traits the rotator core drives, so that the core never
//! touches GPIO itself:
//!
//! - [`StepperDriver`] - step and direction lines of the azimuth stepper driver
//! - [`ServoDriver`] - control pulse of the elevation servo
//! - [`HardwareContext`] - hands out one of each when the rotator is attached
//!
//! Each axis is driven from its own thread, so the drivers must be `Send`. A driver is released
//! by dropping it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Simulated hardware which records every call, used on hosts without GPIO and in tests.
pub mod sim;

/// Raspberry Pi GPIO hardware.
#[cfg(all(feature = "rpi", target_os = "linux"))]
pub mod rpi;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Driver for the azimuth stepper motor.
pub trait StepperDriver: Send {
    /// Set the direction line. `cw` selects clockwise rotation.
    fn set_direction(&mut self, cw: bool) -> Result<(), ActuatorError>;

    /// Set the level of the step line. The motor steps once on each rising edge.
    fn set_step(&mut self, active: bool) -> Result<(), ActuatorError>;
}

/// Driver for the elevation servo.
pub trait ServoDriver: Send {
    /// Set the control pulse width. A width of zero switches the control signal off.
    fn set_pulse_width_us(&mut self, pulse_width_us: u32) -> Result<(), ActuatorError>;
}

/// Source of actuator resources.
///
/// Built once by the executable and passed by reference into `Rotator::attach`.
pub trait HardwareContext {
    type Stepper: StepperDriver;
    type Servo: ServoDriver;

    /// Reserve the stepper and servo on the given pins.
    fn reserve(&mut self, pins: &PinParams) -> Result<(Self::Stepper, Self::Servo), HardwareError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pin assignments, using Broadcom GPIO numbering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinParams {
    /// Step line of the stepper driver
    pub step_pin: u8,

    /// Direction line of the stepper driver
    pub dir_pin: u8,

    /// Level of the direction line which selects clockwise rotation
    pub cw_level_high: bool,

    /// Control line of the elevation servo
    pub servo_pin: u8,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised by a driver while moving.
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("GPIO write failed: {0}")]
    Gpio(String),

    #[error("Injected fault on the simulated {0}")]
    SimFault(&'static str),
}

/// Errors raised while reserving hardware.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("The actuators are already reserved")]
    AlreadyReserved,

    #[error("Hardware unavailable: {0}")]
    Unavailable(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PinParams {
    fn default() -> Self {
        Self {
            step_pin: 18,
            dir_pin: 17,
            cw_level_high: true,
            servo_pin: 22,
        }
    }
}
