//! Parameters structure for the Rotator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::hardware::PinParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the rotator.
///
/// Missing fields in a parameter file take their default value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotatorParams {
    // ---- AZIMUTH ----
    /// Azimuth rotation produced by a single step of the stepper motor.
    ///
    /// Units: degrees
    pub step_angle_deg: f64,

    /// Time the step line is held high, and then low, for each step.
    ///
    /// Units: milliseconds
    pub step_pulse_ms: u64,

    /// Time between setting the direction line and the first step.
    ///
    /// Units: milliseconds
    pub dir_setup_ms: u64,

    // ---- ELEVATION ----
    /// Lowest achievable elevation.
    ///
    /// Units: degrees
    pub el_min_deg: f64,

    /// Highest achievable elevation.
    ///
    /// Units: degrees
    pub el_max_deg: f64,

    /// Servo angle at zero elevation.
    ///
    /// Units: degrees
    pub servo_neutral_deg: f64,

    /// Servo degrees per elevation degree, negative for a reversed servo.
    pub servo_gain: f64,

    /// Physical sweep of the servo, (min, max).
    ///
    /// Units: degrees
    pub servo_sweep_deg: (f64, f64),

    /// Pulse widths at the two ends of the servo sweep, (min, max).
    ///
    /// Units: microseconds
    pub servo_pulse_range_us: (u32, u32),

    // ---- TRAJECTORY ----
    /// Number of waypoints in a smoothed elevation move.
    pub num_waypoints: usize,

    /// Default duration of an elevation move. Zero moves in a single jump.
    ///
    /// Units: seconds
    pub el_move_duration_s: f64,

    /// Delay after each elevation move before the servo control signal is switched off. Zero
    /// keeps the signal on between moves.
    ///
    /// Units: milliseconds
    pub servo_release_ms: u64,

    // ---- RESOURCES ----
    /// GPIO pin assignments
    pub pins: PinParams,

    /// Path to the position record.
    pub state_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RotatorParams {
    fn default() -> Self {
        Self {
            step_angle_deg: 1.8,
            step_pulse_ms: 5,
            dir_setup_ms: 1,
            el_min_deg: -10.0,
            el_max_deg: 90.0,
            servo_neutral_deg: 90.0,
            servo_gain: 1.0,
            servo_sweep_deg: (0.0, 180.0),
            servo_pulse_range_us: (500, 2500),
            num_waypoints: 4,
            el_move_duration_s: 0.25,
            servo_release_ms: 200,
            pins: PinParams::default(),
            state_file_path: PathBuf::from("rotator_state.json"),
        }
    }
}

impl RotatorParams {
    /// Elevation limits as a (min, max) tuple.
    pub fn el_limits_deg(&self) -> (f64, f64) {
        (self.el_min_deg, self.el_max_deg)
    }

    /// Check the parameters describe a rotator that can be driven.
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.step_angle_deg.is_finite() && self.step_angle_deg > 0.0) {
            return Err(format!(
                "step_angle_deg must be positive, found {}",
                self.step_angle_deg
            ));
        }

        // Zeroing must always be possible
        if !(self.el_min_deg <= 0.0 && self.el_max_deg >= 0.0) {
            return Err(format!(
                "elevation limits [{}, {}] must contain zero",
                self.el_min_deg, self.el_max_deg
            ));
        }

        if !(self.servo_sweep_deg.0 < self.servo_sweep_deg.1) {
            return Err(format!("servo_sweep_deg {:?} is empty", self.servo_sweep_deg));
        }

        if self.servo_pulse_range_us.0 == 0 || self.servo_pulse_range_us.1 == 0 {
            return Err("servo_pulse_range_us must not contain zero, which switches the servo off"
                .into());
        }

        if !self.el_move_duration_s.is_finite() {
            return Err("el_move_duration_s must be finite".into());
        }

        Ok(())
    }
}
