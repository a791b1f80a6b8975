//! # Angle normalisation
//!
//! Pure functions converting commanded angles into values the actuators can take:
//!
//! - Azimuth is cyclic and is wrapped into [0, 360).
//! - Elevation is mechanically hard-limited, so out of range values are rejected rather than
//!   saturated.
//! - The servo's neutral position is not logical zero elevation, so elevation is mapped onto the
//!   servo's physical sweep and from there onto a pulse width.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use util::maths::{lin_map, rem_euclid};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Degrees in a full azimuth revolution.
pub const FULL_TURN_DEG: f64 = 360.0;

// ------------------------------------------------------------------------------------------------
// ERRORS
// ------------------------------------------------------------------------------------------------

/// A value fell outside the range the hardware can achieve.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{quantity} of {value} is outside the allowed range [{min}, {max}]")]
pub struct OutOfRangeError {
    /// What was being checked
    pub quantity: &'static str,

    pub value: f64,
    pub min: f64,
    pub max: f64,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Wrap an azimuth into [0, 360).
///
/// Negative inputs wrap from the top of the range, so -10 becomes 350.
pub fn normalise_azimuth(az_deg: f64) -> f64 {
    let az = rem_euclid(az_deg, FULL_TURN_DEG);

    // Tiny negative inputs can round up to a full turn
    if az >= FULL_TURN_DEG {
        0.0
    }
    else {
        az
    }
}

/// Check that an azimuth is a finite number, which is all that is needed before wrapping it.
pub fn check_azimuth(az_deg: f64) -> Result<f64, OutOfRangeError> {
    if az_deg.is_finite() {
        Ok(az_deg)
    }
    else {
        Err(OutOfRangeError {
            quantity: "Azimuth",
            value: az_deg,
            min: std::f64::MIN,
            max: std::f64::MAX,
        })
    }
}

/// Check that an elevation lies within the mechanical limits `(min, max)`.
///
/// The elevation is returned unchanged on success.
pub fn check_elevation(el_deg: f64, limits_deg: (f64, f64)) -> Result<f64, OutOfRangeError> {
    // Written so that NaN is rejected too
    if el_deg >= limits_deg.0 && el_deg <= limits_deg.1 {
        Ok(el_deg)
    }
    else {
        Err(OutOfRangeError {
            quantity: "Elevation",
            value: el_deg,
            min: limits_deg.0,
            max: limits_deg.1,
        })
    }
}

/// Map a logical elevation onto the servo's physical angle.
///
/// `neutral_deg` is the servo angle corresponding to zero elevation and `gain` the number of servo
/// degrees per elevation degree (negative if the servo is mounted reversed).
pub fn to_actuator_range(el_deg: f64, neutral_deg: f64, gain: f64) -> f64 {
    neutral_deg + gain * el_deg
}

/// Convert a physical servo angle into a control pulse width.
///
/// The servo sweep `sweep_deg` maps linearly onto `pulse_range_us`. Angles outside the sweep are
/// rejected.
pub fn actuator_to_pulse_width(
    actuator_deg: f64,
    sweep_deg: (f64, f64),
    pulse_range_us: (u32, u32),
) -> Result<u32, OutOfRangeError> {
    if !(actuator_deg >= sweep_deg.0 && actuator_deg <= sweep_deg.1) {
        return Err(OutOfRangeError {
            quantity: "Servo angle",
            value: actuator_deg,
            min: sweep_deg.0,
            max: sweep_deg.1,
        });
    }

    let us = lin_map(
        sweep_deg,
        (pulse_range_us.0 as f64, pulse_range_us.1 as f64),
        actuator_deg,
    );

    Ok(us.round() as u32)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_normalise_azimuth() {
        assert_eq!(normalise_azimuth(0.0), 0.0);
        assert_eq!(normalise_azimuth(359.5), 359.5);
        assert_eq!(normalise_azimuth(360.0), 0.0);
        assert_eq!(normalise_azimuth(370.0), 10.0);
        assert_eq!(normalise_azimuth(-10.0), 350.0);
        assert_eq!(normalise_azimuth(-720.0), 0.0);

        // Rounds up to 360 inside rem_euclid
        let az = normalise_azimuth(-1e-20);
        assert!(az >= 0.0 && az < FULL_TURN_DEG);
    }

    #[test]
    fn test_check_azimuth() {
        assert_eq!(check_azimuth(-725.5), Ok(-725.5));
        assert!(check_azimuth(std::f64::NAN).is_err());
        assert!(check_azimuth(std::f64::INFINITY).is_err());
    }

    #[test]
    fn test_check_elevation() {
        let limits = (-10.0, 90.0);

        assert_eq!(check_elevation(-10.0, limits), Ok(-10.0));
        assert_eq!(check_elevation(45.0, limits), Ok(45.0));
        assert_eq!(check_elevation(90.0, limits), Ok(90.0));

        let err = check_elevation(90.5, limits).unwrap_err();
        assert_eq!(err.value, 90.5);
        assert_eq!(err.max, 90.0);

        assert!(check_elevation(-10.1, limits).is_err());
        assert!(check_elevation(std::f64::NAN, limits).is_err());
    }

    #[test]
    fn test_to_actuator_range() {
        assert_eq!(to_actuator_range(0.0, 90.0, 1.0), 90.0);
        assert_eq!(to_actuator_range(90.0, 90.0, 1.0), 180.0);
        assert_eq!(to_actuator_range(-10.0, 90.0, 1.0), 80.0);

        // Reversed servo
        assert_eq!(to_actuator_range(45.0, 90.0, -1.0), 45.0);
    }

    #[test]
    fn test_actuator_to_pulse_width() {
        let sweep = (0.0, 180.0);
        let pulse = (500, 2500);

        assert_eq!(actuator_to_pulse_width(0.0, sweep, pulse), Ok(500));
        assert_eq!(actuator_to_pulse_width(90.0, sweep, pulse), Ok(1500));
        assert_eq!(actuator_to_pulse_width(180.0, sweep, pulse), Ok(2500));
        assert_eq!(actuator_to_pulse_width(45.0, sweep, pulse), Ok(1000));

        assert!(actuator_to_pulse_width(180.1, sweep, pulse).is_err());
        assert!(actuator_to_pulse_width(-0.1, sweep, pulse).is_err());
    }
}
