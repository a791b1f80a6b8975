//! # Orientation types

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The believed physical orientation of the rotator.
///
/// There is no position feedback on either axis, so this is only ever the dead-reckoned result of
/// the commands already issued.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation {
    /// Azimuth, always in [0, 360).
    ///
    /// Units: degrees
    pub azimuth_deg: f64,

    /// Elevation, always within the configured mechanical limits.
    ///
    /// Units: degrees
    pub elevation_deg: f64,
}

/// A single request to move the rotator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionRequest {
    /// Target azimuth, any finite value (wrapped before planning).
    ///
    /// Units: degrees
    pub azimuth_deg: f64,

    /// Target elevation, must lie within the configured mechanical limits.
    ///
    /// Units: degrees
    pub elevation_deg: f64,

    /// Duration of the smoothed elevation move. Zero or less moves the servo in a single jump.
    ///
    /// Units: seconds
    pub duration_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Orientation {
    pub fn new(azimuth_deg: f64, elevation_deg: f64) -> Self {
        Self {
            azimuth_deg,
            elevation_deg,
        }
    }
}
