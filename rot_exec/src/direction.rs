//! # Direction planner
//!
//! Chooses which way the azimuth stepper turns to reach a new setpoint.
//!
//! The distance travelled clockwise from `current` to `target` is `(current - target) mod 360`,
//! so a clockwise move decreases the azimuth reading and an anticlockwise move increases it. The
//! shorter of the two arcs is always taken. At exactly 180 degrees both arcs are equal and
//! clockwise is chosen, every time.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use crate::angle::{normalise_azimuth, FULL_TURN_DEG};
use util::maths::rem_euclid;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Rotation direction of the azimuth axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    /// Clockwise, azimuth decreasing
    Cw,

    /// Counter-clockwise, azimuth increasing
    Ccw,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The result of direction planning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectionDecision {
    pub direction: Direction,

    /// Length of the chosen arc, in [0, 180].
    ///
    /// Units: degrees
    pub distance_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Direction {
    /// Sign of the azimuth change produced by moving in this direction.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Cw => -1.0,
            Direction::Ccw => 1.0,
        }
    }
}

impl DirectionDecision {
    /// The azimuth reached by moving `distance_deg` in `direction` from `start_deg`.
    pub fn apply(&self, start_deg: f64) -> f64 {
        normalise_azimuth(start_deg + self.direction.sign() * self.distance_deg)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Plan the shortest move from `current_deg` to `target_deg`.
///
/// Both inputs are expected in [0, 360) but any finite value is accepted.
pub fn plan_direction(current_deg: f64, target_deg: f64) -> DirectionDecision {
    let cw = rem_euclid(current_deg - target_deg, FULL_TURN_DEG);

    // A result of exactly a full turn from rem_euclid means no motion
    let cw = if cw >= FULL_TURN_DEG { 0.0 } else { cw };
    let ccw = FULL_TURN_DEG - cw;

    if cw <= ccw {
        DirectionDecision {
            direction: Direction::Cw,
            distance_deg: cw,
        }
    }
    else {
        DirectionDecision {
            direction: Direction::Ccw,
            distance_deg: ccw,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Angular difference accounting for wrapping
    fn wrapped_err(a: f64, b: f64) -> f64 {
        let d = rem_euclid(a - b, FULL_TURN_DEG);
        d.min(FULL_TURN_DEG - d)
    }

    #[test]
    fn test_plan_direction_wraps() {
        let d = plan_direction(350.0, 10.0);
        assert_eq!(d.direction, Direction::Ccw);
        assert!((d.distance_deg - 20.0).abs() < 1e-9);

        let d = plan_direction(10.0, 350.0);
        assert_eq!(d.direction, Direction::Cw);
        assert!((d.distance_deg - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_plan_direction_tie_is_cw() {
        for _ in 0..10 {
            assert_eq!(
                plan_direction(10.0, 190.0),
                DirectionDecision {
                    direction: Direction::Cw,
                    distance_deg: 180.0
                }
            );
        }
        assert_eq!(plan_direction(190.0, 10.0).direction, Direction::Cw);
        assert_eq!(plan_direction(0.0, 180.0).distance_deg, 180.0);
    }

    #[test]
    fn test_plan_direction_no_motion() {
        let d = plan_direction(123.4, 123.4);
        assert_eq!(d.distance_deg, 0.0);
        assert_eq!(d.direction, Direction::Cw);
    }

    #[test]
    fn test_plan_direction_simple() {
        assert_eq!(
            plan_direction(0.0, 90.0),
            DirectionDecision {
                direction: Direction::Ccw,
                distance_deg: 90.0
            }
        );
        assert_eq!(
            plan_direction(90.0, 0.0),
            DirectionDecision {
                direction: Direction::Cw,
                distance_deg: 90.0
            }
        );
    }

    #[test]
    fn test_plan_direction_all_pairs() {
        // Sweep a grid of azimuth pairs including non-integer values
        let samples: Vec<f64> = (0..720).map(|i| i as f64 * 0.5 + 0.125).chain(vec![0.0, 359.999]).collect();

        for &a in samples.iter().step_by(7) {
            for &b in samples.iter() {
                let d = plan_direction(a, b);

                assert!(d.distance_deg >= 0.0 && d.distance_deg <= 180.0, "a={} b={} {:?}", a, b, d);
                assert!(wrapped_err(d.apply(a), b) < 1e-6, "a={} b={} {:?}", a, b, d);
            }
        }
    }
}
