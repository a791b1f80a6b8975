//! # Trajectory planner
//!
//! Generates smooth waypoints between two angles using a cubic with zero velocity at both ends:
//!
//! ```text
//! s(t) = c0*t^3 + c1*t^2 + c2*t + c3
//!
//! s(0) = p0, s(dt) = pf, s'(0) = 0, s'(dt) = 0
//!
//! c3 = p0, c2 = 0, c1 = 3/dt^2 * (pf - p0), c0 = 2/dt^3 * (p0 - pf)
//! ```
//!
//! The cubic is sampled at `t_i = dt/n * i` for `i = 1 .. n-1`, which together with `p0` gives `n`
//! waypoints. The final target `pf` is not part of the waypoints, the caller finishes the move on
//! it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use util::maths::poly_val;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Smallest number of waypoints a trajectory can have.
pub const MIN_NUM_WAYPOINTS: usize = 2;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A planned trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Waypoints in order, the first one is always the start angle.
    ///
    /// Units: degrees
    pub waypoints: Vec<f64>,

    /// Delay between consecutive waypoint writes.
    ///
    /// Units: seconds
    pub delay_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Trajectory {
    /// Returns true if the trajectory holds every waypoint at the start angle.
    pub fn is_stationary(&self) -> bool {
        match self.waypoints.first() {
            Some(p0) => self.waypoints.iter().all(|p| p == p0),
            None => true,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Plan a smooth trajectory from `p0_deg` to `pf_deg` lasting `duration_s`.
///
/// Never fails: fewer than two points is treated as two, and a duration which is not a positive
/// finite number gives a stationary trajectory with no delay, so that the caller's final write
/// to `pf_deg` happens as a single jump.
pub fn plan_trajectory(p0_deg: f64, pf_deg: f64, duration_s: f64, num_points: usize) -> Trajectory {
    let n = num_points.max(MIN_NUM_WAYPOINTS);

    if !(duration_s.is_finite() && duration_s > 0.0) {
        return Trajectory {
            waypoints: vec![p0_deg; n],
            delay_s: 0.0,
        };
    }

    let delay_s = duration_s / n as f64;

    if p0_deg == pf_deg {
        return Trajectory {
            waypoints: vec![p0_deg; n],
            delay_s,
        };
    }

    let dt = duration_s;
    let coeffs = [
        2.0 / dt.powi(3) * (p0_deg - pf_deg),
        3.0 / dt.powi(2) * (pf_deg - p0_deg),
        0.0,
        p0_deg,
    ];

    let waypoints = std::iter::once(p0_deg)
        .chain((1..n).map(|i| poly_val(delay_s * i as f64, &coeffs)))
        .collect();

    Trajectory { waypoints, delay_s }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stationary() {
        let traj = plan_trajectory(0.0, 0.0, 0.25, 4);
        assert_eq!(traj.waypoints, vec![0.0; 4]);
        assert!(traj.is_stationary());
        assert_eq!(traj.delay_s, 0.0625);
    }

    #[test]
    fn test_rising() {
        let traj = plan_trajectory(0.0, 90.0, 0.25, 4);

        assert_eq!(traj.waypoints.len(), 4);
        assert_eq!(traj.waypoints[0], 0.0);
        assert_eq!(traj.delay_s, 0.0625);
        assert!(!traj.is_stationary());

        for w in traj.waypoints.windows(2) {
            assert!(w[1] >= w[0], "{:?}", traj.waypoints);
        }
        for p in traj.waypoints.iter() {
            assert!(*p >= 0.0 && *p <= 90.0);
        }

        // 90 * (3u^2 - 2u^3) at u = 1/4, 1/2, 3/4
        let expected = [0.0, 14.0625, 45.0, 75.9375];
        for (p, e) in traj.waypoints.iter().zip(expected.iter()) {
            assert!((p - e).abs() < 1e-9, "{} != {}", p, e);
        }
    }

    #[test]
    fn test_falling() {
        let traj = plan_trajectory(60.0, -10.0, 1.0, 10);

        assert_eq!(traj.waypoints.len(), 10);
        assert_eq!(traj.waypoints[0], 60.0);
        for w in traj.waypoints.windows(2) {
            assert!(w[1] <= w[0]);
        }
        for p in traj.waypoints.iter() {
            assert!(*p <= 60.0 && *p >= -10.0);
        }

        // Midpoint of the cubic is the midpoint of the move
        assert!((traj.waypoints[5] - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_endpoint_matches() {
        // Sampling the cubic at t = dt gives the target exactly
        let (p0, pf, dt): (f64, f64, f64) = (-10.0, 90.0, 0.4);
        let coeffs = [
            2.0 / dt * (p0 - pf) / (dt * dt),
            3.0 / (dt * dt) * (pf - p0),
            0.0,
            p0,
        ];
        assert!((poly_val(dt, &coeffs) - pf).abs() < 1e-9);
        assert_eq!(poly_val(0.0, &coeffs), p0);
    }

    #[test]
    fn test_degenerate_inputs() {
        // Too few points
        let traj = plan_trajectory(0.0, 30.0, 1.0, 0);
        assert_eq!(traj.waypoints.len(), MIN_NUM_WAYPOINTS);
        assert_eq!(traj.waypoints[0], 0.0);
        assert!((traj.waypoints[1] - 15.0).abs() < 1e-9);

        // Zero, negative and non-finite durations
        for dt in [0.0, -1.0, std::f64::NAN, std::f64::INFINITY].iter() {
            let traj = plan_trajectory(0.0, 30.0, *dt, 4);
            assert_eq!(traj.waypoints, vec![0.0; 4]);
            assert_eq!(traj.delay_s, 0.0);
        }
    }
}
