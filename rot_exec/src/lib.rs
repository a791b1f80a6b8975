//! # Rotator library.
//!
//! Motion planning and position tracking for a two axis (azimuth/elevation) antenna rotator driven
//! by a stepper motor in azimuth and a servo in elevation. The executable and the benches access
//! the items defined here through this library.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Angle normalisation - azimuth wrapping, elevation limits and servo range mapping
pub mod angle;

/// Direction planner - shortest rotation direction between two azimuths
pub mod direction;

/// Hardware abstraction - stepper and servo driver traits plus the available adapters
pub mod hardware;

/// Orientation and motion request types shared by all modules
pub mod orientation;

/// Position store - persists the believed orientation across restarts
pub mod pos_store;

/// Rotator - lifecycle façade and the concurrent actuator coordinator
pub mod rotator;

/// Trajectory planner - smooth cubic waypoints between two angles
pub mod traj;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use orientation::{MotionRequest, Orientation};
pub use rotator::{Rotator, RotatorError, RotatorParams};
