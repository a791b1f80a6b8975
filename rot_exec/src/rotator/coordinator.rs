//! Actuator coordinator
//!
//! Drives the azimuth stepper and the elevation servo at the same time, one scoped thread per
//! axis, and joins both before returning. The in-memory orientation and the position store sit
//! behind a single mutex: each axis unit takes it once its own motion is done, updates its field
//! and saves the combined orientation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, trace};
use serde::Serialize;
use std::{
    iter,
    sync::{Mutex, MutexGuard, PoisonError},
    thread,
    time::Duration,
};

// Internal
use super::{Axis, RotatorError, RotatorParams};
use crate::{
    angle,
    direction::{plan_direction, Direction, DirectionDecision},
    hardware::{ActuatorError, ServoDriver, StepperDriver},
    orientation::{MotionRequest, Orientation},
    pos_store::PositionStore,
    traj::plan_trajectory,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Executes moves on both axes concurrently while keeping the position record consistent.
#[derive(Debug)]
pub struct ActuatorCoordinator {
    params: RotatorParams,

    tracked: Mutex<Tracked>,
}

/// Summary of a completed move.
///
/// The achieved azimuth is what the issued steps add up to, which differs from the target by up
/// to half a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoveReport {
    pub target_az_deg: f64,
    pub target_el_deg: f64,
    pub direction: Direction,
    pub distance_deg: f64,
    pub num_steps: u64,
    pub achieved_az_deg: f64,
    pub achieved_el_deg: f64,
    pub num_el_writes: usize,
}

/// State guarded by the coordinator's mutex.
#[derive(Debug)]
struct Tracked {
    orientation: Orientation,
    store: PositionStore,
}

/// Servo commands for one move, computed before any hardware is touched.
#[derive(Debug)]
struct ElevationPlan {
    pulse_widths_us: Vec<u32>,
    delay: Duration,
    target_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ActuatorCoordinator {
    /// Create a coordinator starting from an already loaded orientation.
    pub fn new(params: RotatorParams, store: PositionStore, initial: Orientation) -> Self {
        Self {
            params,
            tracked: Mutex::new(Tracked {
                orientation: initial,
                store,
            }),
        }
    }

    /// Snapshot of the believed orientation.
    pub fn orientation(&self) -> Orientation {
        self.lock().orientation
    }

    /// Move both axes to the requested orientation, blocking until both have finished.
    ///
    /// The request is validated and both axes are fully planned before any actuator call, so an
    /// invalid request causes no motion at all.
    pub fn move_to<S, V>(
        &self,
        stepper: &mut S,
        servo: &mut V,
        request: &MotionRequest,
    ) -> Result<MoveReport, RotatorError>
    where
        S: StepperDriver,
        V: ServoDriver,
    {
        // ---- VALIDATION ----

        let target_az = angle::normalise_azimuth(angle::check_azimuth(request.azimuth_deg)?);
        let target_el = angle::check_elevation(request.elevation_deg, self.params.el_limits_deg())?;

        // ---- PLANNING ----

        // One consistent snapshot for both axes
        let start = self.orientation();

        let decision = plan_direction(start.azimuth_deg, target_az);
        let num_steps = step_count(decision.distance_deg, self.params.step_angle_deg);
        let el_plan = self.plan_elevation(start.elevation_deg, target_el, request.duration_s)?;

        debug!(
            "Move {:?} -> ({:.3}, {:.3}): {} steps {:?} ({:.3} deg), {} servo writes",
            start,
            target_az,
            target_el,
            num_steps,
            decision.direction,
            decision.distance_deg,
            el_plan.pulse_widths_us.len()
        );

        // ---- EXECUTION ----

        let (az_result, el_result) = thread::scope(|s| {
            let az_unit = s.spawn(move || {
                self.drive_azimuth(stepper, decision, num_steps, start.azimuth_deg)
            });
            let el_unit = s.spawn(move || self.drive_elevation(servo, &el_plan));

            (
                az_unit
                    .join()
                    .map_err(|_| RotatorError::AxisUnitPanicked(Axis::Azimuth))
                    .and_then(|r| r),
                el_unit
                    .join()
                    .map_err(|_| RotatorError::AxisUnitPanicked(Axis::Elevation))
                    .and_then(|r| r),
            )
        });

        match (az_result, el_result) {
            (Ok(achieved_az), Ok((achieved_el, num_el_writes))) => Ok(MoveReport {
                target_az_deg: target_az,
                target_el_deg: target_el,
                direction: decision.direction,
                distance_deg: decision.distance_deg,
                num_steps,
                achieved_az_deg: achieved_az,
                achieved_el_deg: achieved_el,
                num_el_writes,
            }),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(az_err), Err(el_err)) => {
                error!("Elevation unit failed alongside the azimuth unit: {}", el_err);
                Err(az_err)
            }
        }
    }

    /// Build the servo commands for an elevation move.
    fn plan_elevation(
        &self,
        start_deg: f64,
        target_deg: f64,
        duration_s: f64,
    ) -> Result<ElevationPlan, RotatorError> {
        let traj = plan_trajectory(start_deg, target_deg, duration_s, self.params.num_waypoints);

        // The first waypoint is the current position, so it is never re-sent
        let (angles, delay_s): (Vec<f64>, f64) = if traj.is_stationary() {
            (vec![target_deg], 0.0)
        }
        else {
            (
                traj.waypoints[1..]
                    .iter()
                    .copied()
                    .chain(iter::once(target_deg))
                    .collect(),
                traj.delay_s,
            )
        };

        let pulse_widths_us = angles
            .iter()
            .map(|el| {
                let servo_deg = angle::to_actuator_range(
                    *el,
                    self.params.servo_neutral_deg,
                    self.params.servo_gain,
                );
                angle::actuator_to_pulse_width(
                    servo_deg,
                    self.params.servo_sweep_deg,
                    self.params.servo_pulse_range_us,
                )
            })
            .collect::<Result<Vec<u32>, _>>()?;

        Ok(ElevationPlan {
            pulse_widths_us,
            delay: Duration::from_secs_f64(delay_s),
            target_deg,
        })
    }

    /// Azimuth execution unit.
    ///
    /// Records the steps actually issued, even if the stepper failed part way through.
    fn drive_azimuth<S: StepperDriver>(
        &self,
        stepper: &mut S,
        decision: DirectionDecision,
        num_steps: u64,
        start_deg: f64,
    ) -> Result<f64, RotatorError> {
        let mut steps_done = 0;
        let pulse_result = self
            .pulse_stepper(stepper, decision.direction, num_steps, &mut steps_done)
            .map_err(|e| RotatorError::Actuator(Axis::Azimuth, e));

        let achieved = achieved_azimuth(
            start_deg,
            decision.direction,
            steps_done,
            self.params.step_angle_deg,
        );
        let record_result = self.record(|o| o.azimuth_deg = achieved);

        first_error(pulse_result, record_result)?;

        Ok(achieved)
    }

    fn pulse_stepper<S: StepperDriver>(
        &self,
        stepper: &mut S,
        direction: Direction,
        num_steps: u64,
        steps_done: &mut u64,
    ) -> Result<(), ActuatorError> {
        if num_steps == 0 {
            return Ok(());
        }

        let pulse = Duration::from_millis(self.params.step_pulse_ms);

        stepper.set_direction(direction == Direction::Cw)?;
        thread::sleep(Duration::from_millis(self.params.dir_setup_ms));

        for _ in 0..num_steps {
            stepper.set_step(true)?;
            *steps_done += 1;
            thread::sleep(pulse);

            stepper.set_step(false)?;
            thread::sleep(pulse);
        }

        trace!("Azimuth stepped {} times {:?}", steps_done, direction);

        Ok(())
    }

    /// Elevation execution unit, returns the achieved elevation and the number of servo writes.
    ///
    /// If the servo fails the elevation record is left unchanged.
    fn drive_elevation<V: ServoDriver>(
        &self,
        servo: &mut V,
        plan: &ElevationPlan,
    ) -> Result<(f64, usize), RotatorError> {
        for us in plan.pulse_widths_us.iter() {
            servo
                .set_pulse_width_us(*us)
                .map_err(|e| RotatorError::Actuator(Axis::Elevation, e))?;
            thread::sleep(plan.delay);
        }

        if self.params.servo_release_ms > 0 {
            thread::sleep(Duration::from_millis(self.params.servo_release_ms));
            servo
                .set_pulse_width_us(0)
                .map_err(|e| RotatorError::Actuator(Axis::Elevation, e))?;
        }

        trace!("Elevation reached {:.3} deg", plan.target_deg);

        let target_deg = plan.target_deg;
        self.record(|o| o.elevation_deg = target_deg)?;

        Ok((target_deg, plan.pulse_widths_us.len()))
    }

    /// Update the in-memory orientation and persist the combined result.
    ///
    /// The in-memory value is updated even if the save fails, since the motion has happened.
    fn record<F: FnOnce(&mut Orientation)>(&self, update: F) -> Result<(), RotatorError> {
        let mut tracked = self.lock();
        update(&mut tracked.orientation);
        tracked.store.save(&tracked.orientation)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Tracked> {
        // The guarded data is always left consistent, so a poisoned lock is still usable
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Number of whole steps closest to the given distance.
pub fn step_count(distance_deg: f64, step_angle_deg: f64) -> u64 {
    (distance_deg / step_angle_deg).round() as u64
}

/// Azimuth reached after `num_steps` steps in `direction` from `start_deg`.
pub fn achieved_azimuth(
    start_deg: f64,
    direction: Direction,
    num_steps: u64,
    step_angle_deg: f64,
) -> f64 {
    angle::normalise_azimuth(start_deg + direction.sign() * num_steps as f64 * step_angle_deg)
}

/// Return the first error, logging the second if both failed.
fn first_error(
    first: Result<(), RotatorError>,
    second: Result<(), RotatorError>,
) -> Result<(), RotatorError> {
    match (first, second) {
        (Err(e), Err(e2)) => {
            error!("Additional failure: {}", e2);
            Err(e)
        }
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Ok(()), Ok(())) => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        hardware::{
            sim::{ActuatorCall, SimHardware},
            HardwareContext,
        },
        pos_store::PersistenceError,
    };
    use std::time::Instant;

    fn fast_params() -> RotatorParams {
        RotatorParams {
            step_pulse_ms: 0,
            dir_setup_ms: 0,
            servo_release_ms: 0,
            ..Default::default()
        }
    }

    fn coordinator(
        params: RotatorParams,
        dir: &tempfile::TempDir,
        initial: Orientation,
    ) -> ActuatorCoordinator {
        let store = PositionStore::new(dir.path().join("rotator.json"));
        ActuatorCoordinator::new(params, store, initial)
    }

    fn request(az: f64, el: f64, duration_s: f64) -> MotionRequest {
        MotionRequest {
            azimuth_deg: az,
            elevation_deg: el,
            duration_s,
        }
    }

    #[test]
    fn test_step_count() {
        assert_eq!(step_count(90.0, 1.8), 50);
        assert_eq!(step_count(1.0, 1.8), 1);
        assert_eq!(step_count(0.8, 1.8), 0);
        assert_eq!(step_count(0.9, 1.8), 1);
        assert_eq!(step_count(0.0, 1.8), 0);
        assert_eq!(step_count(180.0, 1.8), 100);
    }

    #[test]
    fn test_achieved_azimuth() {
        assert!((achieved_azimuth(0.0, Direction::Ccw, 50, 1.8) - 90.0).abs() < 1e-9);
        assert!((achieved_azimuth(10.0, Direction::Cw, 11, 1.8) - 350.2).abs() < 1e-9);
        assert_eq!(achieved_azimuth(45.0, Direction::Cw, 0, 1.8), 45.0);
    }

    #[test]
    fn test_move_updates_store() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(fast_params(), &dir, Orientation::default());
        let mut hw = SimHardware::new();
        let (mut stepper, mut servo) = hw.reserve(&Default::default()).unwrap();

        let report = coord
            .move_to(&mut stepper, &mut servo, &request(90.0, 45.0, 0.02))
            .unwrap();

        assert_eq!(report.direction, Direction::Ccw);
        assert_eq!(report.num_steps, 50);
        assert_eq!(report.num_el_writes, 4);
        assert_eq!(hw.num_steps(), 50);

        // Direction set exactly once, before the first step
        let calls = hw.calls();
        let dir_calls: Vec<_> = calls
            .iter()
            .filter(|c| matches!(c, ActuatorCall::Direction { .. }))
            .collect();
        assert_eq!(dir_calls, vec![&ActuatorCall::Direction { cw: false }]);

        // Smoothed servo motion ending on 45 deg (servo 135 deg)
        let widths = hw.pulse_widths();
        assert_eq!(widths.len(), 4);
        assert_eq!(*widths.last().unwrap(), 2000);
        for w in widths.windows(2) {
            assert!(w[1] >= w[0]);
        }

        let stored = PositionStore::new(dir.path().join("rotator.json"))
            .try_load()
            .unwrap()
            .unwrap();
        assert!((stored.azimuth_deg - 90.0).abs() < 1e-9);
        assert_eq!(stored.elevation_deg, 45.0);
        assert_eq!(coord.orientation(), stored);
    }

    #[test]
    fn test_step_rounding_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(fast_params(), &dir, Orientation::default());
        let mut hw = SimHardware::new();
        let (mut stepper, mut servo) = hw.reserve(&Default::default()).unwrap();

        // 1.0 deg rounds up to a single 1.8 deg step
        let report = coord
            .move_to(&mut stepper, &mut servo, &request(1.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(report.num_steps, 1);
        assert!((report.achieved_az_deg - 1.8).abs() < 1e-12);
        assert!((coord.orientation().azimuth_deg - 1.8).abs() < 1e-12);

        // From 1.8, a request for 2.6 deg is 0.8 deg away, which rounds to no steps
        hw.clear_calls();
        let report = coord
            .move_to(&mut stepper, &mut servo, &request(2.6, 0.0, 0.0))
            .unwrap();
        assert_eq!(report.num_steps, 0);
        assert!((report.achieved_az_deg - 1.8).abs() < 1e-12);
        assert_eq!(hw.num_steps(), 0);
        assert!(!hw
            .calls()
            .iter()
            .any(|c| matches!(c, ActuatorCall::Direction { .. })));
    }

    #[test]
    fn test_zero_step_request_records_zero() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(fast_params(), &dir, Orientation::default());
        let mut hw = SimHardware::new();
        let (mut stepper, mut servo) = hw.reserve(&Default::default()).unwrap();

        let report = coord
            .move_to(&mut stepper, &mut servo, &request(0.8, 0.0, 0.0))
            .unwrap();
        assert_eq!(report.num_steps, 0);
        assert_eq!(report.achieved_az_deg, 0.0);
        assert_eq!(report.target_az_deg, 0.8);
    }

    #[test]
    fn test_wrap_clockwise() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(fast_params(), &dir, Orientation::new(10.0, 0.0));
        let mut hw = SimHardware::new();
        let (mut stepper, mut servo) = hw.reserve(&Default::default()).unwrap();

        let report = coord
            .move_to(&mut stepper, &mut servo, &request(350.0, 0.0, 0.0))
            .unwrap();

        assert_eq!(report.direction, Direction::Cw);
        assert_eq!(report.num_steps, 11);
        assert!((report.achieved_az_deg - 350.2).abs() < 1e-9);
        assert_eq!(hw.calls()[0], ActuatorCall::Direction { cw: true });
    }

    #[test]
    fn test_out_of_range_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(fast_params(), &dir, Orientation::default());
        let mut hw = SimHardware::new();
        let (mut stepper, mut servo) = hw.reserve(&Default::default()).unwrap();

        for (az, el) in [(90.0, 95.0), (90.0, -10.5), (std::f64::NAN, 0.0)].iter() {
            match coord.move_to(&mut stepper, &mut servo, &request(*az, *el, 0.1)) {
                Err(RotatorError::OutOfRange(_)) => (),
                r => panic!("Expected OutOfRange, got {:?}", r),
            }
        }

        assert!(hw.calls().is_empty());
        assert!(!dir.path().join("rotator.json").exists());
        assert_eq!(coord.orientation(), Orientation::default());
    }

    #[test]
    fn test_servo_range_checked_before_motion() {
        // Servo neutral at 170 deg leaves only 10 deg of upward travel
        let params = RotatorParams {
            servo_neutral_deg: 170.0,
            ..fast_params()
        };
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(params, &dir, Orientation::default());
        let mut hw = SimHardware::new();
        let (mut stepper, mut servo) = hw.reserve(&Default::default()).unwrap();

        match coord.move_to(&mut stepper, &mut servo, &request(90.0, 45.0, 0.1)) {
            Err(RotatorError::OutOfRange(e)) => assert_eq!(e.quantity, "Servo angle"),
            r => panic!("Expected OutOfRange, got {:?}", r),
        }
        assert!(hw.calls().is_empty());
    }

    #[test]
    fn test_servo_fault_keeps_azimuth() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(fast_params(), &dir, Orientation::default());
        let mut hw = SimHardware::with_servo_fault();
        let (mut stepper, mut servo) = hw.reserve(&Default::default()).unwrap();

        match coord.move_to(&mut stepper, &mut servo, &request(90.0, 45.0, 0.0)) {
            Err(RotatorError::Actuator(Axis::Elevation, _)) => (),
            r => panic!("Expected an elevation actuator error, got {:?}", r),
        }

        // The stepper still moved and that motion is on record
        assert_eq!(hw.num_steps(), 50);
        let o = coord.orientation();
        assert!((o.azimuth_deg - 90.0).abs() < 1e-9);
        assert_eq!(o.elevation_deg, 0.0);
        assert_eq!(
            PositionStore::new(dir.path().join("rotator.json")).load(),
            o
        );
    }

    #[test]
    fn test_save_failure_reported_after_motion() {
        let dir = tempfile::tempdir().unwrap();

        // A directory where the record should be makes every save fail
        let record_path = dir.path().join("rotator.json");
        std::fs::create_dir_all(record_path.join("blocker")).unwrap();
        let coord = ActuatorCoordinator::new(
            fast_params(),
            PositionStore::new(&record_path),
            Orientation::default(),
        );
        let mut hw = SimHardware::new();
        let (mut stepper, mut servo) = hw.reserve(&Default::default()).unwrap();

        match coord.move_to(&mut stepper, &mut servo, &request(9.0, 10.0, 0.0)) {
            Err(RotatorError::Persistence(PersistenceError::Io(_, _))) => (),
            r => panic!("Expected a persistence error, got {:?}", r),
        }

        // Motion happened and the in-memory orientation follows it
        assert_eq!(hw.num_steps(), 5);
        let o = coord.orientation();
        assert!((o.azimuth_deg - 9.0).abs() < 1e-9);
        assert_eq!(o.elevation_deg, 10.0);
    }

    #[test]
    fn test_servo_release() {
        let params = RotatorParams {
            servo_release_ms: 1,
            ..fast_params()
        };
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(params, &dir, Orientation::default());
        let mut hw = SimHardware::new();
        let (mut stepper, mut servo) = hw.reserve(&Default::default()).unwrap();

        let report = coord
            .move_to(&mut stepper, &mut servo, &request(0.0, 0.0, 0.1))
            .unwrap();

        // Stationary elevation sends the target once, then the release
        assert_eq!(report.num_el_writes, 1);
        assert_eq!(hw.pulse_widths(), vec![1500, 0]);
    }

    #[test]
    fn test_consecutive_moves_are_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(fast_params(), &dir, Orientation::default());
        let store = PositionStore::new(dir.path().join("rotator.json"));
        let mut hw = SimHardware::new();
        let (mut stepper, mut servo) = hw.reserve(&Default::default()).unwrap();

        let targets = [(90.0, 45.0), (270.0, -10.0), (359.0, 90.0), (0.0, 0.0), (180.0, 30.0)];
        for (az, el) in targets.iter() {
            let report = coord
                .move_to(&mut stepper, &mut servo, &request(*az, *el, 0.004))
                .unwrap();

            // Both fields belong to the same move
            let stored = store.try_load().unwrap().unwrap();
            assert_eq!(stored.azimuth_deg, report.achieved_az_deg);
            assert_eq!(stored.elevation_deg, report.achieved_el_deg);
            assert_eq!(stored.elevation_deg, *el);
            assert!((stored.azimuth_deg - az).abs() <= 0.9 + 1e-9);
        }
    }

    #[test]
    fn test_axes_move_concurrently() {
        // Each axis takes about 200 ms on its own, run in series they would take 400 ms
        let params = RotatorParams {
            step_pulse_ms: 4,
            ..fast_params()
        };
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(params, &dir, Orientation::default());
        let mut hw = SimHardware::new();
        let (mut stepper, mut servo) = hw.reserve(&Default::default()).unwrap();

        let start = Instant::now();
        coord
            .move_to(&mut stepper, &mut servo, &request(45.0, 30.0, 0.2))
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(hw.num_steps(), 25);
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(400), "{:?}", elapsed);
    }
}
