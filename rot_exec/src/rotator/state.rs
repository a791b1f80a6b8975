//! Rotator façade and lifecycle state machine

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};

// Internal
use super::{
    ActuatorCoordinator, MoveReport, RotatorError, RotatorParams, CALIB_AZ_DEG, CALIB_EL_DEG,
};
use crate::{
    angle,
    hardware::{HardwareContext, HardwareError},
    orientation::{MotionRequest, Orientation},
    pos_store::PositionStore,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The rotator.
///
/// Starts detached. Attaching reserves the actuators and loads the position record, after which
/// moves can be made. Detaching zeroes the rotator and releases the actuators.
pub struct Rotator<H: HardwareContext> {
    params: RotatorParams,

    attached: Option<Attached<H>>,
}

/// Resources held while attached.
struct Attached<H: HardwareContext> {
    stepper: H::Stepper,
    servo: H::Servo,
    coordinator: ActuatorCoordinator,
}

/// A calibration checkpoint, passed to the operator before it is visited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationStep {
    /// Zero based position of this checkpoint in the sequence
    pub index: usize,

    /// Number of checkpoints in the sequence
    pub total: usize,

    pub target: Orientation,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Lifecycle state of the rotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotatorState {
    Detached,
    Attached,
}

/// How a calibration run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationOutcome {
    Completed,

    /// The operator refused a checkpoint, the rotator was zeroed instead.
    Aborted,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<H: HardwareContext> Rotator<H> {
    /// Create a new detached rotator.
    pub fn new(params: RotatorParams) -> Result<Self, RotatorError> {
        params.validate().map_err(RotatorError::InvalidParams)?;

        Ok(Self {
            params,
            attached: None,
        })
    }

    pub fn params(&self) -> &RotatorParams {
        &self.params
    }

    pub fn state(&self) -> RotatorState {
        match self.attached {
            Some(_) => RotatorState::Attached,
            None => RotatorState::Detached,
        }
    }

    /// Believed orientation, or `None` while detached.
    pub fn orientation(&self) -> Option<Orientation> {
        self.attached.as_ref().map(|a| a.coordinator.orientation())
    }

    /// Reserve the actuators from `hw` and load the position record.
    ///
    /// Returns the orientation the rotator believes it is at.
    pub fn attach(&mut self, hw: &mut H) -> Result<Orientation, RotatorError> {
        if self.attached.is_some() {
            return Err(RotatorError::Attachment(HardwareError::AlreadyReserved));
        }

        let (stepper, servo) = hw
            .reserve(&self.params.pins)
            .map_err(RotatorError::Attachment)?;

        let store = PositionStore::new(&self.params.state_file_path);
        let initial = sanitise(store.load(), &self.params);

        info!("Rotator attached at {:?}", initial);

        self.attached = Some(Attached {
            stepper,
            servo,
            coordinator: ActuatorCoordinator::new(self.params.clone(), store, initial),
        });

        Ok(initial)
    }

    /// Move to the given orientation using the default elevation move duration.
    pub fn move_to(&mut self, az_deg: f64, el_deg: f64) -> Result<MoveReport, RotatorError> {
        let request = MotionRequest {
            azimuth_deg: az_deg,
            elevation_deg: el_deg,
            duration_s: self.params.el_move_duration_s,
        };
        self.move_request(&request)
    }

    /// Execute a motion request, blocking until both axes have finished.
    pub fn move_request(&mut self, request: &MotionRequest) -> Result<MoveReport, RotatorError> {
        let attached = self.attached.as_mut().ok_or(RotatorError::NotAttached)?;

        attached
            .coordinator
            .move_to(&mut attached.stepper, &mut attached.servo, request)
    }

    /// Move to (0, 0).
    pub fn zero(&mut self) -> Result<MoveReport, RotatorError> {
        self.move_to(0.0, 0.0)
    }

    /// Run the calibration sequence.
    ///
    /// `confirm` is called before each checkpoint is visited. Returning false aborts the
    /// sequence and zeroes the rotator.
    pub fn calibrate<F>(&mut self, mut confirm: F) -> Result<CalibrationOutcome, RotatorError>
    where
        F: FnMut(&CalibrationStep) -> bool,
    {
        if self.attached.is_none() {
            return Err(RotatorError::NotAttached);
        }

        let sequence = calibration_sequence(&self.params);
        let total = sequence.len();

        for (index, target) in sequence.into_iter().enumerate() {
            let step = CalibrationStep {
                index,
                total,
                target,
            };

            if !confirm(&step) {
                warn!("Calibration aborted before checkpoint {}/{}", index + 1, total);
                self.zero()?;
                return Ok(CalibrationOutcome::Aborted);
            }

            info!("Calibration checkpoint {}/{}: {:?}", index + 1, total, target);
            self.move_to(target.azimuth_deg, target.elevation_deg)?;
        }

        info!("Calibration complete");

        Ok(CalibrationOutcome::Completed)
    }

    /// Zero the rotator and release the actuators.
    ///
    /// The actuators are released even if zeroing fails, in which case the error is returned
    /// after the rotator has become detached.
    pub fn detach(&mut self) -> Result<(), RotatorError> {
        if self.attached.is_none() {
            return Err(RotatorError::NotAttached);
        }

        let zero_result = self.zero();

        // Dropping the drivers releases them
        self.attached = None;

        info!("Rotator detached");

        zero_result.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// The checkpoints visited by calibration, in order.
///
/// Zero, the azimuth checkpoints, zero, the elevation checkpoints, zero. Elevation checkpoints
/// outside the configured limits are skipped.
pub fn calibration_sequence(params: &RotatorParams) -> Vec<Orientation> {
    let mut seq = vec![Orientation::default()];

    seq.extend(CALIB_AZ_DEG.iter().map(|az| Orientation::new(*az, 0.0)));
    seq.push(Orientation::default());

    for el in CALIB_EL_DEG.iter() {
        match angle::check_elevation(*el, params.el_limits_deg()) {
            Ok(el) => seq.push(Orientation::new(0.0, el)),
            Err(e) => warn!("Skipping calibration checkpoint: {}", e),
        }
    }
    seq.push(Orientation::default());

    seq
}

/// Make a loaded orientation consistent with the current parameters.
fn sanitise(loaded: Orientation, params: &RotatorParams) -> Orientation {
    match angle::check_elevation(loaded.elevation_deg, params.el_limits_deg()) {
        Ok(el) => Orientation::new(angle::normalise_azimuth(loaded.azimuth_deg), el),
        Err(e) => {
            warn!(
                "Stored orientation is not reachable ({}), falling back to the zero orientation",
                e
            );
            Orientation::default()
        }
    }
}
