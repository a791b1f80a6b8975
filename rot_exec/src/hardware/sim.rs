//! Simulated hardware
//!
//! Every driver call is logged at trace level and appended to a shared call record, so that the
//! executable can run on a development host and tests can check exactly what was sent to the
//! actuators.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

use super::{ActuatorError, HardwareContext, HardwareError, PinParams, ServoDriver, StepperDriver};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Simulated hardware context.
#[derive(Debug, Default, Clone)]
pub struct SimHardware {
    calls: Arc<Mutex<Vec<ActuatorCall>>>,

    reserved: Arc<AtomicBool>,

    unavailable: bool,

    servo_fault: bool,
}

/// Simulated stepper driver.
#[derive(Debug)]
pub struct SimStepper {
    calls: Arc<Mutex<Vec<ActuatorCall>>>,
    _reservation: Arc<Reservation>,
}

/// Simulated servo driver.
#[derive(Debug)]
pub struct SimServo {
    calls: Arc<Mutex<Vec<ActuatorCall>>>,
    fault: bool,
    _reservation: Arc<Reservation>,
}

/// Shared between the two drivers, frees the hardware once both are dropped.
#[derive(Debug)]
struct Reservation(Arc<AtomicBool>);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A single recorded driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Direction { cw: bool },
    Step { active: bool },
    PulseWidth { us: u32 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hardware which refuses every reservation, as if the GPIO daemon were not running.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    /// Hardware whose servo driver fails on every write.
    pub fn with_servo_fault() -> Self {
        Self {
            servo_fault: true,
            ..Default::default()
        }
    }

    /// Copy of every call made so far, in order.
    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of rising edges sent on the step line.
    pub fn num_steps(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == ActuatorCall::Step { active: true })
            .count()
    }

    /// Pulse widths sent to the servo, in order.
    pub fn pulse_widths(&self) -> Vec<u32> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::PulseWidth { us } => Some(*us),
                _ => None,
            })
            .collect()
    }

    /// Forget all recorded calls.
    pub fn clear_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear()
    }

    /// Returns true while drivers handed out by this context are alive.
    pub fn is_reserved(&self) -> bool {
        self.reserved.load(Ordering::SeqCst)
    }
}

impl HardwareContext for SimHardware {
    type Stepper = SimStepper;
    type Servo = SimServo;

    fn reserve(&mut self, pins: &PinParams) -> Result<(SimStepper, SimServo), HardwareError> {
        if self.unavailable {
            return Err(HardwareError::Unavailable(
                "simulated hardware marked unavailable".into(),
            ));
        }

        if self.reserved.swap(true, Ordering::SeqCst) {
            return Err(HardwareError::AlreadyReserved);
        }

        trace!("Sim hardware reserved on {:?}", pins);

        let reservation = Arc::new(Reservation(self.reserved.clone()));

        Ok((
            SimStepper {
                calls: self.calls.clone(),
                _reservation: reservation.clone(),
            },
            SimServo {
                calls: self.calls.clone(),
                fault: self.servo_fault,
                _reservation: reservation,
            },
        ))
    }
}

impl StepperDriver for SimStepper {
    fn set_direction(&mut self, cw: bool) -> Result<(), ActuatorError> {
        trace!("Sim DIR <- {}", if cw { "CW" } else { "CCW" });
        record(&self.calls, ActuatorCall::Direction { cw });
        Ok(())
    }

    fn set_step(&mut self, active: bool) -> Result<(), ActuatorError> {
        record(&self.calls, ActuatorCall::Step { active });
        Ok(())
    }
}

impl ServoDriver for SimServo {
    fn set_pulse_width_us(&mut self, pulse_width_us: u32) -> Result<(), ActuatorError> {
        if self.fault {
            return Err(ActuatorError::SimFault("servo"));
        }

        trace!("Sim SERVO <- {} us", pulse_width_us);
        record(&self.calls, ActuatorCall::PulseWidth { us: pulse_width_us });
        Ok(())
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn record(calls: &Mutex<Vec<ActuatorCall>>, call: ActuatorCall) {
    calls
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(call);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_reservation() {
        let mut hw = SimHardware::new();
        let pins = PinParams::default();

        let (stepper, servo) = hw.reserve(&pins).unwrap();
        assert!(hw.is_reserved());

        match hw.reserve(&pins) {
            Err(HardwareError::AlreadyReserved) => (),
            r => panic!("Expected AlreadyReserved, got {:?}", r.map(|_| ())),
        }

        // Both drivers must go before the hardware is free again
        drop(stepper);
        assert!(hw.is_reserved());
        drop(servo);
        assert!(!hw.is_reserved());

        assert!(hw.reserve(&pins).is_ok());
    }

    #[test]
    fn test_unavailable() {
        let mut hw = SimHardware::unavailable();
        assert!(matches!(
            hw.reserve(&PinParams::default()),
            Err(HardwareError::Unavailable(_))
        ));
        assert!(!hw.is_reserved());
    }

    #[test]
    fn test_recording() {
        let mut hw = SimHardware::new();
        let (mut stepper, mut servo) = hw.reserve(&PinParams::default()).unwrap();

        stepper.set_direction(false).unwrap();
        stepper.set_step(true).unwrap();
        stepper.set_step(false).unwrap();
        servo.set_pulse_width_us(1500).unwrap();

        assert_eq!(
            hw.calls(),
            vec![
                ActuatorCall::Direction { cw: false },
                ActuatorCall::Step { active: true },
                ActuatorCall::Step { active: false },
                ActuatorCall::PulseWidth { us: 1500 },
            ]
        );
        assert_eq!(hw.num_steps(), 1);
        assert_eq!(hw.pulse_widths(), vec![1500]);

        hw.clear_calls();
        assert!(hw.calls().is_empty());
    }
}
