//! Hardware implementation for the Raspberry Pi GPIO header, using `rppal`.
//!
//! The stepper driver board takes plain logic levels on its step and direction lines. The servo
//! is driven with software PWM at 50 Hz.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use rppal::gpio::{Gpio, OutputPin};
use std::time::Duration;

use super::{ActuatorError, HardwareContext, HardwareError, PinParams, ServoDriver, StepperDriver};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Servo control frame period (50 Hz)
const SERVO_PERIOD: Duration = Duration::from_millis(20);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Raspberry Pi hardware context.
///
/// The GPIO peripheral is only opened when the rotator is attached.
#[derive(Debug, Default)]
pub struct RpiHardware;

/// Stepper driver on two GPIO output pins.
#[derive(Debug)]
pub struct RpiStepper {
    step: OutputPin,
    dir: OutputPin,
    cw_level_high: bool,
}

/// Servo on one GPIO output pin.
#[derive(Debug)]
pub struct RpiServo {
    pin: OutputPin,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RpiHardware {
    pub fn new() -> Self {
        Self
    }
}

impl HardwareContext for RpiHardware {
    type Stepper = RpiStepper;
    type Servo = RpiServo;

    fn reserve(&mut self, pins: &PinParams) -> Result<(RpiStepper, RpiServo), HardwareError> {
        let gpio = Gpio::new().map_err(unavailable)?;

        let mut step = gpio.get(pins.step_pin).map_err(unavailable)?.into_output();
        let dir = gpio.get(pins.dir_pin).map_err(unavailable)?.into_output();
        let servo = gpio.get(pins.servo_pin).map_err(unavailable)?.into_output();

        step.set_low();

        debug!(
            "GPIO reserved: step {}, dir {}, servo {}",
            pins.step_pin, pins.dir_pin, pins.servo_pin
        );

        Ok((
            RpiStepper {
                step,
                dir,
                cw_level_high: pins.cw_level_high,
            },
            RpiServo { pin: servo },
        ))
    }
}

impl StepperDriver for RpiStepper {
    fn set_direction(&mut self, cw: bool) -> Result<(), ActuatorError> {
        if cw == self.cw_level_high {
            self.dir.set_high();
        }
        else {
            self.dir.set_low();
        }
        Ok(())
    }

    fn set_step(&mut self, active: bool) -> Result<(), ActuatorError> {
        if active {
            self.step.set_high();
        }
        else {
            self.step.set_low();
        }
        Ok(())
    }
}

impl ServoDriver for RpiServo {
    fn set_pulse_width_us(&mut self, pulse_width_us: u32) -> Result<(), ActuatorError> {
        let result = if pulse_width_us == 0 {
            self.pin.clear_pwm()
        }
        else {
            self.pin.set_pwm(
                SERVO_PERIOD,
                Duration::from_micros(pulse_width_us as u64),
            )
        };

        result.map_err(|e| ActuatorError::Gpio(e.to_string()))
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn unavailable(e: rppal::gpio::Error) -> HardwareError {
    HardwareError::Unavailable(e.to_string())
}
