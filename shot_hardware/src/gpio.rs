//! GPIO motor driver output with an optional indicator LED.
use rppal::gpio::{Gpio, OutputPin};

use crate::error::{HwError, Result};

pub struct GpioActuator {
    motor: OutputPin,
    led: Option<OutputPin>,
    active_low: bool,
}

impl GpioActuator {
    pub fn new(pin: u8, led_pin: Option<u8>, active_low: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let motor = gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_output();
        let led = match led_pin {
            Some(p) => Some(
                gpio.get(p)
                    .map_err(|e| HwError::Gpio(e.to_string()))?
                    .into_output(),
            ),
            None => None,
        };
        let mut act = Self {
            motor,
            led,
            active_low,
        };
        act.drive(false);
        Ok(act)
    }

    fn drive(&mut self, enabled: bool) {
        if enabled != self.active_low {
            self.motor.set_high();
        } else {
            self.motor.set_low();
        }
        if let Some(led) = self.led.as_mut() {
            if enabled {
                led.set_high();
            } else {
                led.set_low();
            }
        }
    }
}

impl shot_traits::Actuator for GpioActuator {
    fn set_enabled(
        &mut self,
        enabled: bool,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.drive(enabled);
        tracing::debug!(enabled, "actuator (gpio)");
        Ok(())
    }
}

impl Drop for GpioActuator {
    fn drop(&mut self) {
        self.drive(false);
    }
}
