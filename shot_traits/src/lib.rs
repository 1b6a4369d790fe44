pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Instantaneous power reading from the current/power sensor.
pub trait PowerSensor {
    /// Read the present power draw in milliwatts.
    fn read_power_mw(&mut self) -> Result<f32, Box<dyn std::error::Error + Send + Sync>>;
}

/// Binary actuator (motor driver) that fires the mechanism while enabled.
pub trait Actuator {
    fn set_enabled(&mut self, enabled: bool)
    -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: PowerSensor + ?Sized> PowerSensor for Box<T> {
    fn read_power_mw(&mut self) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_power_mw()
    }
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn set_enabled(
        &mut self,
        enabled: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_enabled(enabled)
    }
}
