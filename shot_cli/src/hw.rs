//! Hardware assembly: real INA219 + GPIO with the `hardware` feature on
//! Linux, otherwise the simulated pair.

use shot_traits::{Actuator, PowerSensor};

pub type Sensor = Box<dyn PowerSensor>;
pub type Motor = Box<dyn Actuator>;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn make_hw(cfg: &shot_config::Config) -> eyre::Result<(Sensor, Motor)> {
    use eyre::WrapErr;
    use shot_hardware::gpio::GpioActuator;
    use shot_hardware::ina219::Ina219;

    let sensor = Ina219::open(cfg.sensor.i2c_bus, cfg.sensor.address)
        .wrap_err_with(|| format!("open INA219 at {:#04x}", cfg.sensor.address))?;
    let motor = GpioActuator::new(
        cfg.actuator.pin,
        cfg.actuator.led_pin,
        cfg.actuator.active_low,
    )
    .wrap_err("open actuator pins")?;
    tracing::info!(
        bus = cfg.sensor.i2c_bus,
        address = cfg.sensor.address,
        pin = cfg.actuator.pin,
        "hardware backend"
    );
    Ok((Box::new(sensor), Box::new(motor)))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn make_hw(_cfg: &shot_config::Config) -> eyre::Result<(Sensor, Motor)> {
    use shot_hardware::{LoadProfile, simulated_pair};

    // Test hook: a sensor that never answers, to exercise the fatal probe path.
    if std::env::var_os("SHOT_TEST_SIM_DEAD_SENSOR").is_some() {
        let (_, motor) = simulated_pair(LoadProfile::default());
        return Ok((Box::new(DeadSensor), Box::new(motor)));
    }
    let (sensor, motor) = simulated_pair(LoadProfile::default());
    tracing::info!("simulated backend");
    Ok((Box::new(sensor), Box::new(motor)))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
struct DeadSensor;

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
impl PowerSensor for DeadSensor {
    fn read_power_mw(&mut self) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(shot_hardware::error::HwError::SensorNotFound(0x40)))
    }
}
