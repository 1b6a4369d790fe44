//! INA219 high-side current/power monitor over I2C.
//!
//! Configured for the 32 V / 2 A range: 0.1 mA current LSB, 2 mW power LSB.
use rppal::i2c::I2c;
use tracing::{debug, trace};

use crate::error::{HwError, Result};

const REG_CONFIG: u8 = 0x00;
const REG_POWER: u8 = 0x03;
const REG_CALIBRATION: u8 = 0x05;

/// 32 V bus range, /8 gain (320 mV), 12-bit bus and shunt ADC, continuous.
const CONFIG_32V_2A: u16 = 0x399F;
const CALIBRATION_32V_2A: u16 = 4096;
const POWER_LSB_MW: f32 = 2.0;

pub struct Ina219 {
    i2c: I2c,
    address: u16,
}

impl Ina219 {
    /// Open the bus, configure the chip and verify it answers.
    pub fn open(bus: u8, address: u16) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus).map_err(|e| HwError::I2c(e.to_string()))?;
        i2c.set_slave_address(address)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        let mut dev = Self { i2c, address };
        dev.probe()?;
        Ok(dev)
    }

    /// Write the range configuration and read it back.
    pub fn probe(&mut self) -> Result<()> {
        self.write_register(REG_CONFIG, CONFIG_32V_2A)
            .map_err(|_| HwError::SensorNotFound(self.address))?;
        let readback = self
            .read_register(REG_CONFIG)
            .map_err(|_| HwError::SensorNotFound(self.address))?;
        if readback != CONFIG_32V_2A {
            debug!(readback, "unexpected INA219 config readback");
            return Err(HwError::SensorNotFound(self.address));
        }
        self.write_register(REG_CALIBRATION, CALIBRATION_32V_2A)
    }

    /// Present power draw in milliwatts.
    pub fn power_mw(&mut self) -> Result<f32> {
        // The calibration register is lost on a brown-out reset; rewrite it.
        self.write_register(REG_CALIBRATION, CALIBRATION_32V_2A)?;
        let raw = self.read_register(REG_POWER)?;
        trace!(raw, "ina219 power register");
        Ok(f32::from(raw) * POWER_LSB_MW)
    }

    fn write_register(&mut self, reg: u8, value: u16) -> Result<()> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c
            .write(&[reg, hi, lo])
            .map_err(|e| HwError::I2c(e.to_string()))?;
        Ok(())
    }

    fn read_register(&mut self, reg: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(&[reg], &mut buf)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        Ok(u16::from_be_bytes(buf))
    }
}

impl shot_traits::PowerSensor for Ina219 {
    fn read_power_mw(&mut self) -> std::result::Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.power_mw()?)
    }
}
