use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("i2c error: {0}")]
    I2c(String),
    #[error("power sensor not found at i2c address {0:#04x}")]
    SensorNotFound(u16),
}

pub type Result<T> = std::result::Result<T, HwError>;
