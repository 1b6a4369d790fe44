#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the shot sequencing controller.
//!
//! Every section is optional; a missing section takes the defaults of the
//! deployed device (20 Hz second-order filter at 2 ms, 100 ms settle delays,
//! 1500 ms phase timeout, 1.5x trigger ratio). `Config::validate` rejects
//! values the control loop cannot run with.
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Actuator {
    /// GPIO (BCM numbering) driving the motor.
    pub pin: u8,
    /// Optional indicator LED mirroring the motor output.
    pub led_pin: Option<u8>,
    /// Drive the motor pin low to enable.
    pub active_low: bool,
}

impl Default for Actuator {
    fn default() -> Self {
        Self {
            pin: 25,
            led_pin: None,
            active_low: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Sensor {
    /// I2C bus index of the INA219.
    pub i2c_bus: u8,
    /// 7-bit I2C address of the INA219.
    pub address: u16,
    /// Number of probe attempts at bring-up before giving up.
    pub probe_attempts: u32,
}

impl Default for Sensor {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            address: 0x40,
            probe_attempts: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterCfg {
    /// Low-pass cutoff frequency in Hz.
    pub cutoff_hz: f64,
    /// Sampling interval the filter is designed for, in milliseconds.
    pub sample_interval_ms: f64,
    /// Filter order: 0 (passthrough), 1 or 2.
    pub order: u8,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            cutoff_hz: 20.0,
            sample_interval_ms: 2.0,
            order: 2,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Timing {
    /// Idle sleep at the end of each control loop iteration.
    pub tick_ms: u64,
    /// Settle delay after enabling the actuator, before sampling starts.
    pub pre_shot_settle_ms: u64,
    /// Settle delay after the release edge, before the actuator is disabled.
    pub post_shot_settle_ms: u64,
    /// Safety fallback for both detection phases.
    pub phase_timeout_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick_ms: 2,
            pre_shot_settle_ms: 100,
            post_shot_settle_ms: 100,
            phase_timeout_ms: 1500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Detector {
    /// Multiplier applied to the running average for both edges.
    pub trigger_ratio: f64,
}

impl Default for Detector {
    fn default() -> Self {
        Self { trigger_ratio: 1.5 }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Shots {
    /// Shot count at power-up; -1 means unlimited.
    pub initial_count: i64,
    /// Inter-shot delay at power-up, in milliseconds.
    pub initial_delay_ms: f64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Protocol {
    /// Match commands by substring, in the order the first firmware did.
    pub legacy_substring_matching: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Server {
    /// Listen address for the line-oriented control plane.
    pub bind: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub actuator: Actuator,
    pub sensor: Sensor,
    pub filter: FilterCfg,
    pub timing: Timing,
    pub detector: Detector,
    pub shots: Shots,
    pub protocol: Protocol,
    pub server: Server,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()
        .map_err(|e| eyre::eyre!("invalid config {}: {}", path.display(), e))?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Filter
        if !(self.filter.sample_interval_ms.is_finite() && self.filter.sample_interval_ms > 0.0) {
            eyre::bail!("filter.sample_interval_ms must be > 0");
        }
        if self.filter.order > 2 {
            eyre::bail!("filter.order must be 0, 1 or 2");
        }
        if self.filter.order > 0 {
            let nyquist_hz = 1000.0 / (2.0 * self.filter.sample_interval_ms);
            if !(self.filter.cutoff_hz.is_finite() && self.filter.cutoff_hz > 0.0) {
                eyre::bail!("filter.cutoff_hz must be > 0");
            }
            if self.filter.cutoff_hz >= nyquist_hz {
                eyre::bail!(
                    "filter.cutoff_hz must be below the Nyquist frequency ({nyquist_hz} Hz)"
                );
            }
        }

        // Timing
        if self.timing.tick_ms == 0 {
            eyre::bail!("timing.tick_ms must be >= 1");
        }
        if self.timing.phase_timeout_ms == 0 {
            eyre::bail!("timing.phase_timeout_ms must be >= 1");
        }
        if self.timing.pre_shot_settle_ms > 60_000 || self.timing.post_shot_settle_ms > 60_000 {
            eyre::bail!("timing settle delays are unreasonably large (>60s)");
        }

        // Detector
        if !(self.detector.trigger_ratio.is_finite() && self.detector.trigger_ratio > 0.0) {
            eyre::bail!("detector.trigger_ratio must be > 0");
        }

        // Shots
        if self.shots.initial_count < -1 {
            eyre::bail!("shots.initial_count must be >= -1");
        }
        if self.shots.initial_count > i64::from(u32::MAX) {
            eyre::bail!("shots.initial_count must be <= {}", u32::MAX);
        }
        if !(self.shots.initial_delay_ms.is_finite() && self.shots.initial_delay_ms >= 0.0) {
            eyre::bail!("shots.initial_delay_ms must be >= 0");
        }

        // Sensor
        if self.sensor.address > 0x7f {
            eyre::bail!("sensor.address must be a 7-bit I2C address");
        }
        if self.sensor.probe_attempts == 0 {
            eyre::bail!("sensor.probe_attempts must be >= 1");
        }

        // Server
        if self.server.bind.parse::<SocketAddr>().is_err() {
            eyre::bail!("server.bind must be a socket address, got {:?}", self.server.bind);
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}
