//! Runtime configuration for the controller.
//!
//! These are the structs `ShotController` runs with. They are separate from
//! the TOML schema in `shot_config`; see `conversions` for the mapping.

use std::time::Duration;

/// Low-pass filter order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOrder {
    /// No smoothing; samples pass through unchanged.
    Passthrough,
    First,
    Second,
}

/// Signal conditioning parameters.
#[derive(Debug, Clone)]
pub struct FilterCfg {
    /// Cutoff frequency in Hz.
    pub cutoff_hz: f64,
    /// Sampling interval the coefficients are designed for, in ms.
    pub sample_interval_ms: f64,
    pub order: FilterOrder,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            cutoff_hz: 20.0,
            sample_interval_ms: 2.0,
            order: FilterOrder::Second,
        }
    }
}

impl FilterCfg {
    /// Passthrough filter; useful for driving the detector with exact samples.
    pub fn passthrough() -> Self {
        Self {
            order: FilterOrder::Passthrough,
            ..Self::default()
        }
    }
}

/// Loop pacing and fixed delays.
#[derive(Debug, Clone)]
pub struct TimingCfg {
    /// Idle sleep after every tick.
    pub tick: Duration,
    /// Settle delay between enabling the actuator and sampling.
    pub pre_shot_settle: Duration,
    /// Settle delay between the release edge and disabling the actuator.
    pub post_shot_settle: Duration,
    /// Safety fallback for the Actuating and Releasing phases.
    pub phase_timeout: Duration,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(2),
            pre_shot_settle: Duration::from_millis(100),
            post_shot_settle: Duration::from_millis(100),
            phase_timeout: Duration::from_millis(1500),
        }
    }
}

/// Edge detection parameters.
#[derive(Debug, Clone)]
pub struct DetectorCfg {
    /// Multiplier applied to the running average for both edges.
    pub trigger_ratio: f64,
}

impl Default for DetectorCfg {
    fn default() -> Self {
        Self { trigger_ratio: 1.5 }
    }
}
