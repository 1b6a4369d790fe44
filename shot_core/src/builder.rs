//! Builder for `ShotController`.
//!
//! `build()` checks that a sensor and an actuator were supplied and validates
//! the runtime configuration before assembling the controller in Idle.

use std::sync::Arc;

use shot_traits::clock::{Clock, MonotonicClock};
use shot_traits::{Actuator, PowerSensor};

use crate::config::{DetectorCfg, FilterCfg, FilterOrder, TimingCfg};
use crate::controller::{ShotController, ShotParameters};
use crate::detector::Detector;
use crate::error::{BuildError, Result};
use crate::filter::SignalConditioner;
use crate::status::ShotBudget;

pub struct ShotControllerBuilder<S, A> {
    sensor: Option<S>,
    actuator: Option<A>,
    filter: FilterCfg,
    timing: TimingCfg,
    detector: DetectorCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    params: ShotParameters,
}

impl<S, A> Default for ShotControllerBuilder<S, A> {
    fn default() -> Self {
        Self {
            sensor: None,
            actuator: None,
            filter: FilterCfg::default(),
            timing: TimingCfg::default(),
            detector: DetectorCfg::default(),
            clock: None,
            params: ShotParameters::default(),
        }
    }
}

impl<S: PowerSensor, A: Actuator> ShotController<S, A> {
    /// Start building a controller.
    pub fn builder() -> ShotControllerBuilder<S, A> {
        ShotControllerBuilder::default()
    }
}

impl<S: PowerSensor, A: Actuator> ShotControllerBuilder<S, A> {
    pub fn with_sensor(mut self, sensor: S) -> Self {
        self.sensor = Some(sensor);
        self
    }

    pub fn with_actuator(mut self, actuator: A) -> Self {
        self.actuator = Some(actuator);
        self
    }

    pub fn with_filter(mut self, filter: FilterCfg) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_timing(mut self, timing: TimingCfg) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_detector(mut self, detector: DetectorCfg) -> Self {
        self.detector = detector;
        self
    }

    /// Inject a clock (tests use `ManualClock`). Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn with_shots(mut self, shots: ShotBudget) -> Self {
        self.params.shots = shots;
        self
    }

    pub fn with_inter_shot_delay_ms(mut self, delay_ms: f64) -> Self {
        self.params.inter_shot_delay_ms = delay_ms;
        self
    }

    pub fn build(self) -> Result<ShotController<S, A>> {
        let sensor = self
            .sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensor))?;
        let actuator = self
            .actuator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator))?;

        // ── Validation ───────────────────────────────────────────────────────
        if self.filter.order != FilterOrder::Passthrough {
            if !(self.filter.sample_interval_ms.is_finite() && self.filter.sample_interval_ms > 0.0)
            {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "sample_interval_ms must be > 0",
                )));
            }
            let nyquist_hz = 1000.0 / (2.0 * self.filter.sample_interval_ms);
            if !(self.filter.cutoff_hz > 0.0 && self.filter.cutoff_hz < nyquist_hz) {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "cutoff_hz must be in (0, nyquist)",
                )));
            }
        }
        if self.timing.tick.is_zero() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "tick must be >= 1ms",
            )));
        }
        if !(self.detector.trigger_ratio.is_finite() && self.detector.trigger_ratio > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "trigger_ratio must be > 0",
            )));
        }
        let delay = self.params.inter_shot_delay_ms;
        if !(delay.is_finite() && delay >= 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "inter-shot delay must be >= 0",
            )));
        }

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let detector = Detector::new(&self.detector, self.timing.phase_timeout);
        let conditioner = SignalConditioner::new(sensor, &self.filter);
        Ok(ShotController::assemble(
            conditioner,
            actuator,
            detector,
            self.timing,
            clock,
            self.params,
        ))
    }
}
