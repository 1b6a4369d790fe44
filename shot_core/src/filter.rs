//! Signal conditioning: sensor read followed by a Butterworth low-pass.
//!
//! Coefficients come from the bilinear transform with frequency prewarping,
//! so the -3 dB point lands exactly on `cutoff_hz` for the configured
//! sampling interval. The filter primes its history with the first input,
//! which avoids a startup ramp from zero.

use std::f64::consts::{PI, SQRT_2};

use shot_traits::PowerSensor;

use crate::config::{FilterCfg, FilterOrder};
use crate::error::ShotError;
use crate::hw_error::map_boxed;

#[derive(Debug, Clone, Copy)]
enum Design {
    Passthrough,
    FirstOrder { b0: f64, b1: f64, a1: f64 },
    SecondOrder { b0: f64, b1: f64, b2: f64, a1: f64, a2: f64 },
}

/// Direct-form I IIR low-pass of order 0, 1 or 2.
#[derive(Debug, Clone)]
pub struct LowPass {
    design: Design,
    // x[n-1], x[n-2], y[n-1], y[n-2]; None until the first sample
    history: Option<[f64; 4]>,
}

impl LowPass {
    pub fn new(cfg: &FilterCfg) -> Self {
        let t = cfg.sample_interval_ms / 1000.0;
        let k = (PI * cfg.cutoff_hz * t).tan();
        let design = match cfg.order {
            FilterOrder::Passthrough => Design::Passthrough,
            FilterOrder::First => {
                let norm = 1.0 / (1.0 + k);
                Design::FirstOrder {
                    b0: k * norm,
                    b1: k * norm,
                    a1: (k - 1.0) * norm,
                }
            }
            FilterOrder::Second => {
                let k2 = k * k;
                let norm = 1.0 / (1.0 + SQRT_2 * k + k2);
                let b0 = k2 * norm;
                Design::SecondOrder {
                    b0,
                    b1: 2.0 * b0,
                    b2: b0,
                    a1: 2.0 * (k2 - 1.0) * norm,
                    a2: (1.0 - SQRT_2 * k + k2) * norm,
                }
            }
        };
        Self {
            design,
            history: None,
        }
    }

    /// Feed one raw sample, returning the smoothed value.
    pub fn apply(&mut self, x: f64) -> f64 {
        let [x1, x2, y1, y2] = *self.history.get_or_insert([x, x, x, x]);
        let y = match self.design {
            Design::Passthrough => x,
            Design::FirstOrder { b0, b1, a1 } => b0 * x + b1 * x1 - a1 * y1,
            Design::SecondOrder { b0, b1, b2, a1, a2 } => {
                b0 * x + b1 * x1 + b2 * x2 - a1 * y1 - a2 * y2
            }
        };
        self.history = Some([x, x1, y, y1]);
        y
    }

    /// Forget all history; the next sample primes the filter again.
    pub fn reset(&mut self) {
        self.history = None;
    }
}

/// Sensor read plus low-pass, exposing only the conditioned value.
///
/// Read failures and non-finite readings are absorbed: the last good raw
/// reading (zero before any) stands in for the missing sample.
pub struct SignalConditioner<S: PowerSensor> {
    sensor: S,
    filter: LowPass,
    last_raw: f64,
    read_errors: u64,
}

impl<S: PowerSensor> SignalConditioner<S> {
    pub fn new(sensor: S, cfg: &FilterCfg) -> Self {
        Self {
            sensor,
            filter: LowPass::new(cfg),
            last_raw: 0.0,
            read_errors: 0,
        }
    }

    /// Read the sensor once and return the conditioned sample.
    pub fn sample(&mut self) -> f64 {
        match self.sensor.read_power_mw() {
            Ok(p) if p.is_finite() => self.last_raw = f64::from(p),
            Ok(p) => {
                self.read_errors = self.read_errors.saturating_add(1);
                tracing::warn!(power_mw = p, "non-finite power reading; reusing last");
            }
            Err(e) => {
                self.read_errors = self.read_errors.saturating_add(1);
                tracing::warn!(error = %e, "power read failed; reusing last");
            }
        }
        self.condition(self.last_raw)
    }

    /// Smooth an externally obtained raw sample.
    pub fn condition(&mut self, raw: f64) -> f64 {
        self.filter.apply(raw)
    }

    /// Single read used at bring-up. Any failure means the sensor is absent.
    pub fn probe(&mut self) -> Result<f32, ShotError> {
        match self.sensor.read_power_mw() {
            Ok(p) if p.is_finite() => Ok(p),
            Ok(p) => Err(ShotError::SensorUnavailable(format!(
                "sensor returned non-finite reading {p}"
            ))),
            Err(e) => Err(match map_boxed(&*e) {
                ShotError::SensorUnavailable(msg) => ShotError::SensorUnavailable(msg),
                other => ShotError::SensorUnavailable(other.to_string()),
            }),
        }
    }

    /// Telemetry: number of absorbed read failures.
    pub fn read_errors(&self) -> u64 {
        self.read_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn second_order() -> LowPass {
        LowPass::new(&FilterCfg::default())
    }

    #[test]
    fn constant_input_is_a_fixed_point() {
        let mut f = second_order();
        for _ in 0..500 {
            let y = f.apply(250.0);
            assert!((y - 250.0).abs() < 1e-9, "drifted to {y}");
        }
    }

    #[test]
    fn step_converges_without_large_overshoot() {
        let mut f = second_order();
        f.apply(0.0);
        let mut y = 0.0;
        let mut peak: f64 = 0.0;
        for _ in 0..200 {
            y = f.apply(100.0);
            peak = peak.max(y);
        }
        assert!((y - 100.0).abs() < 0.5, "settled at {y}");
        // Butterworth: ~4% overshoot on a step
        assert!(peak < 106.0, "peak {peak}");
    }

    #[test]
    fn attenuates_content_above_cutoff() {
        // Sign flip every sample is the 250 Hz Nyquist tone at 2 ms sampling
        let mut f = second_order();
        f.apply(0.0);
        let mut max_late: f64 = 0.0;
        for n in 0..400 {
            let x = if n % 2 == 0 { 100.0 } else { -100.0 };
            let y = f.apply(x);
            if n > 200 {
                max_late = max_late.max(y.abs());
            }
        }
        assert!(max_late < 10.0, "residual {max_late}");
    }

    #[test]
    fn first_order_has_unity_dc_gain() {
        let mut f = LowPass::new(&FilterCfg {
            order: FilterOrder::First,
            ..FilterCfg::default()
        });
        f.apply(0.0);
        let mut y = 0.0;
        for _ in 0..500 {
            y = f.apply(42.0);
        }
        assert!((y - 42.0).abs() < 1e-6);
    }

    #[test]
    fn passthrough_is_identity() {
        let mut f = LowPass::new(&FilterCfg::passthrough());
        assert_eq!(f.apply(3.0), 3.0);
        assert_eq!(f.apply(-7.5), -7.5);
    }

    #[test]
    fn reset_reprimes_history() {
        let mut f = second_order();
        f.apply(0.0);
        f.apply(100.0);
        f.reset();
        assert!((f.apply(40.0) - 40.0).abs() < 1e-9);
    }

    struct Flaky(Vec<Result<f32, &'static str>>);
    impl PowerSensor for Flaky {
        fn read_power_mw(&mut self) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
            match self.0.remove(0) {
                Ok(v) => Ok(v),
                Err(msg) => Err(msg.into()),
            }
        }
    }

    #[test]
    fn read_errors_reuse_last_good_sample() {
        let sensor = Flaky(vec![Err("boom"), Ok(80.0), Err("boom"), Ok(f32::NAN)]);
        let mut c = SignalConditioner::new(sensor, &FilterCfg::passthrough());
        assert_eq!(c.sample(), 0.0);
        assert_eq!(c.sample(), 80.0);
        assert_eq!(c.sample(), 80.0);
        assert_eq!(c.sample(), 80.0);
        assert_eq!(c.read_errors(), 3);
    }

    #[test]
    fn probe_failure_is_sensor_unavailable() {
        let mut c = SignalConditioner::new(Flaky(vec![Err("no ack")]), &FilterCfg::passthrough());
        assert!(matches!(c.probe(), Err(ShotError::SensorUnavailable(_))));
    }
}
