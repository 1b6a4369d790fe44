//! Shared rigs for shot_core integration tests.
#![allow(dead_code)]

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shot_core::status::StatusBroadcast;
use shot_core::{FilterCfg, Phase, ShotBudget, ShotController};
use shot_traits::{Actuator, ManualClock, PowerSensor};

pub type BoxErr = Box<dyn Error + Send + Sync>;

/// Actuator state change stamped with virtual time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Switch {
    pub at: Duration,
    pub enabled: bool,
}

/// Records every state change; optionally fails enable requests.
#[derive(Clone)]
pub struct SpyActuator {
    clock: ManualClock,
    pub switches: Arc<Mutex<Vec<Switch>>>,
    enabled_at: Arc<Mutex<Option<Duration>>>,
    fail_enable: bool,
}

impl SpyActuator {
    pub fn new(clock: &ManualClock) -> Self {
        Self {
            clock: clock.clone(),
            switches: Arc::new(Mutex::new(Vec::new())),
            enabled_at: Arc::new(Mutex::new(None)),
            fail_enable: false,
        }
    }

    pub fn failing(clock: &ManualClock) -> Self {
        Self {
            fail_enable: true,
            ..Self::new(clock)
        }
    }

    pub fn switches(&self) -> Vec<Switch> {
        self.switches.lock().unwrap().clone()
    }

    pub fn enables(&self) -> Vec<Duration> {
        self.switches()
            .into_iter()
            .filter(|s| s.enabled)
            .map(|s| s.at)
            .collect()
    }

    pub fn disables(&self) -> Vec<Duration> {
        self.switches()
            .into_iter()
            .filter(|s| !s.enabled)
            .map(|s| s.at)
            .collect()
    }
}

impl Actuator for SpyActuator {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), BoxErr> {
        if enabled && self.fail_enable {
            return Err("gpio write failed".into());
        }
        let at = self.clock.elapsed();
        self.switches.lock().unwrap().push(Switch { at, enabled });
        *self.enabled_at.lock().unwrap() = enabled.then_some(at);
        Ok(())
    }
}

/// Sensor whose reading is set directly by the test.
#[derive(Clone, Default)]
pub struct LevelSensor {
    pub level: Arc<Mutex<f32>>,
}

impl LevelSensor {
    pub fn new(level: f32) -> Self {
        Self {
            level: Arc::new(Mutex::new(level)),
        }
    }

    pub fn set(&self, level: f32) {
        *self.level.lock().unwrap() = level;
    }
}

impl PowerSensor for LevelSensor {
    fn read_power_mw(&mut self) -> Result<f32, BoxErr> {
        Ok(*self.level.lock().unwrap())
    }
}

/// Sensor that plays a load curve relative to the actuator's last enable:
/// 120 mW up to 200 ms, a 600 mW peak until 300 ms, then 150 mW.
/// Reads 4 mW while the actuator is off.
pub struct PulseSensor {
    clock: ManualClock,
    enabled_at: Arc<Mutex<Option<Duration>>>,
}

impl PulseSensor {
    pub fn following(actuator: &SpyActuator) -> Self {
        Self {
            clock: actuator.clock.clone(),
            enabled_at: Arc::clone(&actuator.enabled_at),
        }
    }
}

impl PowerSensor for PulseSensor {
    fn read_power_mw(&mut self) -> Result<f32, BoxErr> {
        let Some(on) = *self.enabled_at.lock().unwrap() else {
            return Ok(4.0);
        };
        let since = self.clock.elapsed().saturating_sub(on);
        Ok(if since < Duration::from_millis(200) {
            120.0
        } else if since < Duration::from_millis(300) {
            600.0
        } else {
            150.0
        })
    }
}

/// Sensor that always fails.
pub struct DeadSensor;

impl PowerSensor for DeadSensor {
    fn read_power_mw(&mut self) -> Result<f32, BoxErr> {
        Err("i2c nack".into())
    }
}

/// Controller with default timing, an exact (unfiltered) signal path and
/// the given clock.
pub fn controller<S: PowerSensor>(
    sensor: S,
    actuator: SpyActuator,
    clock: &ManualClock,
    shots: ShotBudget,
    delay_ms: f64,
) -> ShotController<S, SpyActuator> {
    ShotController::builder()
        .with_sensor(sensor)
        .with_actuator(actuator)
        .with_filter(FilterCfg::passthrough())
        .with_clock(clock.clone())
        .with_shots(shots)
        .with_inter_shot_delay_ms(delay_ms)
        .build()
        .unwrap()
}

/// One loop iteration without the control plane.
pub fn step<S: PowerSensor>(
    ctl: &mut ShotController<S, SpyActuator>,
    out: &mut dyn StatusBroadcast,
) -> Phase {
    let phase = ctl.tick(out).unwrap();
    ctl.rest();
    phase
}

/// Step until the controller settles in Idle. Returns the ticks taken.
pub fn run_to_idle<S: PowerSensor>(
    ctl: &mut ShotController<S, SpyActuator>,
    out: &mut dyn StatusBroadcast,
    max_ticks: usize,
) -> usize {
    for n in 1..=max_ticks {
        if step(ctl, out) == Phase::Idle {
            return n;
        }
    }
    panic!("controller did not settle in Idle within {max_ticks} ticks");
}
