//! Sensor and actuator backends.
//!
//! The simulated pair shares the actuator's state with the sensor so the
//! reported power follows a shot: load draw while the spring is wound, a
//! peak as it reaches the release point, then relaxed draw until disabled.
//! Every rising edge of the actuator starts the curve over.
//! Real hardware (INA219 over I2C, GPIO motor driver) sits behind the
//! `hardware` feature.
pub mod error;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod ina219;

use shot_traits::{Actuator, PowerSensor};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Power profile of one simulated firing cycle, in samples and milliwatts.
#[derive(Debug, Clone, Copy)]
pub struct LoadProfile {
    /// Draw while the actuator is disabled.
    pub idle_mw: f32,
    /// Draw while winding, before the peak.
    pub load_mw: f32,
    /// Samples spent winding.
    pub load_samples: u32,
    /// Draw at the release point.
    pub peak_mw: f32,
    /// Samples spent at the peak.
    pub peak_samples: u32,
    /// Draw after release while still enabled.
    pub relaxed_mw: f32,
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self {
            idle_mw: 4.0,
            load_mw: 120.0,
            load_samples: 60,
            peak_mw: 600.0,
            peak_samples: 40,
            relaxed_mw: 150.0,
        }
    }
}

impl LoadProfile {
    /// Power drawn at the `n`th read since the actuator was enabled.
    pub fn power_at(&self, n: u32) -> f32 {
        if n < self.load_samples {
            self.load_mw
        } else if n < self.load_samples.saturating_add(self.peak_samples) {
            self.peak_mw
        } else {
            self.relaxed_mw
        }
    }
}

/// State shared by a simulated sensor/actuator pair.
#[derive(Debug, Default)]
struct Mechanism {
    enabled: AtomicBool,
    /// Bumped on every off -> on transition.
    cycle: AtomicU32,
}

/// Simulated power sensor driven by a `SimulatedActuator`'s state.
pub struct SimulatedPowerSensor {
    mechanism: Arc<Mechanism>,
    profile: LoadProfile,
    cycle: u32,
    reads_while_enabled: u32,
}

impl PowerSensor for SimulatedPowerSensor {
    fn read_power_mw(&mut self) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        if !self.mechanism.enabled.load(Ordering::Acquire) {
            return Ok(self.profile.idle_mw);
        }
        let cycle = self.mechanism.cycle.load(Ordering::Acquire);
        if cycle != self.cycle {
            self.cycle = cycle;
            self.reads_while_enabled = 0;
        }
        let p = self.profile.power_at(self.reads_while_enabled);
        self.reads_while_enabled = self.reads_while_enabled.saturating_add(1);
        tracing::trace!(power_mw = p, "simulated power sample");
        Ok(p)
    }
}

/// Simulated motor output.
pub struct SimulatedActuator {
    mechanism: Arc<Mechanism>,
}

impl SimulatedActuator {
    pub fn is_enabled(&self) -> bool {
        self.mechanism.enabled.load(Ordering::Acquire)
    }
}

impl Actuator for SimulatedActuator {
    fn set_enabled(
        &mut self,
        enabled: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let was = self.mechanism.enabled.load(Ordering::Acquire);
        if enabled && !was {
            self.mechanism.cycle.fetch_add(1, Ordering::AcqRel);
        }
        self.mechanism.enabled.store(enabled, Ordering::Release);
        tracing::debug!(enabled, "actuator (simulated)");
        Ok(())
    }
}

/// Build a sensor/actuator pair sharing one simulated mechanism.
pub fn simulated_pair(profile: LoadProfile) -> (SimulatedPowerSensor, SimulatedActuator) {
    let mechanism = Arc::new(Mechanism::default());
    (
        SimulatedPowerSensor {
            mechanism: Arc::clone(&mechanism),
            profile,
            cycle: 0,
            reads_while_enabled: 0,
        },
        SimulatedActuator { mechanism },
    )
}
