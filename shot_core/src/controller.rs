//! Shot sequencing state machine.
//!
//! One `tick` evaluates the current phase exactly once:
//!
//! ```text
//! Idle ──(start command)──▶ Starting ──▶ Actuating ──rise──▶ Releasing ──fall──▶ Cooling
//!   ▲                           │                                                  │
//!   └────── budget exhausted ───┘◀──────────────── inter-shot delay elapsed ───────┘
//! ```
//!
//! `phase_elapsed` restarts from zero on the first tick after any phase
//! change, including changes forced between ticks by the control plane, and
//! otherwise accumulates the wall-clock delta between ticks. The two settle
//! delays block the loop through the injected `Clock`; a phase entered by a
//! tick is timed from the end of that tick, so a settle delay never counts
//! toward the phase that follows it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use shot_traits::{Actuator, Clock, PowerSensor};

use crate::config::TimingCfg;
use crate::detector::{Detector, Edge, RunningAverage, Trigger};
use crate::error::Result;
use crate::filter::SignalConditioner;
use crate::hw_error::map_boxed;
use crate::status::{ControllerStatus, Phase, ShotBudget, StatusBroadcast};

/// Loop-owned mutable state.
#[derive(Debug, Clone)]
pub struct ControlState {
    phase: Phase,
    // Phase observed at the previous tick; a mismatch restarts the phase timer.
    observed: Phase,
    phase_elapsed: Duration,
    last_tick: Instant,
    average: RunningAverage,
}

impl ControlState {
    fn new(now: Instant) -> Self {
        Self {
            phase: Phase::Idle,
            observed: Phase::Idle,
            phase_elapsed: Duration::ZERO,
            last_tick: now,
            average: RunningAverage::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn phase_elapsed(&self) -> Duration {
        self.phase_elapsed
    }

    pub fn sample_count(&self) -> u32 {
        self.average.count()
    }

    pub fn running_average(&self) -> f64 {
        self.average.mean()
    }
}

/// Parameters the control plane may change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotParameters {
    pub shots: ShotBudget,
    /// Minimum time spent in Cooling, in milliseconds.
    pub inter_shot_delay_ms: f64,
}

impl Default for ShotParameters {
    fn default() -> Self {
        Self {
            shots: ShotBudget::default(),
            inter_shot_delay_ms: 0.0,
        }
    }
}

pub struct ShotController<S: PowerSensor, A: Actuator> {
    pub(crate) conditioner: SignalConditioner<S>,
    pub(crate) actuator: A,
    pub(crate) actuator_enabled: bool,
    pub(crate) detector: Detector,
    pub(crate) timing: TimingCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) state: ControlState,
    pub(crate) params: ShotParameters,
    pub(crate) shots_fired: u64,
}

impl<S: PowerSensor, A: Actuator> core::fmt::Debug for ShotController<S, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ShotController")
            .field("phase", &self.state.phase)
            .field("actuator_enabled", &self.actuator_enabled)
            .field("params", &self.params)
            .field("shots_fired", &self.shots_fired)
            .finish()
    }
}

impl<S: PowerSensor, A: Actuator> ShotController<S, A> {
    pub(crate) fn assemble(
        conditioner: SignalConditioner<S>,
        actuator: A,
        detector: Detector,
        timing: TimingCfg,
        clock: Arc<dyn Clock + Send + Sync>,
        params: ShotParameters,
    ) -> Self {
        let now = clock.now();
        Self {
            conditioner,
            actuator,
            actuator_enabled: false,
            detector,
            timing,
            clock,
            state: ControlState::new(now),
            params,
            shots_fired: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn params(&self) -> ShotParameters {
        self.params
    }

    pub fn is_actuator_enabled(&self) -> bool {
        self.actuator_enabled
    }

    /// Telemetry: shots started since construction.
    pub fn shots_fired(&self) -> u64 {
        self.shots_fired
    }

    /// Telemetry: sensor read failures absorbed by the conditioner.
    pub fn sensor_read_errors(&self) -> u64 {
        self.conditioner.read_errors()
    }

    pub fn timing(&self) -> &TimingCfg {
        &self.timing
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            is_motor_enabled: self.actuator_enabled,
            number_of_shots: self.params.shots.as_count(),
            delay_between_shots: self.params.inter_shot_delay_ms,
        }
    }

    /// Probe the sensor once. Failure is fatal at bring-up.
    pub fn probe_sensor(&mut self) -> Result<f32> {
        let p = self
            .conditioner
            .probe()
            .map_err(eyre::Report::new)
            .wrap_err("probing power sensor")?;
        tracing::info!(power_mw = p, "power sensor present");
        Ok(p)
    }

    /// Force the sequence to (re)start on the next tick.
    pub fn start(&mut self) {
        self.enter(Phase::Starting);
    }

    /// Force the controller back to Idle; the actuator drops on the next tick.
    pub fn stop(&mut self) {
        self.enter(Phase::Idle);
    }

    pub fn set_shots(&mut self, shots: ShotBudget) {
        self.params.shots = shots;
    }

    /// Set the Cooling hold. Negative or non-finite values are rejected.
    pub fn set_inter_shot_delay_ms(&mut self, delay_ms: f64) -> bool {
        if !(delay_ms.is_finite() && delay_ms >= 0.0) {
            return false;
        }
        self.params.inter_shot_delay_ms = delay_ms;
        true
    }

    /// Evaluate the current phase once and return the phase afterwards.
    pub fn tick(&mut self, out: &mut dyn StatusBroadcast) -> Result<Phase> {
        let now = self.clock.now();
        let dt = now.saturating_duration_since(self.state.last_tick);
        self.state.last_tick = now;
        if self.state.observed != self.state.phase {
            self.state.observed = self.state.phase;
            self.state.phase_elapsed = Duration::ZERO;
        }
        self.state.phase_elapsed = self.state.phase_elapsed.saturating_add(dt);

        let entered = self.state.phase;
        match self.state.phase {
            Phase::Idle => self.set_actuator(false, out)?,
            Phase::Starting => {
                if self.params.shots.has_remaining() {
                    self.params.shots.consume();
                    self.set_actuator(true, out)?;
                    self.state.average.reset();
                    self.shots_fired = self.shots_fired.saturating_add(1);
                    tracing::info!(
                        shot = self.shots_fired,
                        remaining = self.params.shots.as_count(),
                        "shot started"
                    );
                    self.clock.sleep(self.timing.pre_shot_settle);
                    self.enter(Phase::Actuating);
                } else {
                    tracing::info!(fired = self.shots_fired, "shot sequence exhausted");
                    self.enter(Phase::Idle);
                }
            }
            Phase::Actuating => {
                if let Some(trigger) = self.detect(Edge::Rise) {
                    log_trigger(Edge::Rise, trigger, &self.state);
                    self.enter(Phase::Releasing);
                }
            }
            Phase::Releasing => {
                if let Some(trigger) = self.detect(Edge::Fall) {
                    log_trigger(Edge::Fall, trigger, &self.state);
                    self.clock.sleep(self.timing.post_shot_settle);
                    self.set_actuator(false, out)?;
                    self.enter(Phase::Cooling);
                }
            }
            Phase::Cooling => {
                let elapsed_ms = self.state.phase_elapsed.as_secs_f64() * 1000.0;
                if elapsed_ms > self.params.inter_shot_delay_ms {
                    self.enter(Phase::Starting);
                    out.broadcast(&self.status());
                }
            }
        }
        if self.state.phase != entered {
            self.state.last_tick = self.clock.now();
        }
        Ok(self.state.phase)
    }

    /// Sleep for one loop period on the controller's clock.
    pub fn rest(&self) {
        self.clock.sleep(self.timing.tick);
    }

    /// Drop the actuator regardless of phase (shutdown path).
    pub fn halt(&mut self, out: &mut dyn StatusBroadcast) {
        self.enter(Phase::Idle);
        if let Err(e) = self.set_actuator(false, out) {
            tracing::warn!(error = %e, "actuator disable failed on halt");
        }
    }

    fn detect(&mut self, edge: Edge) -> Option<Trigger> {
        let sample = self.conditioner.sample();
        self.detector.evaluate(
            edge,
            sample,
            &mut self.state.average,
            self.state.phase_elapsed,
        )
    }

    fn enter(&mut self, next: Phase) {
        if self.state.phase != next {
            tracing::debug!(from = ?self.state.phase, to = ?next, "phase transition");
            self.state.phase = next;
        }
    }

    /// Idempotent: repeating the current value touches neither the hardware
    /// nor the observers. Enable failures propagate; disable is best-effort.
    fn set_actuator(&mut self, enabled: bool, out: &mut dyn StatusBroadcast) -> Result<()> {
        if self.actuator_enabled == enabled {
            return Ok(());
        }
        if let Err(e) = self.actuator.set_enabled(enabled) {
            let mapped = map_boxed(&*e);
            if enabled {
                return Err(eyre::Report::new(mapped)).wrap_err("enabling actuator");
            }
            tracing::warn!(error = %mapped, "actuator disable failed");
        }
        self.actuator_enabled = enabled;
        out.broadcast(&self.status());
        Ok(())
    }
}

fn log_trigger(edge: Edge, trigger: Trigger, state: &ControlState) {
    match trigger {
        Trigger::Threshold => tracing::debug!(
            ?edge,
            samples = state.sample_count(),
            mean = state.running_average(),
            "edge detected"
        ),
        Trigger::Timeout => tracing::warn!(
            ?edge,
            elapsed_ms = state.phase_elapsed().as_millis() as u64,
            "edge not seen before phase timeout"
        ),
    }
}
