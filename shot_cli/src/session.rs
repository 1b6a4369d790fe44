//! Controller assembly from config, sensor bring-up, and the serve loop.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use shot_core::{
    ControlLoop, ControlPlane, ControllerStatus, DetectorCfg, Dialect, FilterCfg, RunSummary,
    ShotBudget, ShotController, TimingCfg,
};

use crate::hw::{Motor, Sensor};
use crate::server::ControlServer;

/// Command-line overrides for `run`.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub bind: Option<String>,
    pub shots: Option<i64>,
    pub delay_ms: Option<f64>,
    pub start: bool,
    pub legacy: bool,
}

/// Initial shot budget and delay, from config then overrides.
pub fn initial_parameters(
    cfg: &shot_config::Config,
    shots: Option<i64>,
    delay_ms: Option<f64>,
) -> eyre::Result<(ShotBudget, f64)> {
    let count = shots.unwrap_or(cfg.shots.initial_count);
    let budget = ShotBudget::from_count(count)
        .ok_or_else(|| eyre::eyre!("shot count must be -1 (unlimited) or >= 0, got {count}"))?;
    let delay = delay_ms.unwrap_or(cfg.shots.initial_delay_ms);
    if !(delay.is_finite() && delay >= 0.0) {
        eyre::bail!("inter-shot delay must be >= 0 ms, got {delay}");
    }
    Ok((budget, delay))
}

/// Status snapshot the controller would report right after start-up.
pub fn initial_status(cfg: &shot_config::Config) -> eyre::Result<ControllerStatus> {
    let (shots, delay) = initial_parameters(cfg, None, None)?;
    Ok(ControllerStatus {
        is_motor_enabled: false,
        number_of_shots: shots.as_count(),
        delay_between_shots: delay,
    })
}

pub fn build_controller(
    cfg: &shot_config::Config,
    (sensor, motor): (Sensor, Motor),
    shots: ShotBudget,
    delay_ms: f64,
) -> eyre::Result<ShotController<Sensor, Motor>> {
    // Config sections map through the From impls in shot_core::conversions.
    let filter: FilterCfg = (&cfg.filter).into();
    let timing: TimingCfg = (&cfg.timing).into();
    let detector: DetectorCfg = (&cfg.detector).into();
    ShotController::builder()
        .with_sensor(sensor)
        .with_actuator(motor)
        .with_filter(filter)
        .with_timing(timing)
        .with_detector(detector)
        .with_shots(shots)
        .with_inter_shot_delay_ms(delay_ms)
        .build()
        .wrap_err("assembling controller")
}

/// Probe the sensor up to `attempts` times; the last failure is returned.
pub fn probe(ctl: &mut ShotController<Sensor, Motor>, attempts: u32) -> eyre::Result<f32> {
    let mut last = None;
    for attempt in 1..=attempts.max(1) {
        match ctl.probe_sensor() {
            Ok(p) => return Ok(p),
            Err(e) => {
                tracing::warn!(attempt, error = %e, "sensor probe failed");
                last = Some(e);
            }
        }
    }
    Err(last.unwrap_or_else(|| eyre::eyre!("sensor probe not attempted")))
}

/// Serve the control plane and run the loop until `shutdown` is raised.
pub fn serve(
    cfg: &shot_config::Config,
    hw: (Sensor, Motor),
    overrides: &RunOverrides,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunSummary> {
    let (shots, delay) = initial_parameters(cfg, overrides.shots, overrides.delay_ms)?;
    let mut ctl = build_controller(cfg, hw, shots, delay)?;
    let power_mw = probe(&mut ctl, cfg.sensor.probe_attempts)?;

    let dialect = if overrides.legacy {
        Dialect::Legacy
    } else {
        Dialect::from(&cfg.protocol)
    };
    let bind = overrides.bind.as_deref().unwrap_or(&cfg.server.bind);
    let server = ControlServer::bind(bind)?;
    let addr = server.local_addr()?;
    let (inbox_tx, inbox_rx) = crossbeam_channel::unbounded();
    server.spawn(inbox_tx)?;
    tracing::info!(
        %addr,
        ?dialect,
        shots = shots.as_count(),
        delay_ms = delay,
        power_mw,
        "control plane listening"
    );

    if overrides.start {
        ctl.start();
    }
    ControlLoop::new(ctl, ControlPlane::new(dialect), inbox_rx, shutdown).run()
}
