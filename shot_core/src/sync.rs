//! Control-plane synchronizer: applies inbound commands to the controller and
//! pushes status snapshots to connected observers.
//!
//! Runs on the control loop's thread. Commands mutate the controller between
//! ticks, so a change made here is first seen by the next `tick`.

use std::collections::BTreeMap;

use shot_traits::{Actuator, PowerSensor};

use crate::controller::ShotController;
use crate::protocol::{self, Command, Dialect, Patch};
use crate::status::{ControllerStatus, Phase, ShotBudget, StatusBroadcast};

pub type ObserverId = u64;

/// Outbound half of one observer's channel.
pub trait Observer: Send {
    /// Deliver one text frame. `false` means the observer is gone.
    fn deliver(&mut self, frame: &str) -> bool;
}

/// Never blocks the loop: a disconnected channel and a full bounded one both
/// count as a dead observer.
impl Observer for crossbeam_channel::Sender<String> {
    fn deliver(&mut self, frame: &str) -> bool {
        self.try_send(frame.to_owned()).is_ok()
    }
}

pub struct ControlPlane {
    observers: BTreeMap<ObserverId, Box<dyn Observer>>,
    dialect: Dialect,
    broadcasts: u64,
}

impl core::fmt::Debug for ControlPlane {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlPlane")
            .field("observers", &self.observers.keys().collect::<Vec<_>>())
            .field("dialect", &self.dialect)
            .field("broadcasts", &self.broadcasts)
            .finish()
    }
}

impl ControlPlane {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            observers: BTreeMap::new(),
            dialect,
            broadcasts: 0,
        }
    }

    pub fn connect(&mut self, id: ObserverId, observer: Box<dyn Observer>) {
        tracing::info!(client = id, "observer connected");
        self.observers.insert(id, observer);
    }

    pub fn disconnect(&mut self, id: ObserverId) {
        if self.observers.remove(&id).is_some() {
            tracing::info!(client = id, "observer disconnected");
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Telemetry: broadcasts sent since construction.
    pub fn broadcasts(&self) -> u64 {
        self.broadcasts
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Parse and apply one inbound message from `from`.
    pub fn handle_message<S: PowerSensor, A: Actuator>(
        &mut self,
        from: ObserverId,
        text: &str,
        controller: &mut ShotController<S, A>,
    ) {
        let commands = protocol::parse(text, self.dialect);
        if commands.is_empty() {
            tracing::debug!(client = from, message = text, "ignored control message");
            return;
        }
        for cmd in commands {
            self.apply(from, cmd, controller);
        }
    }

    /// Apply one command. Everything except `Status` ends with a broadcast.
    pub fn apply<S: PowerSensor, A: Actuator>(
        &mut self,
        from: ObserverId,
        cmd: Command,
        controller: &mut ShotController<S, A>,
    ) {
        match cmd {
            Command::Status => {
                self.reply(from, &controller.status());
                return;
            }
            Command::Start => {
                tracing::info!(client = from, "start requested");
                controller.start();
            }
            Command::Stop => {
                tracing::info!(client = from, "stop requested");
                controller.stop();
            }
            Command::SingleShot => {
                tracing::info!(client = from, "single shot requested");
                controller.set_shots(ShotBudget::Remaining(1));
                controller.start();
            }
            Command::Patch(patch) => apply_patch(from, patch, controller),
        }
        self.broadcast(&controller.status());
    }

    /// Unicast a status snapshot to one observer.
    pub fn reply(&mut self, to: ObserverId, status: &ControllerStatus) {
        let frame = status.to_json();
        let gone = match self.observers.get_mut(&to) {
            Some(obs) => !obs.deliver(&frame),
            None => false,
        };
        if gone {
            self.disconnect(to);
        }
    }
}

fn apply_patch<S: PowerSensor, A: Actuator>(
    from: ObserverId,
    patch: Patch,
    controller: &mut ShotController<S, A>,
) {
    if let Some(shots) = patch.shots {
        controller.set_shots(shots);
    }
    if let Some(delay_ms) = patch.delay_ms {
        controller.set_inter_shot_delay_ms(delay_ms);
    }
    match patch.phase {
        Some(Phase::Starting) => controller.start(),
        Some(Phase::Idle) => controller.stop(),
        _ => {}
    }
    tracing::info!(
        client = from,
        shots = patch.shots.map(ShotBudget::as_count),
        delay_ms = patch.delay_ms,
        phase = ?patch.phase,
        "parameters patched"
    );
}

impl StatusBroadcast for ControlPlane {
    fn broadcast(&mut self, status: &ControllerStatus) {
        let frame = status.to_json();
        self.broadcasts = self.broadcasts.saturating_add(1);
        let mut gone = Vec::new();
        for (id, obs) in &mut self.observers {
            if !obs.deliver(&frame) {
                gone.push(*id);
            }
        }
        for id in gone {
            self.disconnect(id);
        }
    }
}
