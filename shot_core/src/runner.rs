//! Single-threaded control loop: drain control-plane events, tick, rest.
//!
//! Transports run elsewhere and forward [`Inbound`] events over a channel.
//! Events are applied only between ticks, so the controller never sees a
//! command mid-evaluation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, TryRecvError};
use shot_traits::{Actuator, PowerSensor};

use crate::controller::ShotController;
use crate::error::Result;
use crate::status::Phase;
use crate::sync::{ControlPlane, Observer, ObserverId};

/// Event forwarded from a transport to the control loop.
pub enum Inbound {
    Connected {
        id: ObserverId,
        observer: Box<dyn Observer>,
    },
    Disconnected {
        id: ObserverId,
    },
    Message {
        id: ObserverId,
        text: String,
    },
}

impl core::fmt::Debug for Inbound {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Connected { id, .. } => f.debug_struct("Connected").field("id", id).finish(),
            Self::Disconnected { id } => f.debug_struct("Disconnected").field("id", id).finish(),
            Self::Message { id, text } => f
                .debug_struct("Message")
                .field("id", id)
                .field("text", text)
                .finish(),
        }
    }
}

/// Totals reported when the loop exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub ticks: u64,
    pub shots_fired: u64,
    pub broadcasts: u64,
    pub sensor_read_errors: u64,
}

pub struct ControlLoop<S: PowerSensor, A: Actuator> {
    controller: ShotController<S, A>,
    plane: ControlPlane,
    inbox: Receiver<Inbound>,
    shutdown: Arc<AtomicBool>,
    ticks: u64,
    inbox_closed: bool,
}

impl<S: PowerSensor, A: Actuator> ControlLoop<S, A> {
    pub fn new(
        controller: ShotController<S, A>,
        plane: ControlPlane,
        inbox: Receiver<Inbound>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            controller,
            plane,
            inbox,
            shutdown,
            ticks: 0,
            inbox_closed: false,
        }
    }

    pub fn controller(&self) -> &ShotController<S, A> {
        &self.controller
    }

    pub fn plane(&self) -> &ControlPlane {
        &self.plane
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Apply every pending inbound event. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while !self.inbox_closed {
            match self.inbox.try_recv() {
                Ok(ev) => {
                    self.dispatch(ev);
                    applied += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::debug!("control-plane inbox closed");
                    self.inbox_closed = true;
                }
            }
        }
        applied
    }

    /// One iteration: pump events, tick once, rest one period.
    pub fn step(&mut self) -> Result<Phase> {
        self.pump();
        let phase = self.controller.tick(&mut self.plane)?;
        self.ticks = self.ticks.saturating_add(1);
        self.controller.rest();
        Ok(phase)
    }

    /// Loop until the shutdown flag is raised or a tick fails. The actuator
    /// is dropped on every exit path.
    pub fn run(mut self) -> Result<RunSummary> {
        tracing::info!(
            tick_ms = self.controller.timing().tick.as_millis() as u64,
            dialect = ?self.plane.dialect(),
            "control loop started"
        );
        let outcome = loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break Ok(());
            }
            if let Err(e) = self.step() {
                tracing::error!(error = %e, "control loop aborted");
                break Err(e);
            }
        };
        self.controller.halt(&mut self.plane);
        let summary = self.summary();
        tracing::info!(
            ticks = summary.ticks,
            shots = summary.shots_fired,
            broadcasts = summary.broadcasts,
            read_errors = summary.sensor_read_errors,
            "control loop stopped"
        );
        outcome.map(|()| summary)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.ticks,
            shots_fired: self.controller.shots_fired(),
            broadcasts: self.plane.broadcasts(),
            sensor_read_errors: self.controller.sensor_read_errors(),
        }
    }

    fn dispatch(&mut self, ev: Inbound) {
        match ev {
            Inbound::Connected { id, observer } => self.plane.connect(id, observer),
            Inbound::Disconnected { id } => self.plane.disconnect(id),
            Inbound::Message { id, text } => {
                self.plane.handle_message(id, &text, &mut self.controller);
            }
        }
    }
}
