//! Observable controller state and the broadcast seam.

use serde::{Deserialize, Serialize};

/// Phase of the shot sequencing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Actuator held off; waits for a start command.
    Idle,
    /// Consumes a shot and enables the actuator, or returns to Idle.
    Starting,
    /// Sampling until the power peak marks the start of actuation.
    Actuating,
    /// Sampling until power drops back, marking the release.
    Releasing,
    /// Actuator off; waits out the inter-shot delay.
    Cooling,
}

/// Remaining shots in the current sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotBudget {
    Unlimited,
    Remaining(u32),
}

impl Default for ShotBudget {
    fn default() -> Self {
        Self::Remaining(0)
    }
}

impl ShotBudget {
    /// Wire form: -1 is unlimited, non-negative counts are literal.
    /// Other negative values, and counts beyond `u32::MAX`, yield None.
    pub fn from_count(n: i64) -> Option<Self> {
        match n {
            -1 => Some(Self::Unlimited),
            n => u32::try_from(n).ok().map(Self::Remaining),
        }
    }

    pub fn as_count(self) -> i64 {
        match self {
            Self::Unlimited => -1,
            Self::Remaining(n) => i64::from(n),
        }
    }

    pub fn has_remaining(self) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Remaining(n) => n > 0,
        }
    }

    /// Take one shot; unlimited budgets never decrement.
    pub fn consume(&mut self) {
        if let Self::Remaining(n) = self {
            *n = n.saturating_sub(1);
        }
    }
}

/// Snapshot pushed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStatus {
    pub is_motor_enabled: bool,
    pub number_of_shots: i64,
    pub delay_between_shots: f64,
}

impl ControllerStatus {
    /// JSON frame sent over the control plane.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "status serialization failed");
            String::from("{}")
        })
    }
}

/// Receiver of status snapshots pushed by the controller.
pub trait StatusBroadcast {
    fn broadcast(&mut self, status: &ControllerStatus);
}
