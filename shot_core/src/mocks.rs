//! Test and helper mocks for shot_core

use crate::status::{ControllerStatus, StatusBroadcast};

/// Discards every status snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBroadcast;

impl StatusBroadcast for NullBroadcast {
    fn broadcast(&mut self, _status: &ControllerStatus) {}
}

/// Records every status snapshot in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingBroadcast {
    pub sent: Vec<ControllerStatus>,
}

impl RecordingBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }

    pub fn last(&self) -> Option<&ControllerStatus> {
        self.sent.last()
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

impl StatusBroadcast for RecordingBroadcast {
    fn broadcast(&mut self, status: &ControllerStatus) {
        self.sent.push(*status);
    }
}
