//! Peak/trough detection against a cumulative running average.
//!
//! The average is an unweighted cumulative mean, recomputed on every sample
//! and carried from Actuating into Releasing without a reset, so both edges
//! compare against one evolving baseline. The same ratio serves as the rise
//! threshold and the fall threshold.

use std::time::Duration;

use crate::config::DetectorCfg;

/// Cumulative mean of all samples since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningAverage {
    count: u32,
    mean: f64,
}

impl RunningAverage {
    /// Fold one sample in and return the updated mean.
    ///
    /// mean' = (mean * count + sample) / (count + 1)
    #[inline]
    pub fn push(&mut self, sample: f64) -> f64 {
        let n = f64::from(self.count);
        self.mean = (self.mean * n + sample) / (n + 1.0);
        self.count = self.count.saturating_add(1);
        self.mean
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }
}

/// Which edge the detector is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Start of actuation: sample rises above the band.
    Rise,
    /// End of actuation: sample falls back below the band.
    Fall,
}

/// Why a phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Threshold,
    Timeout,
}

#[derive(Debug, Clone)]
pub struct Detector {
    ratio: f64,
    timeout: Duration,
}

impl Detector {
    pub fn new(cfg: &DetectorCfg, timeout: Duration) -> Self {
        Self {
            ratio: cfg.trigger_ratio,
            timeout,
        }
    }

    /// Update `avg` with `sample` and decide whether `edge` has been crossed.
    ///
    /// The comparison uses the mean after this sample is folded in. The phase
    /// timeout fires only once `phase_elapsed` is strictly past it.
    pub fn evaluate(
        &self,
        edge: Edge,
        sample: f64,
        avg: &mut RunningAverage,
        phase_elapsed: Duration,
    ) -> Option<Trigger> {
        let mean = avg.push(sample);
        let band = mean * self.ratio;
        let crossed = match edge {
            Edge::Rise => sample > band,
            Edge::Fall => sample < band,
        };
        tracing::trace!(?edge, sample, mean, band, crossed, "detector");
        if crossed {
            Some(Trigger::Threshold)
        } else if phase_elapsed > self.timeout {
            Some(Trigger::Timeout)
        } else {
            None
        }
    }
}
