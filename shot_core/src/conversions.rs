//! `From` implementations bridging `shot_config` types to `shot_core` types.

use std::time::Duration;

use crate::config::{DetectorCfg, FilterCfg, FilterOrder, TimingCfg};
use crate::protocol::Dialect;

// ── FilterCfg ────────────────────────────────────────────────────────────────

impl From<&shot_config::FilterCfg> for FilterCfg {
    fn from(c: &shot_config::FilterCfg) -> Self {
        Self {
            cutoff_hz: c.cutoff_hz,
            sample_interval_ms: c.sample_interval_ms,
            order: match c.order {
                0 => FilterOrder::Passthrough,
                1 => FilterOrder::First,
                _ => FilterOrder::Second,
            },
        }
    }
}

// ── TimingCfg ────────────────────────────────────────────────────────────────

impl From<&shot_config::Timing> for TimingCfg {
    fn from(c: &shot_config::Timing) -> Self {
        Self {
            tick: Duration::from_millis(c.tick_ms),
            pre_shot_settle: Duration::from_millis(c.pre_shot_settle_ms),
            post_shot_settle: Duration::from_millis(c.post_shot_settle_ms),
            phase_timeout: Duration::from_millis(c.phase_timeout_ms),
        }
    }
}

// ── DetectorCfg ──────────────────────────────────────────────────────────────

impl From<&shot_config::Detector> for DetectorCfg {
    fn from(c: &shot_config::Detector) -> Self {
        Self {
            trigger_ratio: c.trigger_ratio,
        }
    }
}

// ── Dialect ──────────────────────────────────────────────────────────────────

impl From<&shot_config::Protocol> for Dialect {
    fn from(c: &shot_config::Protocol) -> Self {
        if c.legacy_substring_matching {
            Dialect::Legacy
        } else {
            Dialect::Strict
        }
    }
}
