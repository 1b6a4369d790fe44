#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core shot sequencing logic (hardware-agnostic).
//!
//! All hardware interactions go through `shot_traits::PowerSensor` and
//! `shot_traits::Actuator`; time goes through `shot_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Conditioning**: Butterworth low-pass over raw power readings (`filter`)
//! - **Detection**: running average with ratio threshold and phase timeout (`detector`)
//! - **Control**: the Idle/Starting/Actuating/Releasing/Cooling machine (`controller`)
//! - **Control plane**: command parsing (`protocol`) and observer fan-out (`sync`)
//! - **Runner**: single-threaded loop that interleaves commands and ticks (`runner`)

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod detector;
pub mod error;
pub mod filter;
pub mod hw_error;
pub mod mocks;
pub mod protocol;
pub mod runner;
pub mod status;
pub mod sync;

pub use builder::ShotControllerBuilder;
pub use config::{DetectorCfg, FilterCfg, FilterOrder, TimingCfg};
pub use controller::{ControlState, ShotController, ShotParameters};
pub use detector::{Detector, Edge, RunningAverage, Trigger};
pub use error::{BuildError, Result, ShotError};
pub use filter::{LowPass, SignalConditioner};
pub use protocol::{Command, Dialect, Patch};
pub use runner::{ControlLoop, Inbound, RunSummary};
pub use status::{ControllerStatus, Phase, ShotBudget, StatusBroadcast};
pub use sync::{ControlPlane, Observer, ObserverId};
