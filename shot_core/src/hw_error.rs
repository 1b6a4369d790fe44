//! Maps `Box<dyn Error>` from trait boundaries to typed `ShotError`.
//!
//! The traits in `shot_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to the typed error enum, with a feature-gated path for
//! `shot_hardware::HwError` downcasting.

use crate::error::ShotError;

/// Map a trait-boundary error to a typed `ShotError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ShotError {
    #[cfg(feature = "hardware-errors")]
    {
        use shot_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::SensorNotFound(_) => ShotError::SensorUnavailable(hw.to_string()),
                other => ShotError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        ShotError::Timeout
    } else {
        ShotError::Hardware(s)
    }
}

/// Same as `map_hw_error` for the boxed form returned by the traits.
pub fn map_boxed(e: &(dyn std::error::Error + Send + Sync + 'static)) -> ShotError {
    map_hw_error(e)
}
