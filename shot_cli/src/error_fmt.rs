//! Human-readable error descriptions and structured JSON error formatting.

use shot_core::error::{BuildError, ShotError};
use shot_hardware::error::HwError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No power sensor was provided to the controller.\nLikely causes: The sensor backend failed to initialize or was not wired into the builder.\nHow to fix: Ensure the INA219 is created successfully and passed via with_sensor(...).".to_string()
            }
            BuildError::MissingActuator => {
                "What happened: No actuator was provided to the controller.\nLikely causes: The motor driver failed to initialize or was not wired into the builder.\nHow to fix: Ensure the GPIO actuator is created successfully and passed via with_actuator(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<ShotError>() {
        return match se {
            ShotError::SensorUnavailable(detail) => format!(
                "What happened: The power sensor did not answer ({detail}).\nLikely causes: INA219 not powered, wrong I2C bus or address, or SDA/SCL miswired.\nHow to fix: Check [sensor] i2c_bus and address in the config and run `i2cdetect`, then rerun self-check."
            ),
            ShotError::Hardware(detail) | ShotError::HardwareFault(detail) => format!(
                "What happened: Actuator or bus fault ({detail}).\nLikely causes: GPIO permissions, wrong [actuator] pin, or a driver fault.\nHow to fix: Verify wiring and that the process may access /dev/gpiomem."
            ),
            ShotError::Timeout => "What happened: Hardware timed out.\nLikely causes: Bus contention or a hung device.\nHow to fix: Power-cycle the sensor and rerun.".to_string(),
            ShotError::Config(detail) => format!(
                "What happened: Configuration is invalid or unreadable ({detail}).\nLikely causes: Missing file, TOML syntax error, or out-of-range values.\nHow to fix: Edit the TOML config and try again."
            ),
        };
    }

    if let Some(HwError::SensorNotFound(addr)) = err.downcast_ref::<HwError>() {
        return format!(
            "What happened: No power sensor found at I2C address {addr:#04x}.\nLikely causes: INA219 not powered or a different address strap.\nHow to fix: Check [sensor] address in the config and the A0/A1 straps."
        );
    }

    // String-based heuristics for errors coming from server start-up
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("bind") || lower.contains("address in use") {
        return format!(
            "What happened: The control-plane server could not start ({msg}).\nLikely causes: Another process holds the port or the address is not local.\nHow to fix: Pick a free port with --bind or [server] bind."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 sensor missing, 4 actuator/hardware fault,
/// 5 invalid configuration, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(se) = err.downcast_ref::<ShotError>() {
        return match se {
            ShotError::SensorUnavailable(_) => 3,
            ShotError::Config(_) => 5,
            _ => 4,
        };
    }
    if let Some(hw) = err.downcast_ref::<HwError>() {
        return match hw {
            HwError::SensorNotFound(_) => 3,
            _ => 4,
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return 5;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(se) = err.downcast_ref::<ShotError>() {
        return match se {
            ShotError::SensorUnavailable(_) => "SensorUnavailable",
            ShotError::Hardware(_) | ShotError::HardwareFault(_) => "Hardware",
            ShotError::Timeout => "Timeout",
            ShotError::Config(_) => "Config",
        };
    }
    match exit_code_for_error(err) {
        3 => "SensorUnavailable",
        4 => "Hardware",
        5 => "Config",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
