//! Tracing subscriber bring-up.
//!
//! Console level comes from `--log-level` unless `RUST_LOG` is set. With
//! `--json` the console emits JSON lines. `[logging] file` adds a JSON file
//! sink through `tracing-appender`; its guard is parked in `FILE_GUARD` so
//! buffered lines flush at exit.

use std::path::Path;

use eyre::WrapErr;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::cli::FILE_GUARD;

fn build_env_filter(level: &str) -> eyre::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).wrap_err_with(|| format!("invalid log level {level:?}"))
}

fn file_appender(
    path: &Path,
    rotation: Option<&str>,
) -> eyre::Result<tracing_appender::rolling::RollingFileAppender> {
    use tracing_appender::rolling::{self, Rotation};

    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
    let rotation = match rotation.unwrap_or("never") {
        "never" => Rotation::NEVER,
        "daily" => Rotation::DAILY,
        "hourly" => Rotation::HOURLY,
        other => eyre::bail!("logging.rotation must be never|daily|hourly, got {other:?}"),
    };
    rolling::RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(name.to_string_lossy().into_owned())
        .build(dir)
        .wrap_err_with(|| format!("opening log file {}", path.display()))
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init(json: bool, level: &str, logging: &shot_config::Logging) -> eyre::Result<()> {
    // An explicit --log-level beats the config file; "info" is the flag default.
    let level = match logging.level.as_deref() {
        Some(cfg_level) if level == "info" => cfg_level,
        _ => level,
    };
    let filter = build_env_filter(level)?;

    let file_layer = match logging.file.as_deref() {
        Some(path) => {
            let appender = file_appender(Path::new(path), logging.rotation.as_deref())?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init()
            .wrap_err("installing tracing subscriber")?;
    } else {
        let use_ansi = std::io::IsTerminal::is_terminal(&std::io::stderr());
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(use_ansi)
                    .with_target(false)
                    .compact(),
            )
            .try_init()
            .wrap_err("installing tracing subscriber")?;
    }
    Ok(())
}
