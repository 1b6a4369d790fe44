mod cli;
mod error_fmt;
mod hw;
mod logging;
mod server;
mod session;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use cli::{Cli, Commands, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use session::RunOverrides;
use shot_core::ShotError;

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        tracing::error!(error = %err, "shotctl failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn load_config(cli: &Cli) -> eyre::Result<shot_config::Config> {
    let loaded = match cli.config.as_deref() {
        Some(path) => shot_config::load_file(path),
        None => {
            let cfg = shot_config::Config::default();
            cfg.validate()
                .map(|()| cfg)
                .map_err(|e| eyre::eyre!("invalid built-in config: {e}"))
        }
    };
    loaded.map_err(|e| eyre::Report::new(ShotError::Config(format!("{e:#}"))))
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli)?;
    logging::init(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    match cli.cmd {
        Commands::Status => {
            println!("{}", session::initial_status(&cfg)?.to_json());
        }
        Commands::SelfCheck => {
            let (shots, delay) = session::initial_parameters(&cfg, None, None)?;
            let mut ctl = session::build_controller(&cfg, hw::make_hw(&cfg)?, shots, delay)?;
            let power_mw = session::probe(&mut ctl, cfg.sensor.probe_attempts)?;
            if cli.json {
                println!("{}", serde_json::json!({ "ok": true, "power_mw": power_mw }));
            } else {
                println!("ok: power sensor reads {power_mw:.1} mW");
            }
        }
        Commands::Run {
            bind,
            shots,
            delay_ms,
            start,
            legacy,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .map_err(|e| eyre::eyre!("install Ctrl-C handler: {e}"))?;

            let overrides = RunOverrides {
                bind,
                shots,
                delay_ms,
                start,
                legacy,
            };
            let summary = session::serve(&cfg, hw::make_hw(&cfg)?, &overrides, shutdown)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ticks": summary.ticks,
                        "shots_fired": summary.shots_fired,
                        "broadcasts": summary.broadcasts,
                        "sensor_read_errors": summary.sensor_read_errors,
                    })
                );
            } else {
                println!(
                    "stopped after {} ticks, {} shots fired",
                    summary.ticks, summary.shots_fired
                );
            }
        }
    }
    Ok(())
}
