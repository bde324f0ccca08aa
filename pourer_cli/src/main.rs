mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::{Cli, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::Outcome;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: could not install error hooks: {e}");
    }

    let started = Instant::now();
    match run_cli(&cli) {
        Ok(outcome) => {
            let ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            if cli.json {
                println!(
                    "{}",
                    run::format_result_json(cli.cmd.name(), ms, &outcome.result)
                );
            } else {
                println!("{}", outcome.summary);
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!("{}", format_error_json(cli.cmd.name(), &err));
            }
            eprintln!("{}", humanize(&err));
            std::process::exit(exit_code_for_error(&err));
        }
    }
}

fn run_cli(cli: &Cli) -> Result<Outcome> {
    let mut cfg = load_config(cli.config.as_deref())?;
    if let Some(table) = &cli.pour_table {
        cfg.pour.table_csv = Some(table.clone());
        cfg.pour.buckets = None;
    }
    cfg.validate()?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    }) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler; runs cannot be interrupted");
    }

    run::execute(&cfg, &cli.cmd, shutdown)
}

fn load_config(path: Option<&Path>) -> Result<pourer_config::Config> {
    let Some(path) = path else {
        return Ok(pourer_config::Config::default());
    };
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    toml::from_str::<pourer_config::Config>(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))
}

/// Console layer (pretty or JSON, on stderr so stdout stays clean for
/// results) plus an optional JSON-lines file sink.
fn init_tracing(json: bool, level: Option<&str>, logging: &pourer_config::Logging) -> Result<()> {
    let level = level.or(logging.level.as_deref()).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_target(false).with_writer(std::io::stderr).boxed()
    };

    let file = match &logging.file {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                "never" => tracing_appender::rolling::never(dir, name),
                other => {
                    eyre::bail!("logging.rotation must be never, daily or hourly, got '{other}'")
                }
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("init tracing: {e}"))
}
