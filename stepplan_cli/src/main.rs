#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `stepplan` binary: plan and execute move programs from the command line.

mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::Result;
use stepplan_config::Logging;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console goes to stderr (pretty or JSON); `[logging].file` adds a JSON-lines
/// file sink. `RUST_LOG` wins over `--log-level`, which wins over the config.
fn init_tracing(json: bool, cli_level: Option<&str>, logging: &Logging) {
    let level = cli_level
        .or(logging.level.as_deref())
        .unwrap_or("info")
        .to_string();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        );
    }

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "stepplan.log".into(), ToOwned::to_owned);
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        if let Ok(mut slot) = FILE_GUARD.lock() {
            *slot = Some(guard);
        }
        layers.push(fmt::layer().json().with_ansi(false).with_writer(writer).boxed());
    }

    // A second init (tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = match run::load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Still get console logs for the failure itself.
            init_tracing(cli.json, cli.log_level.as_deref(), &Logging::default());
            return Err(e);
        }
    };
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging);
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            moves,
            no_accel,
            realtime,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            if let Err(e) = ctrlc::set_handler(move || {
                flag.store(true, Ordering::Relaxed);
            }) {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            }
            let summary = run::run_program(&cfg, &moves, no_accel, realtime, shutdown)?;
            run::print_summary(&summary, cli.json);
        }
        Commands::Plan { moves } => {
            let blocks = run::plan_program(&cfg, &moves)?;
            run::print_blocks(&blocks, cli.json);
        }
        Commands::SelfCheck => {
            run::self_check(&cfg)?;
            if cli.json {
                println!("{}", serde_json::json!({ "self_check": "ok" }));
            } else {
                println!("self-check ok");
            }
        }
    }
    Ok(())
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let outcome = real_main(cli);
    if let Err(e) = &outcome {
        tracing::error!(error = %e, "command failed");
    }
    flush_file_log();

    if let Err(e) = outcome {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn flush_file_log() {
    if let Ok(mut slot) = FILE_GUARD.lock() {
        drop(slot.take());
    }
}
