//! Command bodies: config loading, planning and execution on the reference stepper.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use stepplan_config::{Config, MoveRow};
use stepplan_core::error::Result as CoreResult;
use stepplan_core::mocks::CountingSink;
use stepplan_core::{
    AXES, Block, BlockConsumer, BlockReport, LineStatus, Planner, PlannerError, PlannerSettings,
    Stepper,
};
use stepplan_traits::clock::{Clock, MonotonicClock, VirtualClock};

/// How long to wait for a straggling block report once the queue drained.
const REPORT_GRACE: Duration = Duration::from_secs(1);

fn config_error(e: impl std::fmt::Display) -> eyre::Report {
    eyre::Report::new(PlannerError::Config(e.to_string()))
}

/// Read, parse and validate the TOML config.
pub fn load_config(path: &Path) -> CoreResult<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
    let cfg: Config = toml::from_str(&text).map_err(config_error)?;
    cfg.validate().map_err(config_error)?;
    Ok(cfg)
}

fn build_planner(cfg: &Config, shaping: bool) -> CoreResult<(Planner, BlockConsumer)> {
    Planner::builder()
        .with_settings(PlannerSettings::from(cfg))
        .acceleration_management(shaping)
        .build()
}

fn queue_move(planner: &mut Planner, idx: usize, m: &MoveRow) -> CoreResult<LineStatus> {
    // Row numbers count the header line, matching the CSV loader's errors.
    planner
        .buffer_line(m.steps(), m.duration_us, m.mm)
        .wrap_err_with(|| format!("move CSV row {}", idx + 2))
}

#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub moves: usize,
    pub queued: usize,
    pub zero_length: usize,
    pub interrupted: bool,
    pub step_events: u64,
    pub pulses: [u64; AXES],
    pub peak_rate: u32,
    pub elapsed: Duration,
    pub realtime: bool,
    pub acceleration_management: bool,
}

pub fn run_program(
    cfg: &Config,
    moves_path: &Path,
    no_accel: bool,
    realtime: bool,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunSummary> {
    let moves = stepplan_config::load_moves_csv(moves_path)?;
    let shaping = cfg.planner.acceleration_management && !no_accel;
    let realtime = realtime || cfg.stepper.realtime;
    let (planner, consumer) = build_planner(cfg, shaping)?;
    tracing::info!(
        moves = moves.len(),
        acceleration_management = shaping,
        realtime,
        "run start"
    );

    let mut summary = if realtime {
        execute(planner, consumer, &moves, MonotonicClock::new(), &shutdown)?
    } else {
        execute(planner, consumer, &moves, VirtualClock::new(), &shutdown)?
    };
    summary.realtime = realtime;
    summary.acceleration_management = shaping;
    tracing::info!(
        queued = summary.queued,
        step_events = summary.step_events,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "run complete"
    );
    Ok(summary)
}

fn execute<C: Clock + Send + Sync + 'static>(
    mut planner: Planner,
    consumer: BlockConsumer,
    moves: &[MoveRow],
    clock: C,
    shutdown: &AtomicBool,
) -> CoreResult<RunSummary> {
    let ticks = planner.settings().acceleration_ticks_per_second;
    let sink = CountingSink::default();
    let stepper = Stepper::spawn(consumer, sink.clone(), ticks, clock);

    let mut summary = RunSummary {
        moves: moves.len(),
        ..RunSummary::default()
    };
    for (idx, m) in moves.iter().enumerate() {
        if shutdown.load(Ordering::Relaxed) {
            tracing::warn!(remaining = moves.len() - idx, "interrupted; no further moves queued");
            summary.interrupted = true;
            break;
        }
        match queue_move(&mut planner, idx, m)? {
            LineStatus::Queued => summary.queued += 1,
            LineStatus::ZeroLength => summary.zero_length += 1,
        }
    }
    planner.synchronize();

    let mut reports: Vec<BlockReport> = stepper.drain_reports();
    while reports.len() < summary.queued {
        match stepper.recv_timeout(REPORT_GRACE) {
            Some(r) => reports.push(r),
            None => break,
        }
    }
    if reports.len() < summary.queued {
        return Err(eyre::Report::new(PlannerError::Stepper(format!(
            "{} of {} blocks did not execute",
            summary.queued - reports.len(),
            summary.queued
        ))));
    }

    summary.pulses = sink.counts();
    for r in &reports {
        summary.step_events += u64::from(r.step_events);
        summary.peak_rate = summary.peak_rate.max(r.peak_rate);
        summary.elapsed += r.elapsed;
    }
    Ok(summary)
}

/// Plan as much of the program as fits in the buffer, without executing.
pub fn plan_program(cfg: &Config, moves_path: &Path) -> CoreResult<Vec<Block>> {
    let moves = stepplan_config::load_moves_csv(moves_path)?;
    let (mut planner, _consumer) = build_planner(cfg, cfg.planner.acceleration_management)?;
    for (idx, m) in moves.iter().enumerate() {
        if planner.is_full() {
            tracing::warn!(
                planned = idx,
                remaining = moves.len() - idx,
                capacity = planner.capacity(),
                "program longer than the planner buffer; rest not planned"
            );
            break;
        }
        queue_move(&mut planner, idx, m)?;
    }
    Ok(planner.blocks())
}

/// Config is valid and a planner can be built from it.
pub fn self_check(cfg: &Config) -> CoreResult<()> {
    let (planner, _consumer) = build_planner(cfg, cfg.planner.acceleration_management)?;
    tracing::debug!(?planner, "self-check planner built");
    Ok(())
}

pub fn print_summary(s: &RunSummary, json: bool) {
    if json {
        let obj = serde_json::json!({
            "moves": s.moves,
            "queued": s.queued,
            "zero_length": s.zero_length,
            "interrupted": s.interrupted,
            "step_events": s.step_events,
            "pulses": { "x": s.pulses[0], "y": s.pulses[1], "z": s.pulses[2] },
            "peak_rate": s.peak_rate,
            "elapsed_ms": s.elapsed.as_secs_f64() * 1000.0,
            "realtime": s.realtime,
            "acceleration_management": s.acceleration_management,
        });
        println!("{obj}");
        return;
    }
    println!(
        "run complete: {} blocks ({} zero-length dropped), {} step events",
        s.queued, s.zero_length, s.step_events
    );
    println!(
        "pulses: x={} y={} z={}  peak rate {} steps/min  {} time {:.3}s",
        s.pulses[0],
        s.pulses[1],
        s.pulses[2],
        s.peak_rate,
        if s.realtime { "wall" } else { "virtual" },
        s.elapsed.as_secs_f64()
    );
    if s.interrupted {
        println!("interrupted before the end of the program");
    }
}

pub fn print_blocks(blocks: &[Block], json: bool) {
    if json {
        let rows: Vec<_> = blocks
            .iter()
            .map(|b| {
                serde_json::json!({
                    "steps": b.steps,
                    "direction_bits": b.direction_bits,
                    "step_event_count": b.step_event_count,
                    "nominal_rate": b.nominal_rate,
                    "rate_delta": b.rate_delta,
                    "entry_factor": b.entry_factor,
                    "initial_rate": b.initial_rate,
                    "accelerate_until": b.accelerate_until,
                    "decelerate_after": b.decelerate_after,
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(rows));
        return;
    }
    println!(
        "{:>3}  {:>20}  {:>3}  {:>8}  {:>6}  {:>8}  {:>11}  {:>11}",
        "#", "steps", "dir", "nominal", "entry", "initial", "accel_until", "decel_after"
    );
    for (i, b) in blocks.iter().enumerate() {
        println!(
            "{:>3}  {:>20}  {:03b}  {:>8}  {:>6.3}  {:>8}  {:>11}  {:>11}",
            i,
            format!("{:?}", b.steps),
            b.direction_bits,
            b.nominal_rate,
            b.entry_factor,
            b.initial_rate,
            b.accelerate_until,
            b.decelerate_after
        );
    }
}
