//! Reference pulse generator that consumes planned blocks.
//!
//! Spreads each block's step events over the axes with a Bresenham
//! accumulator and runs the step rate along the block's trapezoid: every
//! acceleration tick the rate moves by `rate_delta` toward the phase the
//! current step index falls into. Pacing goes through a `Clock`, so the same
//! code runs in real time (`MonotonicClock`) or simulated (`VirtualClock`).
//!
//! Safety: each `Stepper` owns exactly one thread that is shut down and
//! joined when the `Stepper` is dropped.

use crossbeam_channel as xch;
use stepplan_traits::StepSink;
use stepplan_traits::clock::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::block::{AXES, Block};
use crate::error::Result;
use crate::ring::BlockConsumer;
use crate::sink_error::map_sink_error;
use crate::util::{MINIMUM_STEPS_PER_MINUTE, step_interval_us, tick_period_us};

/// How long the stepper thread waits for a block before re-checking shutdown.
const IDLE_POLL: Duration = Duration::from_millis(20);

/// What happened while one block was executed.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockReport {
    pub step_events: u32,
    /// Pulses emitted per axis
    pub pulses: [u32; AXES],
    pub direction_bits: u8,
    pub initial_rate: u32,
    pub peak_rate: u32,
    /// Rate in effect after the last step event
    pub final_rate: u32,
    /// Clock time spent on the block
    pub elapsed: Duration,
}

/// Rate for the next tick given how many step events are done.
fn tick_rate(block: &Block, rate: u32, completed: u32) -> u32 {
    if completed < block.accelerate_until {
        rate.saturating_add(block.rate_delta).min(block.nominal_rate)
    } else if completed >= block.decelerate_after {
        rate.saturating_sub(block.rate_delta)
            .max(MINIMUM_STEPS_PER_MINUTE)
    } else {
        block.nominal_rate
    }
}

/// Emit every step event of `block` on `sink`, pacing with `clock`.
pub fn execute_block<S, C>(
    block: &Block,
    ticks_per_second: u32,
    sink: &mut S,
    clock: &C,
) -> Result<BlockReport>
where
    S: StepSink + ?Sized,
    C: Clock + ?Sized,
{
    let total = block.step_event_count;
    let tick_us = tick_period_us(ticks_per_second) as f64;
    let epoch = clock.now();

    let mut counters = [-i64::from(total >> 1); AXES];
    let mut pulses = [0u32; AXES];
    let mut rate = block.initial_rate;
    let mut peak_rate = rate;
    let mut since_tick = 0.0f64;

    for completed in 1..=total {
        let mut step_bits = 0u8;
        for axis in 0..AXES {
            counters[axis] += i64::from(block.steps[axis]);
            if counters[axis] > 0 {
                counters[axis] -= i64::from(total);
                step_bits |= 1 << axis;
                pulses[axis] += 1;
            }
        }
        sink.pulse(step_bits, block.direction_bits)
            .map_err(|e| eyre::Report::new(map_sink_error(e.as_ref())))?;

        let interval = step_interval_us(rate);
        clock.sleep(Duration::from_nanos((interval * 1000.0).round() as u64));
        since_tick += interval;
        while since_tick >= tick_us {
            since_tick -= tick_us;
            rate = tick_rate(block, rate, completed);
            peak_rate = peak_rate.max(rate);
        }
    }

    Ok(BlockReport {
        step_events: total,
        pulses,
        direction_bits: block.direction_bits,
        initial_rate: block.initial_rate,
        peak_rate,
        final_rate: rate,
        elapsed: Duration::from_micros(clock.us_since(epoch)),
    })
}

pub struct Stepper {
    rx: xch::Receiver<BlockReport>,
    executed: Arc<AtomicU64>,
    /// Shutdown flag checked between blocks
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Stepper {
    /// Spawn a thread that executes blocks from `consumer` until dropped.
    ///
    /// A block whose sink fails is logged and released anyway so the
    /// producer never waits on a block that will not run.
    pub fn spawn<S: StepSink + Send + 'static, C: Clock + Send + Sync + 'static>(
        consumer: BlockConsumer,
        mut sink: S,
        ticks_per_second: u32,
        clock: C,
    ) -> Self {
        let (tx, rx) = xch::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let executed = Arc::new(AtomicU64::new(0));
        let executed_clone = executed.clone();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("Stepper thread received shutdown signal");
                    break;
                }
                let Some(block) = consumer.wait_current(IDLE_POLL) else {
                    continue;
                };

                match execute_block(&block, ticks_per_second, &mut sink, &clock) {
                    Ok(report) => {
                        consumer.discard_current();
                        executed_clone.fetch_add(1, Ordering::Relaxed);
                        // Receiver gone means nobody wants reports; keep draining.
                        let _ = tx.send(report);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "block execution failed; discarding block");
                        consumer.discard_current();
                    }
                }
            }
            tracing::trace!("Stepper thread exiting cleanly");
        });

        Self {
            rx,
            executed,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Reports of blocks finished since the last call.
    pub fn drain_reports(&self) -> Vec<BlockReport> {
        self.rx.try_iter().collect()
    }

    /// Wait up to `timeout` for the next finished block.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<BlockReport> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Number of blocks executed successfully.
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }
}

impl Drop for Stepper {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // Exits within IDLE_POLL when idle, otherwise after the block in flight.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("Stepper thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "Stepper thread panicked during shutdown");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::CountingSink;
    use crate::trapezoid::calculate_trapezoid;
    use stepplan_traits::VirtualClock;

    fn cruise(steps: [u32; AXES]) -> Block {
        let total = steps.iter().copied().max().unwrap_or(0);
        Block {
            steps,
            step_event_count: total,
            nominal_rate: 60_000,
            initial_rate: 60_000,
            decelerate_after: total,
            ..Block::default()
        }
    }

    #[test]
    fn bresenham_distributes_exact_counts() {
        let clock = VirtualClock::new();
        let mut sink = CountingSink::default();
        let report = execute_block(&cruise([1000, 333, 1]), 50, &mut sink, &clock).unwrap();
        assert_eq!(report.pulses, [1000, 333, 1]);
        assert_eq!(sink.counts(), [1000, 333, 1]);
        assert_eq!(sink.events(), 1000);
    }

    #[test]
    fn cruise_block_takes_nominal_time() {
        // 1000 steps at 60 000 steps/min = 1 s
        let clock = VirtualClock::new();
        let mut sink = CountingSink::default();
        let report = execute_block(&cruise([1000, 0, 0]), 50, &mut sink, &clock).unwrap();
        assert_eq!(report.peak_rate, 60_000);
        assert_eq!(report.final_rate, 60_000);
        let ms = report.elapsed.as_millis();
        assert!((999..=1001).contains(&ms), "elapsed {ms} ms");
    }

    #[test]
    fn tick_rate_follows_phases() {
        let b = Block {
            step_event_count: 100,
            nominal_rate: 10_000,
            rate_delta: 3000,
            accelerate_until: 20,
            decelerate_after: 80,
            ..Block::default()
        };
        assert_eq!(tick_rate(&b, 9000, 5), 10_000);
        assert_eq!(tick_rate(&b, 4000, 5), 7000);
        assert_eq!(tick_rate(&b, 4000, 50), 10_000);
        assert_eq!(tick_rate(&b, 10_000, 90), 7000);
        assert_eq!(tick_rate(&b, 2000, 90), MINIMUM_STEPS_PER_MINUTE);
        // The decelerate_after step itself already brakes.
        assert_eq!(tick_rate(&b, 10_000, 80), 7000);
    }

    #[test]
    fn wedge_blocks_never_reach_nominal_rate() {
        // From rest to rest with 3000 steps/min per tick: anything under
        // 400 steps has no cruise phase.
        for steps in 100..=300u32 {
            let mut b = Block {
                steps: [steps, 0, 0],
                step_event_count: steps,
                nominal_rate: 60_000,
                rate_delta: 3000,
                ..Block::default()
            };
            calculate_trapezoid(&mut b, 0.0, 0.0, 50);
            assert_eq!(b.accelerate_until, b.decelerate_after, "{steps} steps");

            let clock = VirtualClock::new();
            let mut sink = CountingSink::default();
            let report = execute_block(&b, 50, &mut sink, &clock).unwrap();
            assert!(
                report.peak_rate < b.nominal_rate,
                "{steps} steps peaked at {}",
                report.peak_rate
            );
        }
    }
}
