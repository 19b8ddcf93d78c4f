//! Step sinks for tests, benches and dry runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use stepplan_traits::StepSink;

use crate::block::AXES;

type SinkResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Discards every pulse.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl StepSink for NullSink {
    fn pulse(&mut self, _step_bits: u8, _direction_bits: u8) -> SinkResult {
        Ok(())
    }
}

/// Counts pulses per axis and step events. Clones share their counters, so
/// one copy can move into a `Stepper` while another is inspected.
#[derive(Debug, Default, Clone)]
pub struct CountingSink {
    pulses: Arc<[AtomicU64; AXES]>,
    events: Arc<AtomicU64>,
}

impl CountingSink {
    pub fn counts(&self) -> [u64; AXES] {
        std::array::from_fn(|axis| self.pulses[axis].load(Ordering::Relaxed))
    }

    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }
}

impl StepSink for CountingSink {
    fn pulse(&mut self, step_bits: u8, _direction_bits: u8) -> SinkResult {
        for axis in 0..AXES {
            if step_bits & (1 << axis) != 0 {
                self.pulses[axis].fetch_add(1, Ordering::Relaxed);
            }
        }
        self.events.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Fails every pulse after the first `ok_pulses`.
#[derive(Debug, Clone, Copy)]
pub struct FailingSink {
    pub ok_pulses: u64,
    seen: u64,
}

impl FailingSink {
    pub fn after(ok_pulses: u64) -> Self {
        Self { ok_pulses, seen: 0 }
    }
}

impl StepSink for FailingSink {
    fn pulse(&mut self, _step_bits: u8, _direction_bits: u8) -> SinkResult {
        self.seen += 1;
        if self.seen > self.ok_pulses {
            return Err(Box::new(std::io::Error::other("step output fault")));
        }
        Ok(())
    }
}
