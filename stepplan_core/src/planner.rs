//! Producer half of the planner queue.
//!
//! `buffer_line` turns a move into a [`Block`], appends it at head and
//! replans every queued block with the look-ahead passes. When the ring is
//! full it blocks until the consumer releases a slot.

use std::sync::Arc;
use std::time::Duration;

use crate::block::{AXES, Block, X_DIRECTION_BIT, Y_DIRECTION_BIT, Z_DIRECTION_BIT};
use crate::builder::{Missing, PlannerBuilder};
use crate::config::PlannerSettings;
use crate::error::{PlannerError, Result};
use crate::lookahead;
use crate::ring::BlockRing;
use crate::status::LineStatus;
use crate::trapezoid::calculate_trapezoid;
use crate::util::{MICROS_PER_MIN, ceil_u32};

const DIRECTION_BITS: [u8; AXES] = [X_DIRECTION_BIT, Y_DIRECTION_BIT, Z_DIRECTION_BIT];

pub struct Planner {
    ring: Arc<BlockRing>,
    settings: PlannerSettings,
    scratch: Vec<Block>,
}

impl core::fmt::Debug for Planner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Planner")
            .field("queued", &self.ring.len())
            .field("capacity", &self.ring.capacity())
            .field(
                "acceleration_management",
                &self.ring.acceleration_management(),
            )
            .finish()
    }
}

/// Build the block for one move without touching the queue.
///
/// Returns `Ok(None)` for a move with no steps on any axis.
pub fn new_block(
    steps: [i32; AXES],
    duration_us: u32,
    millimeters: f64,
    settings: &PlannerSettings,
) -> Result<Option<Block>> {
    let abs = steps.map(i32::unsigned_abs);
    let step_event_count = abs.iter().copied().max().unwrap_or(0);
    if step_event_count == 0 {
        return Ok(None);
    }
    if duration_us == 0 {
        return Err(eyre::Report::new(PlannerError::InvalidMove(
            "duration must be > 0 us".into(),
        )));
    }
    if !millimeters.is_finite() || millimeters <= 0.0 {
        return Err(eyre::Report::new(PlannerError::InvalidMove(format!(
            "path length must be finite and > 0 mm (got {millimeters})"
        ))));
    }

    let multiplier = MICROS_PER_MIN / f64::from(duration_us);
    let nominal_speed = millimeters * multiplier;
    if !nominal_speed.is_finite() {
        return Err(eyre::Report::new(PlannerError::InvalidMove(format!(
            "{millimeters} mm in {duration_us} us is not a representable speed"
        ))));
    }
    let mut speed = [0.0; AXES];
    let mut direction_bits = 0u8;
    for axis in 0..AXES {
        speed[axis] = f64::from(steps[axis]) * multiplier / settings.steps_per_mm[axis];
        if steps[axis] < 0 {
            direction_bits |= 1 << DIRECTION_BITS[axis];
        }
    }

    let travel_per_step = millimeters / f64::from(step_event_count);
    let accel_per_tick = settings.acceleration_mm_s2 * 60.0
        / f64::from(settings.acceleration_ticks_per_second);

    Ok(Some(Block {
        steps: abs,
        direction_bits,
        step_event_count,
        millimeters,
        speed,
        nominal_speed,
        nominal_rate: ceil_u32(f64::from(step_event_count) * multiplier),
        rate_delta: ceil_u32(accel_per_tick / travel_per_step),
        ..Block::default()
    }))
}

impl Planner {
    pub fn builder() -> PlannerBuilder<Missing> {
        PlannerBuilder::default()
    }

    pub(crate) fn new(ring: Arc<BlockRing>, settings: PlannerSettings) -> Self {
        let scratch = Vec::with_capacity(settings.block_buffer_size);
        Self {
            ring,
            settings,
            scratch,
        }
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    /// Empty the queue and turn acceleration shaping on.
    ///
    /// Must not race a consumer that is executing a block.
    pub fn init(&mut self) {
        self.ring.reset();
        self.ring.set_acceleration_management(true);
        tracing::debug!("planner reset");
    }

    /// Queue a linear move of `steps` (signed per-axis step counts) taking
    /// `duration_us` at cruise speed over `millimeters` of path.
    ///
    /// Blocks while the buffer is full.
    pub fn buffer_line(
        &mut self,
        steps: [i32; AXES],
        duration_us: u32,
        millimeters: f64,
    ) -> Result<LineStatus> {
        let head = self.ring.head();
        let next_head = self.ring.next_index(head);
        if next_head == self.ring.tail() {
            tracing::trace!("planner buffer full; waiting for consumer");
            self.ring.wait_until(|ring| ring.tail() != next_head);
        }

        let Some(mut block) = new_block(steps, duration_us, millimeters, &self.settings)? else {
            tracing::debug!(?steps, "zero-length move dropped");
            return Ok(LineStatus::ZeroLength);
        };

        let ticks = self.settings.acceleration_ticks_per_second;
        let shaping = self.ring.acceleration_management();
        if shaping {
            // Provisional from-rest profile until the look-ahead replans it.
            block.entry_factor = 0.0;
            calculate_trapezoid(&mut block, 0.0, 0.0, ticks);
        } else {
            block.rate_delta = 0;
            block.entry_factor = 1.0;
            calculate_trapezoid(&mut block, 1.0, 1.0, ticks);
        }
        self.ring.write(head, block);
        self.ring.publish_head(next_head);

        tracing::debug!(
            step_event_count = block.step_event_count,
            nominal_rate = block.nominal_rate,
            nominal_speed = block.nominal_speed,
            queued = self.ring.len(),
            "block queued"
        );

        if shaping {
            self.recalculate();
        }
        Ok(LineStatus::Queued)
    }

    /// Replan every queued block. Called after each append; exposed for
    /// callers that patch settings or need an explicit refresh.
    pub fn recalculate(&mut self) {
        let tail = self.ring.tail();
        let head = self.ring.head();

        self.scratch.clear();
        let mut index = tail;
        while index != head {
            self.scratch.push(self.ring.read(index));
            index = self.ring.next_index(index);
        }

        lookahead::recalculate(&mut self.scratch, &self.settings);

        let mut index = tail;
        for block in &self.scratch {
            self.ring.write(index, *block);
            index = self.ring.next_index(index);
        }
    }

    pub fn enable_acceleration_management(&mut self) {
        if !self.ring.acceleration_management() {
            self.synchronize();
            self.ring.set_acceleration_management(true);
            tracing::info!("acceleration management enabled");
        }
    }

    pub fn disable_acceleration_management(&mut self) {
        if self.ring.acceleration_management() {
            self.synchronize();
            self.ring.set_acceleration_management(false);
            tracing::info!("acceleration management disabled");
        }
    }

    pub fn acceleration_management(&self) -> bool {
        self.ring.acceleration_management()
    }

    /// Block until the consumer has drained the queue.
    pub fn synchronize(&self) {
        self.ring.wait_until(|ring| ring.is_empty());
    }

    /// Like [`synchronize`](Self::synchronize) but gives up after `timeout`.
    /// Returns true when the queue drained.
    pub fn synchronize_timeout(&self, timeout: Duration) -> bool {
        self.ring.wait_until_timeout(|ring| ring.is_empty(), timeout)
    }

    /// Copy of the queued blocks, oldest first.
    pub fn blocks(&self) -> Vec<Block> {
        let head = self.ring.head();
        let mut out = Vec::with_capacity(self.ring.len());
        let mut index = self.ring.tail();
        while index != head {
            out.push(self.ring.read(index));
            index = self.ring.next_index(index);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_fields_for_single_axis_move() {
        let settings = PlannerSettings::default();
        let b = new_block([1000, 0, 0], 1_000_000, 10.0, &settings)
            .unwrap()
            .unwrap();
        assert_eq!(b.step_event_count, 1000);
        assert_eq!(b.nominal_rate, 60_000);
        assert!((b.nominal_speed - 600.0).abs() < 1e-9);
        assert!((b.speed[0] - 600.0).abs() < 1e-9);
        assert_eq!(b.direction_bits, 0);
        // 25 mm/s² * 60 / 50 ticks = 30 mm/min per tick over 0.01 mm/step
        assert_eq!(b.rate_delta, 3000);
    }

    #[test]
    fn negative_steps_set_direction_and_sign() {
        let settings = PlannerSettings::default();
        let b = new_block([0, -200, 50], 1_000_000, 2.0, &settings)
            .unwrap()
            .unwrap();
        assert_eq!(b.steps, [0, 200, 50]);
        assert_eq!(b.direction_bits, 1 << Y_DIRECTION_BIT);
        assert!(b.speed[1] < 0.0);
        assert!(b.speed[2] > 0.0);
    }

    #[test]
    fn zero_steps_make_no_block() {
        let settings = PlannerSettings::default();
        assert!(new_block([0, 0, 0], 0, 0.0, &settings).unwrap().is_none());
    }

    #[test]
    fn bad_duration_or_length_rejected() {
        let settings = PlannerSettings::default();
        let e = new_block([10, 0, 0], 0, 1.0, &settings).unwrap_err();
        assert!(matches!(
            e.downcast_ref::<PlannerError>(),
            Some(PlannerError::InvalidMove(_))
        ));
        for mm in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(new_block([10, 0, 0], 1000, mm, &settings).is_err());
        }
    }
}
