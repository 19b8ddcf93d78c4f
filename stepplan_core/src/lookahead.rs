//! Look-ahead relaxation over the queued blocks.
//!
//! Blocks are ordered oldest first. `recalculate` runs three passes:
//!
//! 1. Reverse (newest to oldest): pick an entry factor for every block so the
//!    junction jerk with its older neighbor stays within `max_jerk_mm_min`,
//!    and so no block has to brake harder than the rated acceleration to
//!    reach the entry speed of the block after it.
//! 2. Forward (oldest to newest): lower entry factors the older neighbor
//!    cannot actually accelerate up to within its own length.
//! 3. Recompute every trapezoid from the final entry factors.
//!
//! Afterwards all speed changes fit the one constant acceleration and no
//! junction is jerkier than the limit.

use crate::block::Block;
use crate::config::PlannerSettings;
use crate::kinematics::{junction_jerk, max_allowable_speed};
use crate::trapezoid::calculate_trapezoid;

/// Entry factor for `current` as seen from the reverse pass.
///
/// `older` is the block executed just before `current`; `exit_factor` is the
/// entry factor already chosen for the block after it. The oldest block has
/// no older neighbor and may abut a block that is already executing, so it
/// must start from rest.
pub fn reverse_entry_factor(
    older: Option<&Block>,
    current: &Block,
    exit_factor: f64,
    settings: &PlannerSettings,
) -> f64 {
    let Some(older) = older else {
        return 0.0;
    };

    let mut entry_factor = 1.0;
    let jerk = junction_jerk(older, current);
    if jerk > settings.max_jerk_mm_min {
        entry_factor = settings.max_jerk_mm_min / jerk;
    }

    // Braking through this block alone must be able to reach the exit speed.
    if entry_factor > exit_factor {
        let max_entry_speed = max_allowable_speed(
            -settings.acceleration_mm_min2(),
            current.nominal_speed * exit_factor,
            current.millimeters,
        );
        entry_factor = entry_factor.min(max_entry_speed / current.nominal_speed);
    }
    entry_factor
}

pub fn reverse_pass(blocks: &mut [Block], settings: &PlannerSettings) {
    for i in (0..blocks.len()).rev() {
        let exit_factor = blocks.get(i + 1).map_or(0.0, |next| next.entry_factor);
        let older = i.checked_sub(1).map(|j| blocks[j]);
        blocks[i].entry_factor =
            reverse_entry_factor(older.as_ref(), &blocks[i], exit_factor, settings);
    }
}

pub fn forward_pass(blocks: &mut [Block], settings: &PlannerSettings) {
    let acceleration = settings.acceleration_mm_min2();
    for i in 1..blocks.len() {
        let older = blocks[i - 1];
        let current = &mut blocks[i];
        // The older block's entry factor is where this block's speed ramp
        // effectively starts; check the older block is long enough to get here.
        if older.entry_factor < current.entry_factor {
            let max_entry_speed = max_allowable_speed(
                -acceleration,
                current.nominal_speed * older.entry_factor,
                older.millimeters,
            );
            current.entry_factor = current
                .entry_factor
                .min(max_entry_speed / current.nominal_speed);
        }
    }
}

pub fn recalculate_trapezoids(blocks: &mut [Block], ticks_per_second: u32) {
    for i in 0..blocks.len() {
        let exit_factor = blocks.get(i + 1).map_or(0.0, |next| next.entry_factor);
        let entry_factor = blocks[i].entry_factor;
        calculate_trapezoid(&mut blocks[i], entry_factor, exit_factor, ticks_per_second);
    }
}

/// Full look-ahead replan: reverse pass, forward pass, trapezoids.
pub fn recalculate(blocks: &mut [Block], settings: &PlannerSettings) {
    reverse_pass(blocks, settings);
    forward_pass(blocks, settings);
    recalculate_trapezoids(blocks, settings.acceleration_ticks_per_second);
    tracing::trace!(blocks = blocks.len(), "look-ahead recalculated");
}
