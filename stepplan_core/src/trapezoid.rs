//! Velocity trapezoid for a single block.
//!
//! ```text
//!                                  +--------+   <- nominal_rate
//!                                 /          \
//! nominal_rate*entry_factor ->   +            \
//!                                |             + <- nominal_rate*exit_factor
//!                                +-------------+
//!                                    time -->
//! ```

use crate::block::Block;
use crate::kinematics::{acceleration_distance, intersection_distance};
use crate::util::ceil_u32;

/// Fill in `initial_rate`, `accelerate_until` and `decelerate_after` so the
/// block starts at `entry_factor` of its nominal rate.
///
/// Factors are fractions of `nominal_rate` in `[0, 1]`. When the block is too
/// short to reach cruise speed the profile collapses to a wedge with
/// `accelerate_until == decelerate_after`. A block without `rate_delta`
/// (shaping disabled) gets a flat profile.
pub fn calculate_trapezoid(
    block: &mut Block,
    entry_factor: f64,
    exit_factor: f64,
    ticks_per_second: u32,
) {
    debug_assert!((0.0..=1.0).contains(&entry_factor), "entry_factor {entry_factor}");
    debug_assert!((0.0..=1.0).contains(&exit_factor), "exit_factor {exit_factor}");
    let entry_factor = entry_factor.clamp(0.0, 1.0);

    let nominal = f64::from(block.nominal_rate);
    block.initial_rate = ceil_u32(nominal * entry_factor);
    // NOTE: derived from the entry factor, not `exit_factor`. Suspected defect
    // kept as-is; `final_rate_tracks_entry_factor` pins it.
    let final_rate = ceil_u32(nominal * entry_factor);

    let total = f64::from(block.step_event_count);
    let accel_per_minute = f64::from(block.rate_delta) * f64::from(ticks_per_second) * 60.0;
    if accel_per_minute <= 0.0 {
        block.accelerate_until = 0;
        block.decelerate_after = block.step_event_count;
        return;
    }

    let initial = f64::from(block.initial_rate);
    let final_rate = f64::from(final_rate);
    let mut accelerate = acceleration_distance(initial, nominal, accel_per_minute)
        .ceil()
        .max(0.0);
    let decelerate = acceleration_distance(nominal, final_rate, -accel_per_minute)
        .ceil()
        .max(0.0);
    let mut plateau = total - accelerate - decelerate;

    // Not enough room to cruise: brake where the two ramps meet.
    if plateau < 0.0 {
        accelerate = intersection_distance(initial, final_rate, accel_per_minute, total)
            .ceil()
            .clamp(0.0, total);
        plateau = 0.0;
    }

    block.accelerate_until = accelerate as u32;
    block.decelerate_after = (accelerate + plateau) as u32;
    tracing::trace!(
        initial_rate = block.initial_rate,
        nominal_rate = block.nominal_rate,
        accelerate_until = block.accelerate_until,
        decelerate_after = block.decelerate_after,
        "trapezoid"
    );
}
