//! Constant-acceleration kinematics used by the planner.
//!
//! With s = speed, a = acceleration, d = distance:
//!
//! - distance to go from s1 to s2: `d = (s2² - s1²) / (2a)`
//! - speed after d from s: `sqrt(2ad + s²)`
//! - braking point when accelerating from s1 and braking to s2 within d,
//!   without a plateau: solve `sqrt(2a·di + s1²) = sqrt(2a·(d - di) + s2²)`,
//!   giving `di = (2ad - s1² + s2²) / (4a)`

use crate::block::Block;

/// Distance needed to change speed from `initial` to `target` at constant
/// `acceleration`. Pass a negative acceleration to model braking.
#[inline]
pub fn acceleration_distance(initial: f64, target: f64, acceleration: f64) -> f64 {
    debug_assert!(acceleration != 0.0, "acceleration_distance with a = 0");
    (target * target - initial * initial) / (2.0 * acceleration)
}

/// Point within `distance` at which acceleration from `initial` has to turn
/// into braking so that `final_speed` is hit exactly at `distance`.
///
/// ```text
///                    + <- peak we never cruise at
///                   /|\
///                  / | \
///                 /  |  + <- final_speed
///                /   |  |
///   initial ->  +----+--+
///                    ^  ^
///                    |  distance
///        intersection_distance
/// ```
#[inline]
pub fn intersection_distance(
    initial: f64,
    final_speed: f64,
    acceleration: f64,
    distance: f64,
) -> f64 {
    debug_assert!(acceleration != 0.0, "intersection_distance with a = 0");
    (2.0 * acceleration * distance - initial * initial + final_speed * final_speed)
        / (4.0 * acceleration)
}

/// Highest speed from which `target` can still be reached within `distance`
/// at `acceleration` (negative when braking).
///
/// A negative radicand means the caller asked for something unreachable;
/// that is a planner bug and trips a debug assertion.
#[inline]
pub fn max_allowable_speed(acceleration: f64, target: f64, distance: f64) -> f64 {
    let radicand = target * target - 2.0 * acceleration * distance;
    debug_assert!(
        radicand >= -1e-9,
        "max_allowable_speed: infeasible request (a={acceleration}, v={target}, d={distance})"
    );
    radicand.max(0.0).sqrt()
}

/// Speed discontinuity at the junction of two blocks, approximated as the
/// euclidean distance between their nominal velocity vectors.
#[inline]
pub fn junction_jerk(before: &Block, after: &Block) -> f64 {
    before
        .speed
        .iter()
        .zip(after.speed.iter())
        .map(|(b, a)| (b - a) * (b - a))
        .sum::<f64>()
        .sqrt()
}
