//! Common time/rate helpers for stepplan_core.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;
/// Number of microseconds in one minute; step rates are expressed per minute.
pub const MICROS_PER_MIN: f64 = 60.0 * 1_000_000.0;
/// Slowest step rate the pulse generator will run at (steps/min).
pub const MINIMUM_STEPS_PER_MINUTE: u32 = 1200;

/// Period of one acceleration tick in microseconds.
/// - Clamps `ticks_per_second` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn tick_period_us(ticks_per_second: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(ticks_per_second.max(1))).max(1)
}

/// Time between two step events at `steps_per_minute`, in microseconds.
/// Rates below [`MINIMUM_STEPS_PER_MINUTE`] are clamped up.
#[inline]
pub fn step_interval_us(steps_per_minute: u32) -> f64 {
    MICROS_PER_MIN / f64::from(steps_per_minute.max(MINIMUM_STEPS_PER_MINUTE))
}

/// `ceil` into `u32`, saturating on overflow and mapping NaN/negatives to 0.
#[inline]
pub(crate) fn ceil_u32(x: f64) -> u32 {
    if !x.is_finite() {
        return if x == f64::INFINITY { u32::MAX } else { 0 };
    }
    let c = x.ceil();
    if c <= 0.0 {
        0
    } else if c >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        c as u32
    }
}
