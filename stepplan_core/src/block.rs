//! The planned motion segment handed to the pulse generator.

/// Number of linear axes (X, Y, Z).
pub const AXES: usize = 3;

pub const X_DIRECTION_BIT: u8 = 0;
pub const Y_DIRECTION_BIT: u8 = 1;
pub const Z_DIRECTION_BIT: u8 = 2;

/// One linear move, its nominal speeds and its velocity trapezoid.
///
/// Step events are indexed from 0. The profile accelerates while
/// `index < accelerate_until`, cruises until `decelerate_after` and
/// decelerates from there to `step_event_count`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Block {
    /// Per-axis step counts (absolute)
    pub steps: [u32; AXES],
    /// Bit set = axis moves in the negative direction
    pub direction_bits: u8,
    /// Dominant axis step count; number of step events to emit
    pub step_event_count: u32,
    /// Euclidean path length
    pub millimeters: f64,
    /// Signed per-axis nominal velocity (mm/min)
    pub speed: [f64; AXES],
    /// Commanded cruise velocity (mm/min)
    pub nominal_speed: f64,
    /// Cruise step rate (steps/min)
    pub nominal_rate: u32,
    /// Step rate change per acceleration tick (steps/min per tick)
    pub rate_delta: u32,
    /// Fraction of `nominal_rate` the block starts at
    pub entry_factor: f64,
    /// Step rate at the first step event (steps/min)
    pub initial_rate: u32,
    pub accelerate_until: u32,
    pub decelerate_after: u32,
}

impl Block {
    /// True when `axis` travels toward negative coordinates.
    #[inline]
    pub fn is_reversed(&self, axis: usize) -> bool {
        axis < AXES && self.direction_bits & (1 << axis) != 0
    }

    /// Length of the cruise phase in step events.
    #[inline]
    pub fn plateau_steps(&self) -> u32 {
        self.decelerate_after.saturating_sub(self.accelerate_until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_bits_map_to_axes() {
        let b = Block {
            direction_bits: 1 << Y_DIRECTION_BIT,
            ..Block::default()
        };
        assert!(!b.is_reversed(X_DIRECTION_BIT as usize));
        assert!(b.is_reversed(Y_DIRECTION_BIT as usize));
        assert!(!b.is_reversed(Z_DIRECTION_BIT as usize));
        assert!(!b.is_reversed(7));
    }
}
