//! Runtime machine settings used by the planner.
//!
//! Separate from the TOML-deserialized config in `stepplan_config`; the
//! planner takes a snapshot at build time and never re-reads it.

use crate::block::AXES;

/// Seconds per minute squared: converts mm/s² into mm/min².
const S2_PER_MIN2: f64 = 3600.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerSettings {
    /// Steps per millimeter for X, Y, Z.
    pub steps_per_mm: [f64; AXES],
    /// Rated constant linear acceleration (mm/s²).
    pub acceleration_mm_s2: f64,
    /// Largest speed discontinuity allowed at a junction (mm/min).
    pub max_jerk_mm_min: f64,
    /// Rate at which the pulse generator updates its step rate.
    pub acceleration_ticks_per_second: u32,
    /// Ring capacity in slots. One slot always stays free, so at most
    /// `block_buffer_size - 1` blocks are queued.
    pub block_buffer_size: usize,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            steps_per_mm: [100.0; AXES],
            acceleration_mm_s2: 25.0,
            max_jerk_mm_min: 300.0,
            acceleration_ticks_per_second: 50,
            block_buffer_size: 16,
        }
    }
}

impl PlannerSettings {
    /// Acceleration in the planner's speed units (mm/min per minute).
    #[inline]
    pub fn acceleration_mm_min2(&self) -> f64 {
        self.acceleration_mm_s2 * S2_PER_MIN2
    }
}
