//! `From` implementations bridging `stepplan_config` types to `stepplan_core` types.

use crate::config::PlannerSettings;

impl From<&stepplan_config::Config> for PlannerSettings {
    fn from(c: &stepplan_config::Config) -> Self {
        Self {
            steps_per_mm: c.machine.steps_per_mm,
            acceleration_mm_s2: c.machine.acceleration_mm_s2,
            max_jerk_mm_min: c.machine.max_jerk_mm_min,
            acceleration_ticks_per_second: c.machine.acceleration_ticks_per_second,
            block_buffer_size: c.planner.block_buffer_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_default_settings() {
        let cfg = stepplan_config::Config::default();
        assert_eq!(PlannerSettings::from(&cfg), PlannerSettings::default());
    }
}
