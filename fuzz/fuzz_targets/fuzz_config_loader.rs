#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are fine; panics are not.
    if let Ok(cfg) = toml::from_str::<stepplan_config::Config>(data) {
        if cfg.validate().is_ok() {
            // A validated config must always produce a planner.
            let settings = stepplan_core::PlannerSettings::from(&cfg);
            let built = stepplan_core::Planner::builder()
                .with_settings(settings)
                .build();
            assert!(built.is_ok(), "validated config rejected by builder: {built:?}");
        }
    }
});
