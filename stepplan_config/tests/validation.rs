use rstest::rstest;
use stepplan_config::load_toml;

const VALID: &str = r#"
[machine]
steps_per_mm = [80.0, 80.0, 400.0]
acceleration_mm_s2 = 50.0
max_jerk_mm_min = 400.0
acceleration_ticks_per_second = 50

[planner]
block_buffer_size = 18
acceleration_management = true

[stepper]
realtime = false

[logging]
level = "debug"
rotation = "daily"
"#;

#[test]
fn accepts_full_config() {
    let cfg = load_toml(VALID).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.machine.steps_per_mm, [80.0, 80.0, 400.0]);
    assert_eq!(cfg.planner.block_buffer_size, 18);
    assert_eq!(cfg.logging.level.as_deref(), Some("debug"));
}

#[rstest]
#[case("[machine]\nsteps_per_mm = [100.0, 0.0, 100.0]\n", "steps_per_mm.y must be > 0")]
#[case("[machine]\nsteps_per_mm = [100.0, 100.0, -1.0]\n", "steps_per_mm.z must be > 0")]
#[case("[machine]\nacceleration_mm_s2 = 0.0\n", "acceleration_mm_s2 must be > 0")]
#[case("[machine]\nmax_jerk_mm_min = -5.0\n", "max_jerk_mm_min must be >= 0")]
#[case("[machine]\nacceleration_ticks_per_second = 0\n", "acceleration_ticks_per_second must be > 0")]
#[case("[planner]\nblock_buffer_size = 1\n", "block_buffer_size must be >= 2")]
#[case("[planner]\nblock_buffer_size = 100000\n", "unreasonably large")]
fn rejects_degenerate_settings(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "expected '{needle}' in '{err}'"
    );
}

#[test]
fn zero_jerk_is_allowed() {
    let cfg = load_toml("[machine]\nmax_jerk_mm_min = 0.0\n").expect("parse TOML");
    cfg.validate().expect("zero jerk means stop at every junction");
}

#[test]
fn wrong_types_fail_to_parse() {
    assert!(load_toml("[planner]\nblock_buffer_size = \"many\"\n").is_err());
}
