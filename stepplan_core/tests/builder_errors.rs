use stepplan_core::error::BuildError;
use stepplan_core::{Planner, PlannerSettings};
use rstest::rstest;

#[rstest]
fn builder_missing_settings_yields_typed_build_error() {
    let err = Planner::builder()
        .with_buffer_size(8)
        .try_build()
        .expect_err("should fail with MissingSettings");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingSettings) => {}
        other => panic!("expected MissingSettings, got: {other:?}"),
    }
}

#[rstest]
#[case::zero_spm(PlannerSettings { steps_per_mm: [100.0, 0.0, 100.0], ..PlannerSettings::default() })]
#[case::nan_spm(PlannerSettings { steps_per_mm: [f64::NAN, 100.0, 100.0], ..PlannerSettings::default() })]
#[case::zero_accel(PlannerSettings { acceleration_mm_s2: 0.0, ..PlannerSettings::default() })]
#[case::negative_jerk(PlannerSettings { max_jerk_mm_min: -1.0, ..PlannerSettings::default() })]
#[case::zero_ticks(PlannerSettings { acceleration_ticks_per_second: 0, ..PlannerSettings::default() })]
#[case::one_slot(PlannerSettings { block_buffer_size: 1, ..PlannerSettings::default() })]
fn invalid_settings_rejected(#[case] settings: PlannerSettings) {
    let err = Planner::builder()
        .with_settings(settings)
        .build()
        .expect_err("should reject settings");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidSettings(_))
    ));
}

#[rstest]
fn buffer_size_override_applies() {
    let (planner, consumer) = Planner::builder()
        .with_settings(PlannerSettings::default())
        .with_buffer_size(4)
        .build()
        .unwrap();
    assert_eq!(planner.capacity(), 4);
    assert_eq!(consumer.capacity(), 4);
}

#[rstest]
fn buffer_size_override_is_validated() {
    let err = Planner::builder()
        .with_settings(PlannerSettings::default())
        .with_buffer_size(0)
        .build()
        .unwrap_err();
    assert!(err.downcast_ref::<BuildError>().is_some());
}

#[rstest]
fn zero_jerk_is_allowed() {
    let settings = PlannerSettings {
        max_jerk_mm_min: 0.0,
        ..PlannerSettings::default()
    };
    assert!(Planner::builder().with_settings(settings).build().is_ok());
}
