#![no_main]
use libfuzzer_sys::arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Move {
    steps: [i32; 3],
    duration_us: u32,
    mm: f64,
}

fuzz_target!(|moves: Vec<Move>| {
    let (mut planner, consumer) = stepplan_core::Planner::builder()
        .with_settings(stepplan_core::PlannerSettings::default())
        .build()
        .unwrap();
    for m in moves {
        // Keep the producer from blocking on a full ring.
        if planner.is_full() {
            consumer.discard_current();
        }
        let _ = planner.buffer_line(m.steps, m.duration_us, m.mm);
        for b in planner.blocks() {
            assert!(b.accelerate_until <= b.decelerate_after);
            assert!(b.decelerate_after <= b.step_event_count);
            assert!((0.0..=1.0).contains(&b.entry_factor));
        }
    }
});
