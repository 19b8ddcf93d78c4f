//! Stepper thread lifecycle and end-to-end execution in virtual time.
//!
//! Verifies that:
//! - the thread executes every queued block and reports it
//! - a failing sink does not wedge the producer
//! - dropping the Stepper joins its thread, idle or not

use std::time::Duration;

use stepplan_core::mocks::{CountingSink, FailingSink, NullSink};
use stepplan_core::{Planner, PlannerSettings, Stepper, execute_block};
use stepplan_traits::VirtualClock;

const TICKS: u32 = 50;

#[test]
fn stepper_executes_all_blocks() {
    let (mut planner, consumer) = Planner::builder()
        .with_settings(PlannerSettings::default())
        .with_buffer_size(4)
        .build()
        .unwrap();
    let sink = CountingSink::default();
    let stepper = Stepper::spawn(consumer, sink.clone(), TICKS, VirtualClock::new());

    let moves = [[300, 0, 0], [0, 200, 0], [-300, -200, 0], [50, 50, 50], [0, 0, 10]];
    for steps in moves {
        let mm = steps
            .iter()
            .map(|s| f64::from(*s) / 100.0)
            .map(|d| d * d)
            .sum::<f64>()
            .sqrt();
        planner.buffer_line(steps, 500_000, mm).unwrap();
    }

    let mut reports = Vec::new();
    while reports.len() < moves.len() {
        match stepper.recv_timeout(Duration::from_secs(10)) {
            Some(r) => reports.push(r),
            None => panic!("stepper stalled after {} blocks", reports.len()),
        }
    }
    assert!(planner.is_empty());
    assert_eq!(stepper.executed(), 5);
    assert_eq!(sink.counts(), [650, 450, 60]);
    assert_eq!(reports[2].pulses, [300, 200, 0]);
    assert_eq!(reports[2].direction_bits, 0b011);
}

#[test]
fn failing_sink_still_releases_blocks() {
    let (mut planner, consumer) = Planner::builder()
        .with_settings(PlannerSettings::default())
        .build()
        .unwrap();
    let stepper = Stepper::spawn(consumer, FailingSink::after(10), TICKS, VirtualClock::new());
    planner.buffer_line([100, 0, 0], 100_000, 1.0).unwrap();
    planner.buffer_line([100, 0, 0], 100_000, 1.0).unwrap();

    assert!(planner.synchronize_timeout(Duration::from_secs(10)));
    assert_eq!(stepper.executed(), 0);
    assert!(stepper.drain_reports().is_empty());
}

#[test]
fn stepper_thread_exits_on_drop() {
    let (_planner, consumer) = Planner::builder()
        .with_settings(PlannerSettings::default())
        .build()
        .unwrap();
    let stepper = Stepper::spawn(consumer, NullSink, TICKS, VirtualClock::new());
    std::thread::sleep(Duration::from_millis(30));
    drop(stepper);
}

#[test]
fn ramped_block_runs_slower_than_cruise() {
    let (mut planner, consumer) = Planner::builder()
        .with_settings(PlannerSettings::default())
        .build()
        .unwrap();
    planner.buffer_line([1000, 0, 0], 1_000_000, 10.0).unwrap();
    let block = consumer.current().unwrap();

    let clock = VirtualClock::new();
    let mut sink = CountingSink::default();
    let report = execute_block(&block, TICKS, &mut sink, &clock).unwrap();

    assert_eq!(report.pulses, [1000, 0, 0]);
    assert_eq!(report.peak_rate, 60_000);
    assert!(report.final_rate < report.peak_rate);
    assert!(report.elapsed > Duration::from_secs(1));
    assert_eq!(clock.elapsed().as_micros(), report.elapsed.as_micros());
}

#[test]
fn sink_failure_surfaces_as_stepper_error() {
    let block = stepplan_core::Block {
        steps: [10, 0, 0],
        step_event_count: 10,
        nominal_rate: 60_000,
        initial_rate: 60_000,
        decelerate_after: 10,
        ..Default::default()
    };
    let err = execute_block(&block, TICKS, &mut FailingSink::after(3), &VirtualClock::new())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<stepplan_core::PlannerError>(),
        Some(stepplan_core::PlannerError::Stepper(_))
    ));
}
