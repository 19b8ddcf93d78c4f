#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Look-ahead motion planner for step-driven machines.
//!
//! Linear moves go in through [`Planner::buffer_line`] and come out of
//! [`BlockConsumer`] as [`Block`]s with a velocity trapezoid: accelerate,
//! cruise, decelerate, all at one rated acceleration. Every append replans
//! the whole queue so junction speeds respect the jerk limit and nothing
//! brakes harder than the machine can.
//!
//! ## Architecture
//!
//! - **Kinematics**: constant-acceleration formulas (`kinematics` module)
//! - **Trapezoid**: per-block ramp points from entry/exit factors (`trapezoid`)
//! - **Look-ahead**: reverse/forward relaxation over queued blocks (`lookahead`)
//! - **Queue**: single-producer/single-consumer ring with backpressure
//!   (`Planner` producer, `BlockConsumer` consumer)
//! - **Stepper**: reference pulse generator driving a `StepSink` (`stepper`)
//!
//! ## Units
//!
//! Speeds are mm/min, step rates steps/min, acceleration mm/s² at the API
//! and mm/min² inside the planner.

pub mod block;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod error;
pub mod kinematics;
pub mod lookahead;
pub mod mocks;
pub mod planner;
mod ring;
pub mod sink_error;
pub mod status;
pub mod stepper;
pub mod trapezoid;
pub mod util;

pub use block::{AXES, Block, X_DIRECTION_BIT, Y_DIRECTION_BIT, Z_DIRECTION_BIT};
pub use builder::{Missing, PlannerBuilder, Set};
pub use config::PlannerSettings;
pub use error::{BuildError, PlannerError, Report, Result};
pub use planner::Planner;
pub use ring::BlockConsumer;
pub use status::LineStatus;
pub use stepper::{BlockReport, Stepper, execute_block};
