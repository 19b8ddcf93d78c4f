pub mod clock;

pub use clock::{Clock, MonotonicClock, VirtualClock};

/// Output stage of a step-pulse generator.
///
/// `step_bits` has one bit per axis that must step on this event (bit 0 = X,
/// bit 1 = Y, bit 2 = Z); `direction_bits` uses the same layout, a set bit
/// meaning negative travel.
pub trait StepSink {
    fn pulse(
        &mut self,
        step_bits: u8,
        direction_bits: u8,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: StepSink + ?Sized> StepSink for Box<T> {
    fn pulse(
        &mut self,
        step_bits: u8,
        direction_bits: u8,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).pulse(step_bits, direction_bits)
    }
}
