//! Maps `Box<dyn Error>` from the `StepSink` boundary to a typed `PlannerError`.

use crate::error::PlannerError;

/// Map a sink error to `PlannerError`.
///
/// A sink that already speaks `PlannerError` is passed through; anything
/// else becomes a stepper fault, with a closed channel treated as a
/// disconnected consumer.
pub fn map_sink_error(e: &(dyn std::error::Error + Send + Sync + 'static)) -> PlannerError {
    if let Some(p) = e.downcast_ref::<PlannerError>() {
        return p.clone();
    }
    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        if matches!(
            io.kind(),
            std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotConnected
        ) {
            return PlannerError::Disconnected;
        }
    }
    PlannerError::Stepper(e.to_string())
}
