//! Outcome of submitting a line to the planner.

/// What `Planner::buffer_line` did with a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    /// A block was appended and the queue replanned.
    Queued,
    /// The move had no steps on any axis and was dropped.
    ZeroLength,
}

impl LineStatus {
    pub fn is_queued(self) -> bool {
        matches!(self, LineStatus::Queued)
    }
}
