//! Type-state builder for the planner queue.
//!
//! `build()` only exists once settings were provided; `try_build()` is
//! always available and reports what is missing at runtime. Both return the
//! producer and consumer halves sharing one ring.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::PlannerSettings;
use crate::error::{BuildError, Result};
use crate::planner::Planner;
use crate::ring::{BlockConsumer, BlockRing};

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct PlannerBuilder<S> {
    settings: Option<PlannerSettings>,
    buffer_size: Option<usize>,
    acceleration_management: bool,
    _s: PhantomData<S>,
}

impl Default for PlannerBuilder<Missing> {
    fn default() -> Self {
        Self {
            settings: None,
            buffer_size: None,
            acceleration_management: true,
            _s: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidSettings(msg))
}

/// Validate settings and construct both halves of the queue.
///
/// Shared by `PlannerBuilder::try_build` and `build`.
pub fn validate_and_build(
    settings: PlannerSettings,
    acceleration_management: bool,
) -> Result<(Planner, BlockConsumer)> {
    if settings
        .steps_per_mm
        .iter()
        .any(|spm| !spm.is_finite() || *spm <= 0.0)
    {
        return Err(invalid("steps_per_mm must be finite and > 0"));
    }
    if !settings.acceleration_mm_s2.is_finite() || settings.acceleration_mm_s2 <= 0.0 {
        return Err(invalid("acceleration_mm_s2 must be finite and > 0"));
    }
    if !settings.max_jerk_mm_min.is_finite() || settings.max_jerk_mm_min < 0.0 {
        return Err(invalid("max_jerk_mm_min must be finite and >= 0"));
    }
    if settings.acceleration_ticks_per_second == 0 {
        return Err(invalid("acceleration_ticks_per_second must be > 0"));
    }
    if settings.block_buffer_size < 2 {
        return Err(invalid("block_buffer_size must be >= 2"));
    }

    let ring = Arc::new(BlockRing::new(
        settings.block_buffer_size,
        acceleration_management,
    ));
    tracing::debug!(
        capacity = settings.block_buffer_size,
        acceleration_management,
        "planner queue created"
    );
    Ok((
        Planner::new(ring.clone(), settings),
        BlockConsumer::new(ring),
    ))
}

impl<S> PlannerBuilder<S> {
    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<(Planner, BlockConsumer)> {
        let mut settings = self
            .settings
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSettings))?;
        if let Some(n) = self.buffer_size {
            settings.block_buffer_size = n;
        }
        validate_and_build(settings, self.acceleration_management)
    }

    /// Override `block_buffer_size` from the settings.
    pub fn with_buffer_size(mut self, slots: usize) -> Self {
        self.buffer_size = Some(slots);
        self
    }

    /// Start with acceleration shaping on (default) or off.
    pub fn acceleration_management(mut self, on: bool) -> Self {
        self.acceleration_management = on;
        self
    }
}

// Setters that advance type-state
impl PlannerBuilder<Missing> {
    pub fn with_settings(self, settings: PlannerSettings) -> PlannerBuilder<Set> {
        PlannerBuilder {
            settings: Some(settings),
            buffer_size: self.buffer_size,
            acceleration_management: self.acceleration_management,
            _s: PhantomData,
        }
    }
}

impl PlannerBuilder<Set> {
    pub fn build(self) -> Result<(Planner, BlockConsumer)> {
        self.try_build()
    }
}
