//! # Soft-Failure Outcomes
//!
//! Best-effort collaborator calls (link fetches, visual augmentation,
//! external planning) degrade instead of failing the run. `Soft<T>` makes
//! that degradation an explicit, testable outcome rather than a silently
//! swallowed error.

// =============================================================================
// SOFT OUTCOME TYPE
// =============================================================================

/// Outcome of a best-effort collaborator call.
///
/// A `Degraded` outcome means the collaborator failed or timed out and the
/// caller substitutes its documented fallback (empty text, fallback plan,
/// un-augmented unit). It is never an abort signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Soft<T> {
    /// The collaborator produced a usable value.
    Value(T),
    /// The collaborator failed; the caller falls back.
    Degraded,
}

impl<T> Soft<T> {
    /// Convert into `Option`, discarding the degradation marker.
    #[must_use]
    pub fn value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Degraded => None,
        }
    }

    /// Whether this outcome is a soft failure.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded)
    }

    /// Absorb a `Result` at the component boundary: `Err` is logged and
    /// becomes `Degraded`.
    pub fn absorb<E: std::fmt::Display>(result: Result<T, E>, context: &str) -> Self {
        match result {
            Ok(v) => Self::Value(v),
            Err(e) => {
                soft_warn(context, &e.to_string());
                Self::Degraded
            }
        }
    }
}

// =============================================================================
// STDERR WARNING HELPER
// =============================================================================

/// Log a soft failure without aborting.
///
/// The core avoids a tracing dependency to stay minimal; warnings go to
/// stderr as structured single-line JSON. The app layer may redirect stderr
/// into its own subscriber if needed.
pub(crate) fn soft_warn(context: &str, detail: &str) {
    eprintln!(
        "{{\"level\":\"warn\",\"target\":\"studyloop_core\",\"message\":\"soft failure in {}: {}\"}}",
        context, detail
    );
}

// =============================================================================
// TESTS
// =============================================================================
