//! Poll loop and tracker lifecycle errors.

/// Specific lifecycle violations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum LoopErrorKind {
    /// `start` was called on a loop that is already running.
    #[display("Poll loop for job {} is already running", _0)]
    AlreadyRunning(String),
    /// A retry was requested while the job is not in the failed phase.
    #[display("Retry not allowed while job is in phase '{}'", _0)]
    RetryNotAllowed(String),
    /// No poll loop is tracking the job.
    #[display("Job {} is not tracked", _0)]
    NotTracked(String),
}

/// Lifecycle error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Loop Error: {} at line {} in {}", kind, line, file)]
pub struct LoopError {
    kind: LoopErrorKind,
    line: u32,
    file: &'static str,
}

impl LoopError {
    /// Create a new loop error with caller location tracking.
    #[track_caller]
    pub fn new(kind: LoopErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &LoopErrorKind {
        &self.kind
    }
}
