//! Status snapshot validation errors.

/// Specific ways a status snapshot can be malformed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum SnapshotErrorKind {
    /// The progress payload describes a different phase than the snapshot.
    #[display("Progress for '{}' reported while phase is '{}'", progress, phase)]
    PhaseMismatch {
        /// Phase reported by the snapshot
        phase: String,
        /// Phase the progress payload belongs to
        progress: String,
    },
    /// An error payload is present outside the failed phase.
    #[display("Error payload inconsistent with phase '{}'", _0)]
    ErrorPayload(String),
}

/// Snapshot validation error with location tracking.
///
/// # Examples
///
/// ```
/// use reelwright_error::{SnapshotError, SnapshotErrorKind};
///
/// let err = SnapshotError::new(SnapshotErrorKind::PhaseMismatch {
///     phase: "formatting".into(),
///     progress: "generating_audio".into(),
/// });
/// assert!(format!("{}", err).contains("generating_audio"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Snapshot Error: {} at line {} in {}", kind, line, file)]
pub struct SnapshotError {
    /// The specific error condition
    pub kind: SnapshotErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl SnapshotError {
    /// Create a new SnapshotError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: SnapshotErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
