//! Errors returned by the remote run service.

/// Failure classes a remote operation can report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ApiErrorKind {
    /// The job does not exist (deleted or never created).
    #[display("Job not found: {}", _0)]
    NotFound(String),
    /// The job exists but belongs to another caller.
    #[display("Access denied: {}", _0)]
    Forbidden(String),
    /// The service holds a concurrency lock on the job.
    #[display("Conflict: {}", _0)]
    Conflict(String),
    /// Network or service failure; the call may succeed later.
    #[display("Transport failure: {}", _0)]
    Transport(String),
    /// The response could not be interpreted.
    #[display("Invalid response: {}", _0)]
    InvalidResponse(String),
}

impl ApiErrorKind {
    /// Whether a later identical call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_) | Self::Transport(_) | Self::InvalidResponse(_)
        )
    }
}

/// Remote operation error with location tracking.
///
/// # Examples
///
/// ```
/// use reelwright_error::{ApiError, ApiErrorKind};
///
/// let err = ApiError::new(ApiErrorKind::NotFound("job-1".into()));
/// assert!(err.is_not_found());
/// assert!(!err.is_transient());
/// assert!(format!("{}", err).contains("job-1"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("API Error: {} at line {} in {}", kind, line, file)]
pub struct ApiError {
    /// The specific error condition
    pub kind: ApiErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl ApiError {
    /// Create a new ApiError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ApiErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ApiErrorKind {
        &self.kind
    }

    /// Whether a later identical call may succeed.
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Whether the job no longer exists server-side.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ApiErrorKind::NotFound(_))
    }

    /// Whether the job belongs to another caller.
    pub fn is_forbidden(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Forbidden(_))
    }

    /// Whether the service reported a concurrency lock.
    pub fn is_conflict(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Conflict(_))
    }
}

impl From<ApiErrorKind> for ApiError {
    #[track_caller]
    fn from(kind: ApiErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Result type for remote operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
