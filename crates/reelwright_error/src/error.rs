//! Top-level error wrapper types.

use crate::{ApiError, ConfigError, LoopError, SnapshotError};

/// Every error condition the workspace can surface.
///
/// # Examples
///
/// ```
/// use reelwright_error::{ReelwrightError, ConfigError};
///
/// let err: ReelwrightError = ConfigError::new("bad interval").into();
/// assert!(format!("{}", err).contains("Config Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ReelwrightErrorKind {
    /// Remote service error
    #[from(ApiError)]
    Api(ApiError),
    /// Malformed status snapshot
    #[from(SnapshotError)]
    Snapshot(SnapshotError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Poll loop lifecycle error
    #[from(LoopError)]
    Loop(LoopError),
}

/// Reelwright error with kind discrimination.
///
/// # Examples
///
/// ```
/// use reelwright_error::{ApiError, ApiErrorKind, ReelwrightErrorKind, ReelwrightResult};
///
/// fn lookup() -> ReelwrightResult<()> {
///     Err(ApiError::new(ApiErrorKind::Forbidden("job-7".into())))?
/// }
///
/// let err = lookup().unwrap_err();
/// assert!(matches!(err.kind(), ReelwrightErrorKind::Api(_)));
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Reelwright Error: {}", _0)]
pub struct ReelwrightError(Box<ReelwrightErrorKind>);

impl ReelwrightError {
    /// Create a new error from a kind.
    pub fn new(kind: ReelwrightErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ReelwrightErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to ReelwrightErrorKind
impl<T> From<T> for ReelwrightError
where
    T: Into<ReelwrightErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for reelwright operations.
pub type ReelwrightResult<T> = std::result::Result<T, ReelwrightError>;
