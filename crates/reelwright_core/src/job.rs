//! Job identity types.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Server-assigned identifier of a generation job.
///
/// # Examples
///
/// ```
/// use reelwright_core::JobId;
///
/// let id = JobId::from("job-42");
/// assert_eq!(id.as_str(), "job-42");
/// assert_eq!(id.to_string(), "job-42");
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Create a job id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity of the session asking about jobs.
///
/// The service allows at most one active job per caller.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display, Getters,
)]
#[display("{}", caller_id)]
pub struct CallerContext {
    /// Stable id of the caller (user or session).
    caller_id: String,
}

impl CallerContext {
    /// Create a caller context.
    pub fn new(caller_id: impl Into<String>) -> Self {
        Self {
            caller_id: caller_id.into(),
        }
    }
}

/// The job being tracked, together with the caller that owns it.
///
/// # Examples
///
/// ```
/// use reelwright_core::{CallerContext, JobHandle};
///
/// let caller = CallerContext::new("user-1");
/// let handle = JobHandle::new("job-9", caller.caller_id().clone());
/// assert_eq!(handle.job_id().as_str(), "job-9");
/// assert!(handle.is_owned_by(&caller));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
pub struct JobHandle {
    /// Job being tracked.
    job_id: JobId,
    /// Caller the job belongs to.
    owner_context_id: String,
}

impl JobHandle {
    /// Create a handle for a job owned by `owner_context_id`.
    pub fn new(job_id: impl Into<JobId>, owner_context_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            owner_context_id: owner_context_id.into(),
        }
    }

    /// Whether the handle belongs to `caller`.
    pub fn is_owned_by(&self, caller: &CallerContext) -> bool {
        self.owner_context_id == *caller.caller_id()
    }
}
