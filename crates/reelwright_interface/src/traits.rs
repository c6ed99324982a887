//! Remote job service contract.

use async_trait::async_trait;
use reelwright_core::{AdvanceResult, CallerContext, JobHandle, JobId, StatusSnapshot};
use reelwright_error::ApiResult;

/// Operations the engine consumes from the remote job service.
///
/// Transport and wire format are up to the implementor; errors are reported
/// through [`reelwright_error::ApiErrorKind`] so the engine can tell a missing
/// job from a transient failure.
#[async_trait]
pub trait RunApi: Send + Sync {
    /// Fetch the current status of a job.
    ///
    /// Idempotent and side-effect free. Fails with `NotFound` once the job
    /// no longer exists.
    async fn get_status(&self, job_id: &JobId) -> ApiResult<StatusSnapshot>;

    /// Ask the service to move the job forward one step.
    ///
    /// Not idempotent: the call may synchronously generate one unit of work
    /// and take tens of seconds. Safe to call when nothing is due. Fails with
    /// `Conflict` while the service holds a lock on the job.
    async fn request_advance(&self, job_id: &JobId) -> ApiResult<AdvanceResult>;

    /// Look up the caller's active job, if any.
    ///
    /// At most one job per caller is active. Fails with `NotFound` when the
    /// caller has none.
    async fn get_active_job(&self, caller: &CallerContext) -> ApiResult<JobHandle>;

    /// Look up any job, active or historical, by id.
    ///
    /// Fails with `NotFound` for unknown ids and `Forbidden` for jobs owned
    /// by another caller.
    async fn get_job_by_id(
        &self,
        caller: &CallerContext,
        job_id: &JobId,
    ) -> ApiResult<StatusSnapshot>;

    /// Restart a failed job, returning its status after the restart.
    async fn retry_job(&self, job_id: &JobId) -> ApiResult<StatusSnapshot>;
}
