//! Cold-start reattachment.

use reelwright_core::{CallerContext, JobHandle, JobId, ResumeAction};
use reelwright_error::ReelwrightResult;
use reelwright_interface::RunApi;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Decides which job, if any, a freshly started UI should attach to.
///
/// The caller's active job always wins. Without one, an explicitly requested
/// job id (from a deep link, say) is looked up and classified by phase.
#[derive(Debug)]
pub struct ResumptionResolver<A: ?Sized> {
    api: Arc<A>,
}

impl<A> ResumptionResolver<A>
where
    A: RunApi + ?Sized,
{
    /// Create a resolver backed by `api`.
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Resolve the job to resume for `caller`.
    ///
    /// Missing and foreign jobs are reported as [`ResumeAction::NotFound`]
    /// and [`ResumeAction::Forbidden`].
    ///
    /// # Errors
    ///
    /// Returns transport failures and malformed snapshots as errors so the
    /// caller can retry the whole resolution.
    #[instrument(skip(self, caller), fields(caller = %caller.caller_id()))]
    pub async fn resolve(
        &self,
        caller: &CallerContext,
        explicit_job_id: Option<&JobId>,
    ) -> ReelwrightResult<ResumeAction> {
        match self.api.get_active_job(caller).await {
            Ok(handle) => match self.api.get_status(handle.job_id()).await {
                Ok(snapshot) => {
                    snapshot.validate()?;
                    info!(job_id = %handle.job_id(), phase = %snapshot.phase(), "Attaching to active job");
                    if snapshot.phase().is_terminal() {
                        return Ok(ResumeAction::from_lookup(handle, snapshot));
                    }
                    return Ok(ResumeAction::Attach { handle, snapshot });
                }
                Err(e) if e.is_not_found() => {
                    debug!(job_id = %handle.job_id(), "Active job vanished before its status was read");
                }
                Err(e) => return Err(e.into()),
            },
            Err(e) if e.is_not_found() => debug!("No active job"),
            Err(e) => return Err(e.into()),
        }

        let Some(job_id) = explicit_job_id else {
            debug!("No job to resume");
            return Ok(ResumeAction::Idle);
        };

        match self.api.get_job_by_id(caller, job_id).await {
            Ok(snapshot) => {
                snapshot.validate()?;
                info!(job_id = %job_id, phase = %snapshot.phase(), "Resuming job by id");
                let handle = JobHandle::new(job_id.clone(), caller.caller_id().clone());
                Ok(ResumeAction::from_lookup(handle, snapshot))
            }
            Err(e) if e.is_not_found() => {
                info!(job_id = %job_id, "Requested job not found");
                Ok(ResumeAction::NotFound {
                    job_id: job_id.clone(),
                })
            }
            Err(e) if e.is_forbidden() => {
                info!(job_id = %job_id, "Requested job belongs to another caller");
                Ok(ResumeAction::Forbidden {
                    job_id: job_id.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
