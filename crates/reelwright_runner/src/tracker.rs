//! Registry of poll loops, one per tracked job.

use crate::{AdvanceGate, LoopStatus, PollLoop, ResumptionResolver, RunnerConfig};
use reelwright_core::{
    CallerContext, JobHandle, JobId, ResumeAction, RunEvent, StatusSnapshot, StopReason,
};
use reelwright_error::{ConfigError, LoopError, LoopErrorKind, ReelwrightResult};
use reelwright_interface::{Clock, RunApi};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, instrument};

/// Owns the poll loops of every job the UI is watching.
///
/// All loops share one [`AdvanceGate`], so a job is never nudged twice at
/// once, and tracking a job that is already being polled returns a new
/// subscription to the existing loop instead of starting a second one.
///
/// A loop that stops on its own is forgotten, along with its gate history.
/// Failed jobs are the exception: their loop is kept so the job can be
/// retried, until it is detached.
pub struct RunTracker<A: RunApi + ?Sized + 'static> {
    api: Arc<A>,
    clock: Arc<dyn Clock>,
    gate: Arc<AdvanceGate<A>>,
    resolver: ResumptionResolver<A>,
    config: RunnerConfig,
    loops: Arc<LoopMap<A>>,
}

type LoopMap<A> = RwLock<HashMap<JobId, Arc<PollLoop<A>>>>;

impl<A> RunTracker<A>
where
    A: RunApi + ?Sized + 'static,
{
    /// Create a tracker.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(api: Arc<A>, clock: Arc<dyn Clock>, config: RunnerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let gate = Arc::new(AdvanceGate::new(
            Arc::clone(&api),
            Arc::clone(&clock),
            config.nudge_min_spacing(),
        ));
        Ok(Self {
            resolver: ResumptionResolver::new(Arc::clone(&api)),
            api,
            clock,
            gate,
            config,
            loops: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Configuration shared by every loop.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Start polling a job and subscribe to its events.
    ///
    /// A job whose loop is already running keeps that loop; a stopped loop is
    /// replaced by a fresh one.
    #[instrument(skip(self, handle), fields(job_id = %handle.job_id()))]
    pub async fn track(&self, handle: JobHandle) -> ReelwrightResult<broadcast::Receiver<RunEvent>> {
        let mut loops = self.loops.write().await;

        if let Some(existing) = loops.get(handle.job_id()) {
            if existing.status().is_running() {
                debug!("Job already tracked, subscribing to existing loop");
                return Ok(existing.subscribe());
            }
        }

        let job_id = handle.job_id().clone();
        let poll_loop = Arc::new(PollLoop::with_gate(
            handle,
            Arc::clone(&self.api),
            Arc::clone(&self.clock),
            Arc::clone(&self.gate),
            &self.config,
        )?);
        let events = poll_loop.subscribe();
        self.release_on_stop(job_id.clone(), &poll_loop);
        poll_loop.start()?;

        if let Some(previous) = loops.insert(job_id, poll_loop) {
            debug!("Replacing stopped loop");
            previous.stop();
        }

        info!("Job tracked");
        Ok(events)
    }

    /// Forget `poll_loop` once it stops on its own for any reason but a
    /// failed job.
    fn release_on_stop(&self, job_id: JobId, poll_loop: &Arc<PollLoop<A>>) {
        let mut events = poll_loop.subscribe();
        let watched = Arc::downgrade(poll_loop);
        let loops = Arc::clone(&self.loops);
        let gate = Arc::clone(&self.gate);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(RunEvent::LoopStopped { reason, .. }) => match reason {
                        StopReason::Requested => return,
                        StopReason::JobFailed => continue,
                        _ => break,
                    },
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }

            let mut loops = loops.write().await;
            let current = loops.get(&job_id).is_some_and(|tracked| {
                is_same_loop(tracked, &watched) && !tracked.status().is_running()
            });
            if current {
                loops.remove(&job_id);
                gate.forget(&job_id);
                debug!(job_id = %job_id, "Released stopped loop");
            }
        });
    }

    /// Stop polling a job and forget it.
    ///
    /// # Errors
    ///
    /// Fails with `NotTracked` if the job has no loop.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn detach(&self, job_id: &JobId) -> ReelwrightResult<()> {
        let removed = self.loops.write().await.remove(job_id);
        let Some(poll_loop) = removed else {
            return Err(LoopError::new(LoopErrorKind::NotTracked(job_id.to_string())).into());
        };
        poll_loop.stop();
        self.gate.forget(job_id);
        info!("Job detached");
        Ok(())
    }

    /// Restart a failed job and resume polling it.
    ///
    /// # Errors
    ///
    /// Fails with `NotTracked` if the job has no loop, and otherwise as
    /// [`PollLoop::retry`].
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn retry(&self, job_id: &JobId) -> ReelwrightResult<StatusSnapshot> {
        let poll_loop = self
            .loops
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| LoopError::new(LoopErrorKind::NotTracked(job_id.to_string())))?;
        poll_loop.retry().await
    }

    /// Subscribe to a tracked job's events.
    pub async fn subscribe(&self, job_id: &JobId) -> Option<broadcast::Receiver<RunEvent>> {
        self.loops.read().await.get(job_id).map(|poll_loop| poll_loop.subscribe())
    }

    /// Lifecycle status of a tracked job's loop.
    pub async fn status(&self, job_id: &JobId) -> Option<LoopStatus> {
        self.loops.read().await.get(job_id).map(|poll_loop| poll_loop.status())
    }

    /// Latest snapshot of a tracked job.
    pub async fn snapshot(&self, job_id: &JobId) -> Option<StatusSnapshot> {
        self.loops
            .read()
            .await
            .get(job_id)
            .and_then(|poll_loop| poll_loop.snapshot())
    }

    /// Ids of every tracked job, sorted.
    pub async fn tracked(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.loops.read().await.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    /// Resolve the job to resume for `caller` and start polling it if needed.
    ///
    /// The returned receiver is present only when a loop was started or
    /// joined.
    ///
    /// # Errors
    ///
    /// Propagates resolution failures; see [`ResumptionResolver::resolve`].
    #[instrument(skip(self, caller), fields(caller = %caller.caller_id()))]
    pub async fn resume(
        &self,
        caller: &CallerContext,
        explicit_job_id: Option<&JobId>,
    ) -> ReelwrightResult<(ResumeAction, Option<broadcast::Receiver<RunEvent>>)> {
        let action = self.resolver.resolve(caller, explicit_job_id).await?;
        info!(kind = %action.kind(), "Resolved resume action");

        let events = match action.handle().filter(|_| action.should_poll()) {
            Some(handle) => Some(self.track(handle.clone()).await?),
            None => None,
        };
        Ok((action, events))
    }

    /// Stop every loop.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let mut loops = self.loops.write().await;
        for (_, poll_loop) in loops.drain() {
            poll_loop.stop();
        }
        info!("Run tracker shut down");
    }
}

fn is_same_loop<A>(tracked: &Arc<PollLoop<A>>, watched: &Weak<PollLoop<A>>) -> bool
where
    A: RunApi + ?Sized + 'static,
{
    std::ptr::eq(Arc::as_ptr(tracked), watched.as_ptr())
}

impl<A> std::fmt::Debug for RunTracker<A>
where
    A: RunApi + ?Sized + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunTracker")
            .field("config", &self.config)
            .field("gate", &self.gate)
            .finish()
    }
}
