//! Serialization and debouncing of advance requests.
//!
//! Advance requests are not idempotent and can run for tens of seconds, so
//! the gate admits at most one in-flight request per job and enforces a
//! minimum spacing between the starts of accepted requests. Spacing is
//! measured with the injected [`Clock`], which keeps the gate deterministic
//! under a manual clock.

use chrono::{DateTime, Utc};
use reelwright_core::{AdvanceResult, JobHandle, JobId, NudgeOutcome, Phase};
use reelwright_error::ApiResult;
use reelwright_interface::{Clock, RunApi};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Whether a nudge may be sent now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may proceed.
    Accepted,
    /// Another request for the job has not returned yet.
    InFlight,
    /// The previous accepted request started too recently.
    Debounced {
        /// Time until the spacing window closes.
        retry_in: Duration,
    },
}

/// Result of passing a nudge through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResult {
    /// The gate dropped the request without calling the service.
    Skipped(Admission),
    /// The request ran to completion.
    Completed(NudgeOutcome),
}

#[derive(Debug, Default)]
struct GateSlot {
    in_flight: bool,
    last_accepted_at: Option<DateTime<Utc>>,
}

type Slots = Mutex<HashMap<JobId, GateSlot>>;

fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<JobId, GateSlot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-flight flag when the request finishes, however it finishes.
struct InFlightGuard<'a> {
    slots: &'a Slots,
    job_id: JobId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(slot) = lock(self.slots).get_mut(&self.job_id) {
            slot.in_flight = false;
        }
    }
}

/// Per-job advance request gate.
///
/// One gate is shared by every poll loop talking to the same service, so a
/// job is never nudged twice concurrently even if two loops watch it.
pub struct AdvanceGate<A: ?Sized> {
    api: Arc<A>,
    clock: Arc<dyn Clock>,
    min_spacing: Duration,
    slots: Slots,
}

impl<A> AdvanceGate<A>
where
    A: RunApi + ?Sized,
{
    /// Create a gate in front of `api`.
    pub fn new(api: Arc<A>, clock: Arc<dyn Clock>, min_spacing: Duration) -> Self {
        Self {
            api,
            clock,
            min_spacing,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Minimum spacing between accepted requests.
    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Try to reserve the right to nudge `job_id` now.
    ///
    /// An accepted admission marks the job in flight; the caller must release
    /// it, which [`AdvanceGate::request`] does automatically.
    fn admit(&self, job_id: &JobId) -> Admission {
        let now = self.clock.now();
        let mut slots = lock(&self.slots);
        let slot = slots.entry(job_id.clone()).or_default();

        if slot.in_flight {
            return Admission::InFlight;
        }
        if let Some(last) = slot.last_accepted_at {
            let since = (now - last).to_std().unwrap_or(Duration::ZERO);
            if since < self.min_spacing {
                return Admission::Debounced {
                    retry_in: self.min_spacing - since,
                };
            }
        }

        slot.in_flight = true;
        slot.last_accepted_at = Some(now);
        Admission::Accepted
    }

    /// Whether a request for the job is outstanding.
    pub fn is_in_flight(&self, job_id: &JobId) -> bool {
        lock(&self.slots).get(job_id).is_some_and(|slot| slot.in_flight)
    }

    /// Drop the job's spacing history.
    ///
    /// An outstanding request keeps its slot until it returns.
    pub fn forget(&self, job_id: &JobId) {
        let mut slots = lock(&self.slots);
        if slots.get(job_id).is_some_and(|slot| !slot.in_flight) {
            slots.remove(job_id);
        }
    }

    /// Send one advance request for the job if the gate admits it.
    #[instrument(skip(self, handle), fields(job_id = %handle.job_id()))]
    pub async fn request(&self, handle: &JobHandle) -> GateResult {
        let job_id = handle.job_id();
        match self.admit(job_id) {
            Admission::Accepted => {}
            skipped => {
                debug!(admission = ?skipped, "Nudge skipped by gate");
                return GateResult::Skipped(skipped);
            }
        }

        let _guard = InFlightGuard {
            slots: &self.slots,
            job_id: job_id.clone(),
        };

        debug!("Requesting advance");
        let outcome = classify(self.api.request_advance(job_id).await);
        info!(outcome = outcome.label(), "Advance request completed");
        GateResult::Completed(outcome)
    }
}

impl<A: ?Sized> std::fmt::Debug for AdvanceGate<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvanceGate")
            .field("min_spacing", &self.min_spacing)
            .field("jobs", &lock(&self.slots).len())
            .finish()
    }
}

/// Map an advance response to a nudge outcome.
///
/// A failed phase takes precedence over a transition, and a transition over
/// a repair.
pub fn classify(result: ApiResult<AdvanceResult>) -> NudgeOutcome {
    match result {
        Ok(result) if result.phase == Phase::Failed => NudgeOutcome::Failed {
            message: result
                .error
                .map(|failure| failure.message)
                .unwrap_or_else(|| "job failed".to_string()),
        },
        Ok(result) if result.is_transition() => NudgeOutcome::PhaseTransitioned {
            from: result.previous_phase,
            to: result.phase,
            reason: result.reason.unwrap_or_else(|| "advanced".to_string()),
        },
        Ok(result) if result.repaired => NudgeOutcome::StateRepaired,
        Ok(_) => NudgeOutcome::NoOp,
        Err(e) if e.is_conflict() => {
            debug!(error = %e, "Advance conflicted with a service-side lock");
            NudgeOutcome::Conflicted
        }
        Err(e) if e.is_not_found() => NudgeOutcome::Missing,
        Err(e) => {
            warn!(error = %e, "Advance request failed");
            NudgeOutcome::Errored {
                message: e.kind().to_string(),
            }
        }
    }
}
