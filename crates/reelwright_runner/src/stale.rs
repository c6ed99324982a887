//! Wall-clock tracking of how long a job has sat in one sub-state.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use reelwright_core::JobId;
use reelwright_interface::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

/// How long a job has been observed in one sub-state.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct StaleWatch {
    /// Sub-state key, e.g. `generating_images.generating`.
    sub_state: String,
    /// First time the sub-state was observed.
    entered_sub_state_at: DateTime<Utc>,
    /// Nudges accepted while the sub-state was being watched.
    nudge_attempts: u32,
    #[getter(skip)]
    reported: bool,
}

impl StaleWatch {
    pub(crate) fn new(sub_state: impl Into<String>, entered_sub_state_at: DateTime<Utc>) -> Self {
        Self {
            sub_state: sub_state.into(),
            entered_sub_state_at,
            nudge_attempts: 0,
            reported: false,
        }
    }

    /// Time spent in the sub-state as of `now`.
    ///
    /// A clock that moved backwards yields zero.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.entered_sub_state_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Per-job stale watches.
///
/// The detector only measures; whether an elapsed time counts as stale is
/// decided by [`crate::AdvanceEvaluator`] against its configured threshold.
///
/// # Examples
///
/// ```
/// use reelwright_interface::ManualClock;
/// use reelwright_runner::StaleDetector;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = ManualClock::default();
/// let detector = StaleDetector::new(Arc::new(clock.clone()));
/// let job = "job-1".into();
///
/// detector.touch(&job, "generating_images.generating");
/// clock.advance(Duration::from_secs(30));
/// assert_eq!(detector.touch(&job, "generating_images.generating"), Duration::from_secs(30));
///
/// detector.clear(&job);
/// assert!(detector.watch(&job).is_none());
/// ```
pub struct StaleDetector {
    clock: Arc<dyn Clock>,
    watches: Mutex<HashMap<JobId, StaleWatch>>,
}

impl StaleDetector {
    /// Create a detector reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            watches: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, StaleWatch>> {
        self.watches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an observation of `sub_state` and return the time spent in it.
    ///
    /// A different sub-state than the one being watched restarts the watch.
    pub fn touch(&self, job_id: &JobId, sub_state: &str) -> Duration {
        let now = self.clock.now();
        let mut watches = self.lock();
        let watch = watches
            .entry(job_id.clone())
            .and_modify(|watch| {
                if watch.sub_state != sub_state {
                    debug!(job_id = %job_id, from = %watch.sub_state, to = sub_state, "Sub-state changed, restarting watch");
                    *watch = StaleWatch::new(sub_state, now);
                }
            })
            .or_insert_with(|| {
                trace!(job_id = %job_id, sub_state, "Watching sub-state");
                StaleWatch::new(sub_state, now)
            });
        watch.elapsed(now)
    }

    /// Current watch for a job.
    pub fn watch(&self, job_id: &JobId) -> Option<StaleWatch> {
        self.lock().get(job_id).cloned()
    }

    /// Count a nudge sent while the sub-state is watched.
    ///
    /// Returns the new attempt count, or `None` if nothing is watched.
    pub fn record_nudge(&self, job_id: &JobId) -> Option<u32> {
        let mut watches = self.lock();
        let watch = watches.get_mut(job_id)?;
        watch.nudge_attempts += 1;
        Some(watch.nudge_attempts)
    }

    /// Mark the watch as reported stalled.
    ///
    /// Returns `true` the first time only, so each watch is reported once.
    pub fn mark_reported(&self, job_id: &JobId) -> bool {
        match self.lock().get_mut(job_id) {
            Some(watch) if !watch.reported => {
                watch.reported = true;
                true
            }
            _ => false,
        }
    }

    /// Forget the job's watch.
    pub fn clear(&self, job_id: &JobId) {
        if self.lock().remove(job_id).is_some() {
            trace!(job_id = %job_id, "Cleared stale watch");
        }
    }
}

impl std::fmt::Debug for StaleDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaleDetector")
            .field("watched", &self.lock().len())
            .finish()
    }
}
