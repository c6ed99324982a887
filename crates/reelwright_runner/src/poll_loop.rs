//! Per-job polling state machine.
//!
//! A [`PollLoop`] fetches the job's status on a fixed period, publishes every
//! snapshot and phase change to its subscribers, asks the
//! [`AdvanceEvaluator`] whether the job is due a nudge, and sends nudges
//! through the shared [`AdvanceGate`]. It stops on its own when the job fails,
//! is canceled, disappears, or finishes with no video left to wait for.
//!
//! Fetches never overlap: a tick that fires while the previous fetch is still
//! outstanding is skipped. Responses that arrive after the loop stopped or
//! restarted are discarded, and so is a snapshot older than a phase a nudge
//! already moved the job into.

use crate::decision::IMAGES_GENERATING;
use crate::{AdvanceEvaluator, AdvanceGate, AdvanceReason, GateResult, RunnerConfig, StaleDetector};
use chrono::{DateTime, Utc};
use reelwright_core::{
    ConfirmedConfig, JobHandle, JobId, NudgeOutcome, Phase, PhaseProgress, RunEvent,
    StatusSnapshot, StepState, StopReason, VideoSubState,
};
use reelwright_error::{ApiResult, ConfigError, LoopError, LoopErrorKind, ReelwrightResult};
use reelwright_interface::{Clock, RunApi};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, trace, warn};

/// Lifecycle of a poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    /// Created, never started.
    Idle,
    /// Ticking.
    Running,
    /// Stopped; may be restarted.
    Stopped(StopReason),
}

impl LoopStatus {
    /// Whether the loop is ticking.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

#[derive(Debug)]
struct LoopState {
    status: LoopStatus,
    generation: u64,
    poll_in_flight: bool,
    nudging_enabled: bool,
    last_phase: Option<Phase>,
    nudged_phase: Option<Phase>,
    last_snapshot: Option<StatusSnapshot>,
    confirmed_config: Option<ConfirmedConfig>,
    ready_off_since: Option<DateTime<Utc>>,
    consecutive_failures: u32,
    last_success_at: Option<DateTime<Utc>>,
}

impl LoopState {
    fn new() -> Self {
        Self {
            status: LoopStatus::Idle,
            generation: 0,
            poll_in_flight: false,
            nudging_enabled: true,
            last_phase: None,
            nudged_phase: None,
            last_snapshot: None,
            confirmed_config: None,
            ready_off_since: None,
            consecutive_failures: 0,
            last_success_at: None,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.status.is_running()
    }
}

struct LoopShared<A: ?Sized> {
    handle: JobHandle,
    api: Arc<A>,
    clock: Arc<dyn Clock>,
    gate: Arc<AdvanceGate<A>>,
    stale: StaleDetector,
    evaluator: AdvanceEvaluator,
    poll_interval: Duration,
    video_grace: Duration,
    events: broadcast::Sender<RunEvent>,
    state: Mutex<LoopState>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<A> LoopShared<A>
where
    A: RunApi + ?Sized + 'static,
{
    fn state(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn job_id(&self) -> &JobId {
        self.handle.job_id()
    }

    fn emit(&self, event: RunEvent) {
        if self.events.send(event).is_err() {
            trace!(job_id = %self.job_id(), "No subscribers for run event");
        }
    }

    fn start_locked(self: &Arc<Self>, state: &mut LoopState) -> Result<(), LoopError> {
        if state.status.is_running() {
            return Err(LoopError::new(LoopErrorKind::AlreadyRunning(
                self.job_id().to_string(),
            )));
        }

        self.begin_generation(state);
        Ok(())
    }

    /// Enter `Running` under a new generation, replacing the timer.
    ///
    /// Fetches and nudges issued under the previous generation are discarded
    /// when they complete.
    fn begin_generation(self: &Arc<Self>, state: &mut LoopState) {
        state.status = LoopStatus::Running;
        state.generation += 1;
        state.poll_in_flight = false;
        state.nudging_enabled = true;
        state.nudged_phase = None;
        state.ready_off_since = None;

        let generation = state.generation;
        let shared = Arc::clone(self);
        let timer = tokio::spawn(async move { shared.run_timer(generation).await });

        let mut slot = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(timer) {
            previous.abort();
        }

        info!(job_id = %self.job_id(), generation, interval = ?self.poll_interval, "Poll loop started");
    }

    fn halt(&self, state: &mut LoopState, reason: StopReason) {
        if !state.status.is_running() {
            return;
        }

        state.status = LoopStatus::Stopped(reason);
        state.poll_in_flight = false;
        if let Some(timer) = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            timer.abort();
        }
        self.stale.clear(self.job_id());

        info!(job_id = %self.job_id(), %reason, "Poll loop stopped");
        self.emit(RunEvent::LoopStopped {
            job_id: self.job_id().clone(),
            reason,
        });
    }

    async fn run_timer(self: Arc<Self>, generation: u64) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !self.state().is_current(generation) {
                break;
            }
            let shared = Arc::clone(&self);
            tokio::spawn(async move { shared.poll_once(generation).await });
        }
    }

    async fn poll_once(self: Arc<Self>, generation: u64) {
        {
            let mut state = self.state();
            if !state.is_current(generation) {
                return;
            }
            if state.poll_in_flight {
                trace!(job_id = %self.job_id(), "Previous fetch outstanding, skipping tick");
                return;
            }
            state.poll_in_flight = true;
        }

        let fetched = self.api.get_status(self.job_id()).await;
        let now = self.clock.now();

        let nudge = {
            let mut state = self.state();
            if !state.is_current(generation) {
                debug!(job_id = %self.job_id(), "Discarding status that arrived after stop");
                return;
            }
            state.poll_in_flight = false;
            self.apply(&mut state, fetched, now)
        };

        if let Some(stale) = nudge {
            self.spawn_nudge(generation, stale);
        }
    }

    /// Fold one fetch result into the loop state.
    ///
    /// Returns `Some(stale)` when a nudge is due, where `stale` marks a nudge
    /// sent to recover an orphaned sub-state.
    fn apply(
        &self,
        state: &mut LoopState,
        fetched: ApiResult<StatusSnapshot>,
        now: DateTime<Utc>,
    ) -> Option<bool> {
        let job_id = self.job_id();

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_not_found() => {
                info!(job_id = %job_id, "Job no longer exists");
                self.halt(state, StopReason::JobMissing);
                return None;
            }
            Err(e) => {
                self.record_failure(state, e.kind().to_string());
                return None;
            }
        };
        if let Err(e) = snapshot.validate() {
            self.record_failure(state, e.kind.to_string());
            return None;
        }

        state.consecutive_failures = 0;
        state.last_success_at = Some(now);

        let phase = *snapshot.phase();
        if let Some(nudged) = state.nudged_phase {
            if phase < nudged {
                debug!(job_id = %job_id, %phase, %nudged, "Discarding snapshot fetched before the last nudge");
                return None;
            }
            state.nudged_phase = None;
        }
        self.emit(RunEvent::SnapshotUpdated {
            snapshot: snapshot.clone(),
        });

        match state.last_phase {
            Some(previous) if previous != phase => {
                debug!(job_id = %job_id, from = %previous, to = %phase, "Observed phase change");
                self.stale.clear(job_id);
                self.emit(RunEvent::PhaseTransitioned {
                    job_id: job_id.clone(),
                    from: previous,
                    to: phase,
                    reason: "observed".to_string(),
                });
            }
            _ => {}
        }
        state.last_phase = Some(phase);
        lock_confirmed_config(state, job_id, &snapshot);

        let nudge = match snapshot.progress() {
            PhaseProgress::Failed => {
                self.halt(state, StopReason::JobFailed);
                None
            }
            PhaseProgress::Canceled => {
                self.halt(state, StopReason::JobCanceled);
                None
            }
            PhaseProgress::Ready { video } => {
                self.stale.clear(job_id);
                self.check_video(state, *video, now);
                None
            }
            progress => {
                state.ready_off_since = None;
                match progress {
                    PhaseProgress::GeneratingImages(images)
                        if images.generating > 0 && images.state != StepState::Done =>
                    {
                        self.stale.touch(job_id, IMAGES_GENERATING);
                    }
                    _ => self.stale.clear(job_id),
                }

                let watch = self.stale.watch(job_id);
                let decision = self.evaluator.decide(&snapshot, watch.as_ref(), now);
                let stale = decision.reason == AdvanceReason::StaleGenerating;
                if let Some(watch) = watch.filter(|_| stale) {
                    if self.stale.mark_reported(job_id) {
                        let elapsed = watch.elapsed(now);
                        warn!(job_id = %job_id, sub_state = %watch.sub_state(), ?elapsed, "Sub-state stalled");
                        self.emit(RunEvent::StalledDetected {
                            job_id: job_id.clone(),
                            sub_state: watch.sub_state().clone(),
                            elapsed_secs: elapsed.as_secs(),
                        });
                    }
                }

                debug!(
                    job_id = %job_id,
                    phase = %phase,
                    advance = decision.advance,
                    reason = %decision.reason,
                    "Advance decision"
                );
                (decision.advance && state.nudging_enabled).then_some(stale)
            }
        };

        state.last_snapshot = Some(snapshot);
        nudge
    }

    fn record_failure(&self, state: &mut LoopState, message: String) {
        state.consecutive_failures += 1;
        warn!(
            job_id = %self.job_id(),
            consecutive_failures = state.consecutive_failures,
            error = %message,
            "Status fetch failed"
        );
        self.emit(RunEvent::FetchFailed {
            job_id: self.job_id().clone(),
            consecutive_failures: state.consecutive_failures,
            message,
        });
    }

    fn check_video(&self, state: &mut LoopState, video: VideoSubState, now: DateTime<Utc>) {
        match video {
            VideoSubState::Done | VideoSubState::Failed => {
                self.halt(state, StopReason::VideoSettled);
            }
            VideoSubState::Off => {
                let since = *state.ready_off_since.get_or_insert(now);
                let waited = (now - since).to_std().unwrap_or(Duration::ZERO);
                if waited >= self.video_grace {
                    self.halt(state, StopReason::VideoGraceElapsed);
                } else {
                    trace!(job_id = %self.job_id(), ?waited, "Ready without video, waiting for a late request");
                }
            }
            VideoSubState::Pending | VideoSubState::Running { .. } => {
                state.ready_off_since = None;
            }
        }
    }

    fn spawn_nudge(self: &Arc<Self>, generation: u64, stale: bool) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            match shared.gate.request(&shared.handle).await {
                GateResult::Skipped(admission) => {
                    trace!(job_id = %shared.job_id(), ?admission, "Nudge not sent");
                }
                GateResult::Completed(outcome) => {
                    if stale {
                        if let Some(attempts) = shared.stale.record_nudge(shared.job_id()) {
                            debug!(job_id = %shared.job_id(), attempts, "Nudged stalled sub-state");
                        }
                    }
                    shared.on_nudge(generation, outcome);
                }
            }
        });
    }

    fn on_nudge(&self, generation: u64, outcome: NudgeOutcome) {
        let job_id = self.job_id();
        let mut state = self.state();
        if !state.is_current(generation) {
            debug!(job_id = %job_id, outcome = outcome.label(), "Discarding nudge outcome after stop");
            return;
        }

        self.emit(RunEvent::NudgeCompleted {
            job_id: job_id.clone(),
            outcome: outcome.clone(),
        });

        match outcome {
            NudgeOutcome::NoOp | NudgeOutcome::Conflicted | NudgeOutcome::Errored { .. } => {}
            NudgeOutcome::StateRepaired => {
                self.stale.clear(job_id);
            }
            NudgeOutcome::PhaseTransitioned { from, to, reason } => {
                self.stale.clear(job_id);
                state.nudged_phase = Some(to);
                if state.last_phase != Some(to) {
                    state.last_phase = Some(to);
                    self.emit(RunEvent::PhaseTransitioned {
                        job_id: job_id.clone(),
                        from,
                        to,
                        reason,
                    });
                }
            }
            NudgeOutcome::Failed { message } => {
                warn!(job_id = %job_id, error = %message, "Job failed, automatic nudging disabled");
                state.nudging_enabled = false;
                state.nudged_phase = Some(Phase::Failed);
                if let Some(from) = state.last_phase.filter(|phase| *phase != Phase::Failed) {
                    state.last_phase = Some(Phase::Failed);
                    self.emit(RunEvent::PhaseTransitioned {
                        job_id: job_id.clone(),
                        from,
                        to: Phase::Failed,
                        reason: "job_failed".to_string(),
                    });
                }
            }
            NudgeOutcome::Missing => {
                info!(job_id = %job_id, "Job disappeared during advance");
                self.halt(&mut state, StopReason::JobMissing);
            }
        }
    }
}

fn lock_confirmed_config(state: &mut LoopState, job_id: &JobId, snapshot: &StatusSnapshot) {
    let Some(reported) = snapshot.confirmed_config() else {
        return;
    };
    match &state.confirmed_config {
        None => {
            debug!(job_id = %job_id, voice = %reported.voice(), style = %reported.style(), "Confirmed config locked");
            state.confirmed_config = Some(reported.clone());
        }
        Some(locked) if locked != reported => {
            warn!(job_id = %job_id, "Service reported a different confirmed config, keeping the locked one");
        }
        Some(_) => {}
    }
}

/// Polls one job until it reaches a stopping condition.
///
/// Must be started from within a tokio runtime.
///
/// # Examples
///
/// ```no_run
/// use reelwright_core::{JobHandle, RunEvent};
/// use reelwright_interface::{RunApi, SystemClock};
/// use reelwright_runner::{PollLoop, RunnerConfig};
/// use std::sync::Arc;
///
/// # async fn example(api: Arc<dyn RunApi>) -> Result<(), Box<dyn std::error::Error>> {
/// let handle = JobHandle::new("job-1", "caller-1");
/// let poll_loop = PollLoop::new(handle, api, Arc::new(SystemClock), &RunnerConfig::default())?;
/// let mut events = poll_loop.subscribe();
/// poll_loop.start()?;
///
/// while let Ok(event) = events.recv().await {
///     if let RunEvent::LoopStopped { reason, .. } = event {
///         println!("done: {reason}");
///         break;
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct PollLoop<A: RunApi + ?Sized + 'static> {
    shared: Arc<LoopShared<A>>,
}

impl<A> PollLoop<A>
where
    A: RunApi + ?Sized + 'static,
{
    /// Create a loop with its own advance gate.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(
        handle: JobHandle,
        api: Arc<A>,
        clock: Arc<dyn Clock>,
        config: &RunnerConfig,
    ) -> Result<Self, ConfigError> {
        let gate = Arc::new(AdvanceGate::new(
            Arc::clone(&api),
            Arc::clone(&clock),
            config.nudge_min_spacing(),
        ));
        Self::with_gate(handle, api, clock, gate, config)
    }

    /// Create a loop that nudges through a shared gate.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn with_gate(
        handle: JobHandle,
        api: Arc<A>,
        clock: Arc<dyn Clock>,
        gate: Arc<AdvanceGate<A>>,
        config: &RunnerConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (events, _) = broadcast::channel(*config.event_capacity());
        Ok(Self {
            shared: Arc::new(LoopShared {
                handle,
                api,
                stale: StaleDetector::new(Arc::clone(&clock)),
                clock,
                gate,
                evaluator: AdvanceEvaluator::new(config.stale_threshold()),
                poll_interval: config.poll_interval(),
                video_grace: config.video_grace(),
                events,
                state: Mutex::new(LoopState::new()),
                timer: Mutex::new(None),
            }),
        })
    }

    /// Job being polled.
    pub fn handle(&self) -> &JobHandle {
        &self.shared.handle
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.shared.events.subscribe()
    }

    /// Start ticking. The first fetch happens immediately.
    ///
    /// # Errors
    ///
    /// Fails with `AlreadyRunning` if the loop is ticking.
    #[instrument(skip(self), fields(job_id = %self.shared.job_id()))]
    pub fn start(&self) -> Result<(), LoopError> {
        let mut state = self.shared.state();
        self.shared.start_locked(&mut state)
    }

    /// Stop ticking.
    ///
    /// No tick fires after this returns, and a fetch or nudge still in flight
    /// is discarded when it completes. Stopping a stopped loop does nothing.
    #[instrument(skip(self), fields(job_id = %self.shared.job_id()))]
    pub fn stop(&self) {
        let mut state = self.shared.state();
        if state.status.is_running() {
            self.shared.halt(&mut state, StopReason::Requested);
        } else {
            debug!("Poll loop not running");
        }
    }

    /// Restart a failed job and resume polling it.
    ///
    /// Polling always resumes under a new generation, so a fetch issued
    /// before the restart cannot report the job as failed again.
    ///
    /// # Errors
    ///
    /// Fails with `RetryNotAllowed` unless the last observed phase is
    /// `failed`, and with the service error if the restart is rejected.
    #[instrument(skip(self), fields(job_id = %self.shared.job_id()))]
    pub async fn retry(&self) -> ReelwrightResult<StatusSnapshot> {
        let last_phase = self.shared.state().last_phase;
        if last_phase != Some(Phase::Failed) {
            let phase = last_phase.map_or("unknown", |phase| phase.as_str());
            return Err(LoopError::new(LoopErrorKind::RetryNotAllowed(phase.to_string())).into());
        }

        info!("Retrying failed job");
        let snapshot = self.shared.api.retry_job(self.shared.job_id()).await?;
        snapshot.validate()?;

        let mut state = self.shared.state();
        let phase = *snapshot.phase();
        if state.last_phase != Some(phase) {
            self.shared.emit(RunEvent::PhaseTransitioned {
                job_id: self.shared.job_id().clone(),
                from: Phase::Failed,
                to: phase,
                reason: "retry_requested".to_string(),
            });
        }
        state.last_phase = Some(phase);
        state.last_snapshot = Some(snapshot.clone());
        self.shared.begin_generation(&mut state);
        Ok(snapshot)
    }

    /// Current lifecycle status.
    pub fn status(&self) -> LoopStatus {
        self.shared.state().status
    }

    /// Most recent valid snapshot.
    pub fn snapshot(&self) -> Option<StatusSnapshot> {
        self.shared.state().last_snapshot.clone()
    }

    /// Confirmed configuration locked from the first snapshot carrying one.
    pub fn confirmed_config(&self) -> Option<ConfirmedConfig> {
        self.shared.state().confirmed_config.clone()
    }

    /// Whether a status fetch is outstanding.
    pub fn is_poll_in_flight(&self) -> bool {
        self.shared.state().poll_in_flight
    }

    /// Failed fetches since the last successful one.
    pub fn consecutive_failures(&self) -> u32 {
        self.shared.state().consecutive_failures
    }

    /// When the last successful fetch completed.
    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.shared.state().last_success_at
    }
}

impl<A> Drop for PollLoop<A>
where
    A: RunApi + ?Sized + 'static,
{
    fn drop(&mut self) {
        let mut state = self.shared.state();
        self.shared.halt(&mut state, StopReason::Requested);
    }
}

impl<A> std::fmt::Debug for PollLoop<A>
where
    A: RunApi + ?Sized + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollLoop")
            .field("job_id", self.shared.job_id())
            .field("status", &self.status())
            .finish()
    }
}
