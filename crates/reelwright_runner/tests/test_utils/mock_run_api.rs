//! Scripted mock of the remote run service.

use async_trait::async_trait;
use reelwright_core::{AdvanceResult, CallerContext, JobHandle, JobId, Phase, StatusSnapshot};
use reelwright_error::{ApiError, ApiErrorKind, ApiResult};
use reelwright_interface::RunApi;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Counts concurrent calls and remembers the peak.
#[derive(Debug, Default)]
struct Concurrency {
    calls: AtomicUsize,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Concurrency {
    fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock service driven by scripted responses.
///
/// Status responses are consumed in order when a call starts, so a delayed
/// call returns what the service held at the time it was asked; the last
/// response repeats forever. Advance responses are consumed in order and default to a no-op.
#[derive(Debug, Default)]
pub struct MockRunApi {
    statuses: Mutex<VecDeque<ApiResult<StatusSnapshot>>>,
    advances: Mutex<VecDeque<ApiResult<AdvanceResult>>>,
    active: Mutex<Option<JobHandle>>,
    active_error: Mutex<Option<ApiErrorKind>>,
    lookups: Mutex<HashMap<JobId, ApiResult<StatusSnapshot>>>,
    retry: Mutex<Option<ApiResult<StatusSnapshot>>>,
    status_delay: Mutex<Duration>,
    advance_delay: Mutex<Duration>,
    retry_delay: Mutex<Duration>,
    status_calls: Concurrency,
    advance_calls: Concurrency,
    retry_calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockRunApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the status script with a single repeating snapshot.
    pub fn set_status(&self, snapshot: StatusSnapshot) {
        let mut statuses = self.statuses.lock().unwrap();
        statuses.clear();
        statuses.push_back(Ok(snapshot));
    }

    pub fn push_status(&self, snapshot: StatusSnapshot) {
        self.statuses.lock().unwrap().push_back(Ok(snapshot));
    }

    pub fn push_status_error(&self, kind: ApiErrorKind) {
        self.statuses.lock().unwrap().push_back(Err(ApiError::new(kind)));
    }

    pub fn push_advance(&self, result: AdvanceResult) {
        self.advances.lock().unwrap().push_back(Ok(result));
    }

    pub fn push_advance_error(&self, kind: ApiErrorKind) {
        self.advances.lock().unwrap().push_back(Err(ApiError::new(kind)));
    }

    pub fn set_active_job(&self, handle: JobHandle) {
        *self.active.lock().unwrap() = Some(handle);
    }

    pub fn set_active_error(&self, kind: ApiErrorKind) {
        *self.active_error.lock().unwrap() = Some(kind);
    }

    pub fn set_lookup(&self, job_id: &str, result: ApiResult<StatusSnapshot>) {
        self.lookups.lock().unwrap().insert(JobId::from(job_id), result);
    }

    pub fn set_retry(&self, result: ApiResult<StatusSnapshot>) {
        *self.retry.lock().unwrap() = Some(result);
    }

    pub fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.lock().unwrap() = delay;
    }

    pub fn set_advance_delay(&self, delay: Duration) {
        *self.advance_delay.lock().unwrap() = delay;
    }

    pub fn set_retry_delay(&self, delay: Duration) {
        *self.retry_delay.lock().unwrap() = delay;
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.calls.load(Ordering::SeqCst)
    }

    pub fn peak_concurrent_status(&self) -> usize {
        self.status_calls.peak.load(Ordering::SeqCst)
    }

    pub fn advance_calls(&self) -> usize {
        self.advance_calls.calls.load(Ordering::SeqCst)
    }

    pub fn peak_concurrent_advance(&self) -> usize {
        self.advance_calls.peak.load(Ordering::SeqCst)
    }

    pub fn retry_calls(&self) -> usize {
        self.retry_calls.load(Ordering::SeqCst)
    }

    fn next_status(&self) -> ApiResult<StatusSnapshot> {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses.front().cloned().unwrap_or_else(|| {
                Err(ApiError::new(ApiErrorKind::Transport(
                    "no scripted status".to_string(),
                )))
            })
        }
    }
}

#[async_trait]
impl RunApi for MockRunApi {
    async fn get_status(&self, _job_id: &JobId) -> ApiResult<StatusSnapshot> {
        self.status_calls.enter();
        let result = self.next_status();
        let delay = *self.status_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.status_calls.exit();
        result
    }

    async fn request_advance(&self, _job_id: &JobId) -> ApiResult<AdvanceResult> {
        self.advance_calls.enter();
        let delay = *self.advance_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let result = self
            .advances
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(AdvanceResult::no_op(Phase::Formatting)));
        self.advance_calls.exit();
        result
    }

    async fn get_active_job(&self, caller: &CallerContext) -> ApiResult<JobHandle> {
        if let Some(kind) = self.active_error.lock().unwrap().clone() {
            return Err(ApiError::new(kind));
        }
        self.active
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::new(ApiErrorKind::NotFound(caller.to_string())))
    }

    async fn get_job_by_id(
        &self,
        _caller: &CallerContext,
        job_id: &JobId,
    ) -> ApiResult<StatusSnapshot> {
        self.lookups
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .unwrap_or_else(|| Err(ApiError::new(ApiErrorKind::NotFound(job_id.to_string()))))
    }

    async fn retry_job(&self, job_id: &JobId) -> ApiResult<StatusSnapshot> {
        self.retry_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.retry_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let result = self
            .retry
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ApiError::new(ApiErrorKind::Conflict(job_id.to_string()))));
        if let Ok(snapshot) = &result {
            self.set_status(snapshot.clone());
        }
        result
    }
}
