// Run tracker registry behavior.

mod test_utils;

use reelwright_core::{
    CallerContext, JobHandle, JobId, Phase, ResumeKind, RunEvent, StopReason, VideoSubState,
};
use reelwright_error::{ApiErrorKind, LoopErrorKind, ReelwrightErrorKind};
use reelwright_interface::TokioClock;
use reelwright_runner::{LoopStatus, RunTracker, RunnerConfig};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{CALLER, JOB, MockRunApi, drain, failed, formatting, ready};

fn tracker(api: &Arc<MockRunApi>) -> RunTracker<MockRunApi> {
    RunTracker::new(
        Arc::clone(api),
        Arc::new(TokioClock::new()),
        RunnerConfig::default(),
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_tracking_twice_shares_one_loop() {
    let api = Arc::new(MockRunApi::new());
    api.set_status(formatting(1, 5));
    let tracker = tracker(&api);

    let mut first = tracker.track(JobHandle::new(JOB, CALLER)).await.unwrap();
    let mut second = tracker.track(JobHandle::new(JOB, CALLER)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(9)).await;

    assert_eq!(api.status_calls(), 3);
    assert_eq!(tracker.tracked().await, vec![JobId::from(JOB)]);
    assert_eq!(drain(&mut first).len(), drain(&mut second).len());
    tracker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_detach_stops_loop() {
    let api = Arc::new(MockRunApi::new());
    api.set_status(formatting(1, 5));
    let tracker = tracker(&api);
    let job_id = JobId::from(JOB);

    let mut events = tracker.track(JobHandle::new(JOB, CALLER)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    tracker.detach(&job_id).await.unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert_eq!(api.status_calls(), 1);
    assert!(tracker.status(&job_id).await.is_none());
    assert!(matches!(
        drain(&mut events).last(),
        Some(RunEvent::LoopStopped { .. })
    ));

    let err = tracker.detach(&job_id).await.unwrap_err();
    assert!(matches!(
        err.kind(),
        ReelwrightErrorKind::Loop(e) if matches!(e.kind(), LoopErrorKind::NotTracked(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_settled_loop_is_released_and_can_be_tracked_again() {
    let api = Arc::new(MockRunApi::new());
    api.set_status(ready(VideoSubState::Done));
    let tracker = tracker(&api);
    let job_id = JobId::from(JOB);

    tracker.track(JobHandle::new(JOB, CALLER)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(tracker.status(&job_id).await.is_none());
    assert!(tracker.tracked().await.is_empty());

    api.set_status(ready(VideoSubState::Pending));
    tracker.track(JobHandle::new(JOB, CALLER)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(tracker.status(&job_id).await, Some(LoopStatus::Running));
    tracker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_missing_job_is_released() {
    let api = Arc::new(MockRunApi::new());
    api.push_status_error(ApiErrorKind::NotFound(JOB.to_string()));
    let tracker = tracker(&api);

    let mut events = tracker.track(JobHandle::new(JOB, CALLER)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(tracker.tracked().await.is_empty());
    assert!(tracker.status(&JobId::from(JOB)).await.is_none());
    assert!(drain(&mut events).iter().any(|event| matches!(
        event,
        RunEvent::LoopStopped {
            reason: StopReason::JobMissing,
            ..
        }
    )));
    assert_eq!(api.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_job_stays_tracked_for_retry() {
    let api = Arc::new(MockRunApi::new());
    api.set_status(failed("image provider unavailable"));
    api.set_retry(Ok(formatting(1, 5)));
    let tracker = tracker(&api);
    let job_id = JobId::from(JOB);

    tracker.track(JobHandle::new(JOB, CALLER)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(
        tracker.status(&job_id).await,
        Some(LoopStatus::Stopped(StopReason::JobFailed))
    );
    assert_eq!(tracker.tracked().await, vec![job_id.clone()]);

    let snapshot = tracker.retry(&job_id).await.unwrap();
    assert_eq!(*snapshot.phase(), Phase::Formatting);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(tracker.status(&job_id).await, Some(LoopStatus::Running));
    tracker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_slow_retry_does_not_block_registry() {
    let api = Arc::new(MockRunApi::new());
    api.set_status(failed("image provider unavailable"));
    api.set_retry(Ok(formatting(1, 5)));
    api.set_retry_delay(Duration::from_secs(10));
    let tracker = Arc::new(tracker(&api));
    let job_id = JobId::from(JOB);

    tracker.track(JobHandle::new(JOB, CALLER)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let retrying = {
        let tracker = Arc::clone(&tracker);
        let job_id = job_id.clone();
        tokio::spawn(async move { tracker.retry(&job_id).await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;

    let tracked = tokio::time::timeout(
        Duration::from_secs(1),
        tracker.track(JobHandle::new("job-2", CALLER)),
    )
    .await;
    assert!(tracked.is_ok());

    assert!(retrying.await.unwrap().is_ok());
    assert_eq!(tracker.status(&job_id).await, Some(LoopStatus::Running));
    tracker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_resume_attaches_and_polls_active_job() {
    let api = Arc::new(MockRunApi::new());
    api.set_active_job(JobHandle::new(JOB, CALLER));
    api.set_status(formatting(2, 5));
    let tracker = tracker(&api);

    let (action, events) = tracker
        .resume(&CallerContext::new(CALLER), None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(action.kind(), ResumeKind::Attach);
    assert!(events.is_some());
    assert_eq!(
        tracker.status(&JobId::from(JOB)).await,
        Some(LoopStatus::Running)
    );
    assert!(tracker.snapshot(&JobId::from(JOB)).await.is_some());
    tracker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_resume_settled_job_does_not_poll() {
    let api = Arc::new(MockRunApi::new());
    api.set_lookup("job-7", Ok(ready(VideoSubState::Done)));
    let tracker = tracker(&api);

    let (action, events) = tracker
        .resume(&CallerContext::new(CALLER), Some(&JobId::from("job-7")))
        .await
        .unwrap();

    assert_eq!(action.kind(), ResumeKind::ResumeReady);
    assert!(events.is_none());
    assert!(tracker.tracked().await.is_empty());
    assert_eq!(api.status_calls(), 0);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let api = Arc::new(MockRunApi::new());
    let config = RunnerConfig::builder().poll_interval_ms(0).build().unwrap();
    assert!(RunTracker::new(api, Arc::new(TokioClock::new()), config).is_err());
}
