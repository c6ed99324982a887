// Cold-start resolution scenarios.

mod test_utils;

use reelwright_core::{
    CallerContext, JobHandle, JobId, Phase, ResumeAction, ResumeKind, StepState, VideoSubState,
};
use reelwright_error::{ApiError, ApiErrorKind, ReelwrightErrorKind};
use reelwright_runner::ResumptionResolver;
use std::sync::Arc;
use test_utils::{CALLER, JOB, MockRunApi, audio, failed, ready};

fn resolver(api: &Arc<MockRunApi>) -> ResumptionResolver<MockRunApi> {
    ResumptionResolver::new(Arc::clone(api))
}

#[tokio::test]
async fn test_active_job_is_attached() {
    let api = Arc::new(MockRunApi::new());
    api.set_active_job(JobHandle::new(JOB, CALLER));
    api.set_status(audio(StepState::Running));

    let action = resolver(&api)
        .resolve(&CallerContext::new(CALLER), None)
        .await
        .unwrap();

    assert_eq!(action.kind(), ResumeKind::Attach);
    assert_eq!(
        action.snapshot().map(|s| *s.phase()),
        Some(Phase::GeneratingAudio)
    );
    assert!(action.should_poll());
}

#[tokio::test]
async fn test_active_job_wins_over_explicit_id() {
    let api = Arc::new(MockRunApi::new());
    api.set_active_job(JobHandle::new(JOB, CALLER));
    api.set_status(audio(StepState::Running));
    api.set_lookup("job-old", Ok(ready(VideoSubState::Done)));

    let action = resolver(&api)
        .resolve(&CallerContext::new(CALLER), Some(&JobId::from("job-old")))
        .await
        .unwrap();

    assert_eq!(action.kind(), ResumeKind::Attach);
    assert_eq!(action.handle().map(|h| h.job_id().as_str()), Some(JOB));
}

#[tokio::test]
async fn test_explicit_ready_job_keeps_video_state() {
    let api = Arc::new(MockRunApi::new());
    api.set_lookup(
        "job-7",
        Ok(ready(VideoSubState::Running {
            progress_percent: 35,
        })),
    );
    let caller = CallerContext::new(CALLER);

    let action = resolver(&api)
        .resolve(&caller, Some(&JobId::from("job-7")))
        .await
        .unwrap();

    assert_eq!(action.kind(), ResumeKind::ResumeReady);
    assert_eq!(
        action.snapshot().and_then(|s| s.video()),
        Some(VideoSubState::Running {
            progress_percent: 35
        })
    );
    assert!(action.handle().is_some_and(|h| h.is_owned_by(&caller)));
    assert!(action.should_poll());
}

#[tokio::test]
async fn test_explicit_failed_job_is_classified() {
    let api = Arc::new(MockRunApi::new());
    api.set_lookup("job-7", Ok(failed("tts quota exhausted")));

    let action = resolver(&api)
        .resolve(&CallerContext::new(CALLER), Some(&JobId::from("job-7")))
        .await
        .unwrap();

    assert_eq!(action.kind(), ResumeKind::ResumeFailed);
    assert!(!action.should_poll());
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let api = Arc::new(MockRunApi::new());

    let action = resolver(&api)
        .resolve(&CallerContext::new(CALLER), Some(&JobId::from("job-404")))
        .await
        .unwrap();

    assert_eq!(
        action,
        ResumeAction::NotFound {
            job_id: JobId::from("job-404")
        }
    );
}

#[tokio::test]
async fn test_foreign_job_is_forbidden() {
    let api = Arc::new(MockRunApi::new());
    api.set_lookup(
        "job-9",
        Err(ApiError::new(ApiErrorKind::Forbidden("job-9".to_string()))),
    );

    let action = resolver(&api)
        .resolve(&CallerContext::new(CALLER), Some(&JobId::from("job-9")))
        .await
        .unwrap();

    assert_eq!(
        action,
        ResumeAction::Forbidden {
            job_id: JobId::from("job-9")
        }
    );
}

#[tokio::test]
async fn test_nothing_to_resume_is_idle() {
    let api = Arc::new(MockRunApi::new());

    let action = resolver(&api)
        .resolve(&CallerContext::new(CALLER), None)
        .await
        .unwrap();

    assert_eq!(action, ResumeAction::Idle);
    assert!(action.handle().is_none());
}

#[tokio::test]
async fn test_transport_failure_is_an_error() {
    let api = Arc::new(MockRunApi::new());
    api.set_active_error(ApiErrorKind::Transport("dns failure".to_string()));

    let err = resolver(&api)
        .resolve(&CallerContext::new(CALLER), Some(&JobId::from("job-7")))
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), ReelwrightErrorKind::Api(e) if e.is_transient()));
}
