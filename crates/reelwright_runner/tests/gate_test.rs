// Advance gate serialization and debouncing.

mod test_utils;

use reelwright_core::{AdvanceResult, JobHandle, NudgeOutcome, Phase};
use reelwright_error::ApiErrorKind;
use reelwright_interface::ManualClock;
use reelwright_runner::{Admission, AdvanceGate, GateResult};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{CALLER, JOB, MockRunApi};

fn gate(api: &Arc<MockRunApi>, clock: &ManualClock) -> AdvanceGate<MockRunApi> {
    AdvanceGate::new(
        Arc::clone(api),
        Arc::new(clock.clone()),
        Duration::from_secs(5),
    )
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_send_one_call() {
    let api = Arc::new(MockRunApi::new());
    api.set_advance_delay(Duration::from_secs(20));
    let clock = ManualClock::default();
    let gate = gate(&api, &clock);
    let handle = JobHandle::new(JOB, CALLER);

    let (first, second) = tokio::join!(gate.request(&handle), async {
        tokio::time::sleep(Duration::from_millis(1)).await;
        let in_flight = gate.is_in_flight(handle.job_id());
        (in_flight, gate.request(&handle).await)
    });

    assert_eq!(first, GateResult::Completed(NudgeOutcome::NoOp));
    assert_eq!(second, (true, GateResult::Skipped(Admission::InFlight)));
    assert_eq!(api.advance_calls(), 1);
    assert_eq!(api.peak_concurrent_advance(), 1);
    assert!(!gate.is_in_flight(handle.job_id()));
}

#[tokio::test]
async fn test_spacing_is_measured_from_last_accepted_start() {
    let api = Arc::new(MockRunApi::new());
    let clock = ManualClock::default();
    let gate = gate(&api, &clock);
    let handle = JobHandle::new(JOB, CALLER);

    assert!(matches!(gate.request(&handle).await, GateResult::Completed(_)));

    clock.advance(Duration::from_secs(1));
    assert_eq!(
        gate.request(&handle).await,
        GateResult::Skipped(Admission::Debounced {
            retry_in: Duration::from_secs(4)
        })
    );

    clock.advance(Duration::from_secs(5));
    assert!(matches!(gate.request(&handle).await, GateResult::Completed(_)));
    assert_eq!(api.advance_calls(), 2);
}

#[tokio::test]
async fn test_jobs_are_gated_independently() {
    let api = Arc::new(MockRunApi::new());
    let clock = ManualClock::default();
    let gate = gate(&api, &clock);

    let first = JobHandle::new("job-a", CALLER);
    let second = JobHandle::new("job-b", CALLER);
    assert!(matches!(gate.request(&first).await, GateResult::Completed(_)));
    assert!(matches!(gate.request(&second).await, GateResult::Completed(_)));
    assert_eq!(api.advance_calls(), 2);
}

#[tokio::test]
async fn test_request_classifies_service_responses() {
    let api = Arc::new(MockRunApi::new());
    api.push_advance(AdvanceResult::transitioned(
        Phase::Formatting,
        Phase::AwaitingReady,
        "formatting_complete",
    ));
    api.push_advance_error(ApiErrorKind::Conflict("locked".to_string()));
    let clock = ManualClock::default();
    let gate = gate(&api, &clock);
    let handle = JobHandle::new(JOB, CALLER);

    assert_eq!(
        gate.request(&handle).await,
        GateResult::Completed(NudgeOutcome::PhaseTransitioned {
            from: Phase::Formatting,
            to: Phase::AwaitingReady,
            reason: "formatting_complete".to_string(),
        })
    );

    clock.advance(Duration::from_secs(5));
    assert_eq!(
        gate.request(&handle).await,
        GateResult::Completed(NudgeOutcome::Conflicted)
    );
}

#[tokio::test]
async fn test_errored_request_still_releases_slot() {
    let api = Arc::new(MockRunApi::new());
    api.push_advance_error(ApiErrorKind::Transport("connection reset".to_string()));
    let clock = ManualClock::default();
    let gate = gate(&api, &clock);
    let handle = JobHandle::new(JOB, CALLER);

    assert!(matches!(
        gate.request(&handle).await,
        GateResult::Completed(NudgeOutcome::Errored { .. })
    ));
    assert!(!gate.is_in_flight(handle.job_id()));

    gate.forget(handle.job_id());
    assert!(matches!(gate.request(&handle).await, GateResult::Completed(_)));
}
