//! Lifecycle operation tests against the fake supervisor and probe

use galera_sidecar::intent::{LifecycleIntent, ServiceName};
use galera_sidecar::orchestrator::{ErrorKind, LifecycleError, LifecycleOrchestrator, WaitSettings};
use galera_sidecar::readiness::ProbeOutcome;
use galera_sidecar::supervisor::ProcessState;
use galera_sidecar_tests::{FakeProbe, FakeSupervisor, StateDir};
use tokio_util::sync::CancellationToken;

type TestOrchestrator = LifecycleOrchestrator<FakeSupervisor, FakeProbe>;

fn orchestrator(
    service: &str,
    state_dir: &StateDir,
    supervisor: FakeSupervisor,
    probe: FakeProbe,
) -> TestOrchestrator {
    LifecycleOrchestrator::new(
        ServiceName::from(service),
        state_dir.state_file(),
        supervisor.watching_marker(&state_dir.marker_path()),
        probe,
        WaitSettings::default(),
    )
}

fn ready_probe() -> FakeProbe {
    FakeProbe::new().with_outcomes([ProbeOutcome::Ready])
}

// ---------------------------------------------------------------------------
// bootstrap
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_bootstrap_writes_marker_before_start() {
    let state_dir = StateDir::new();
    let orch = orchestrator("mysql", &state_dir, FakeSupervisor::new(), ready_probe());

    let message = orch.bootstrap(&CancellationToken::new()).await.unwrap();

    assert_eq!(message, "cluster bootstrap successful");
    assert_eq!(state_dir.read_marker().as_deref(), Some("NEEDS_BOOTSTRAP"));
    assert_eq!(
        orch.supervisor().marker_at_start(),
        vec![Some("NEEDS_BOOTSTRAP".to_string())]
    );
    assert_eq!(orch.supervisor().start_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_refused_for_arbitrator() {
    let state_dir = StateDir::new();
    let orch = orchestrator("garbd", &state_dir, FakeSupervisor::new(), ready_probe());

    let err = orch.bootstrap(&CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidIntent);
    assert!(err.to_string().contains("bootstrapping arbitrator not allowed"));
    assert!(state_dir.is_empty(), "no marker may be written");
    assert_eq!(orch.supervisor().start_calls(), 0);
    assert_eq!(orch.supervisor().status_calls(), 0);
    assert_eq!(orch.probe().calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_allowed_for_any_other_service() {
    for service in ["mysql", "galera", "garbd-proxy", "GARBD"] {
        let state_dir = StateDir::new();
        let orch = orchestrator(service, &state_dir, FakeSupervisor::new(), ready_probe());

        let result = orch.bootstrap(&CancellationToken::new()).await;

        assert!(result.is_ok(), "bootstrap of {} failed: {:?}", service, result);
        assert_eq!(orch.supervisor().calls()[0], format!("start:{}", service));
    }
}

// ---------------------------------------------------------------------------
// join / single node
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_join_writes_clustered_marker() {
    let state_dir = StateDir::new();
    let orch = orchestrator("mysql", &state_dir, FakeSupervisor::new(), ready_probe());

    let message = orch.join(&CancellationToken::new()).await.unwrap();

    assert_eq!(message, "join cluster successful");
    assert_eq!(state_dir.read_marker().as_deref(), Some("CLUSTERED"));
    assert_eq!(
        orch.supervisor().marker_at_start(),
        vec![Some("CLUSTERED".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_single_node_writes_single_node_marker() {
    let state_dir = StateDir::new();
    let orch = orchestrator("mysql", &state_dir, FakeSupervisor::new(), ready_probe());

    let message = orch.single_node(&CancellationToken::new()).await.unwrap();

    assert_eq!(message, "single node start successful");
    assert_eq!(state_dir.read_marker().as_deref(), Some("SINGLE_NODE"));
}

#[tokio::test(start_paused = true)]
async fn test_arbitrator_may_join_and_run_single_node() {
    let state_dir = StateDir::new();
    let orch = orchestrator(
        "garbd",
        &state_dir,
        FakeSupervisor::new(),
        FakeProbe::new().with_outcomes([ProbeOutcome::Ready, ProbeOutcome::Ready]),
    );
    let cancel = CancellationToken::new();

    orch.join(&cancel).await.unwrap();
    assert_eq!(state_dir.read_marker().as_deref(), Some("CLUSTERED"));

    orch.single_node(&cancel).await.unwrap();
    assert_eq!(state_dir.read_marker().as_deref(), Some("SINGLE_NODE"));

    assert_eq!(
        orch.supervisor().marker_at_start(),
        vec![Some("CLUSTERED".to_string()), Some("SINGLE_NODE".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_each_start_overwrites_previous_marker() {
    let state_dir = StateDir::new();
    let orch = orchestrator(
        "mysql",
        &state_dir,
        FakeSupervisor::new(),
        FakeProbe::new().with_fallback(ProbeOutcome::Ready),
    );
    let cancel = CancellationToken::new();

    orch.bootstrap(&cancel).await.unwrap();
    orch.join(&cancel).await.unwrap();

    assert_eq!(state_dir.read_marker().as_deref(), Some("CLUSTERED"));
}

// ---------------------------------------------------------------------------
// failures before the wait
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_persistence_failure_never_contacts_supervisor() {
    let state_dir = StateDir::new();
    let orch = LifecycleOrchestrator::new(
        ServiceName::from("mysql"),
        state_dir.unwritable_state_file(),
        FakeSupervisor::new(),
        ready_probe(),
        WaitSettings::default(),
    );
    let cancel = CancellationToken::new();

    for intent in [
        LifecycleIntent::Bootstrap,
        LifecycleIntent::Join,
        LifecycleIntent::SingleNode,
    ] {
        let err = orch.run(intent, &cancel).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure, "{}", intent);
        assert!(err.to_string().contains("failed to initialize state file"));
    }

    assert!(orch.supervisor().calls().is_empty());
    assert_eq!(orch.probe().calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_start_failure_is_surfaced_unchanged() {
    let state_dir = StateDir::new();
    let orch = orchestrator(
        "mysql",
        &state_dir,
        FakeSupervisor::new().failing_start("monit refused"),
        ready_probe(),
    );

    let err = orch.join(&CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SupervisorFailure);
    assert_eq!(err.to_string(), "supervisor unavailable: monit refused");
    assert_eq!(orch.supervisor().status_calls(), 0, "no wait after a failed start");
    assert_eq!(orch.probe().calls(), 0);
    assert_eq!(state_dir.read_marker().as_deref(), Some("CLUSTERED"));
}

// ---------------------------------------------------------------------------
// stop / status
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_stop_issues_only_stop() {
    let state_dir = StateDir::new();
    let orch = orchestrator("mysql", &state_dir, FakeSupervisor::new(), ready_probe());

    let message = orch.stop().await.unwrap();

    assert_eq!(message, "stop successful");
    assert_eq!(orch.supervisor().calls(), vec!["stop:mysql".to_string()]);
    assert_eq!(orch.probe().calls(), 0);
    assert!(state_dir.is_empty(), "stop must not write a marker");
}

#[tokio::test(start_paused = true)]
async fn test_stop_failure_is_surfaced() {
    let state_dir = StateDir::new();
    let orch = orchestrator(
        "garbd",
        &state_dir,
        FakeSupervisor::new().failing_stop("connection reset"),
        ready_probe(),
    );

    let err = orch.run(LifecycleIntent::Stop, &CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, LifecycleError::Supervisor(_)));
    assert!(err.to_string().contains("connection reset"));
    assert_eq!(orch.supervisor().stop_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_status_passes_raw_state_through() {
    let state_dir = StateDir::new();
    let orch = orchestrator(
        "mysql",
        &state_dir,
        FakeSupervisor::new().with_statuses([
            ProcessState::Running,
            ProcessState::from_raw("unmonitored"),
        ]),
        ready_probe(),
    );

    assert_eq!(orch.status().await.unwrap(), "running");
    assert_eq!(orch.status().await.unwrap(), "unmonitored");
    assert!(state_dir.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_status_error_is_surfaced() {
    let state_dir = StateDir::new();
    let orch = orchestrator(
        "mysql",
        &state_dir,
        FakeSupervisor::new().with_status_error("monit down"),
        ready_probe(),
    );

    let err = orch.status().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SupervisorFailure);
    assert!(err.to_string().contains("monit down"));
}

// ---------------------------------------------------------------------------
// waits driven through the public operations
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_join_scenario_with_slow_readiness_server() {
    let state_dir = StateDir::new();
    let orch = orchestrator(
        "mysql",
        &state_dir,
        FakeSupervisor::new().with_statuses([ProcessState::Running, ProcessState::Running]),
        FakeProbe::new().with_outcomes([FakeProbe::timed_out(), ProbeOutcome::Ready]),
    );

    let message = orch.run(LifecycleIntent::Join, &CancellationToken::new()).await.unwrap();

    assert_eq!(message, "join cluster successful");
    assert_eq!(state_dir.read_marker().as_deref(), Some("CLUSTERED"));
    assert_eq!(orch.supervisor().status_calls(), 2);
    assert_eq!(orch.probe().calls(), 2);
    assert_eq!(
        orch.supervisor().calls(),
        vec!["start:mysql", "status:mysql", "status:mysql"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_fails_when_process_dies() {
    let state_dir = StateDir::new();
    let orch = orchestrator(
        "mysql",
        &state_dir,
        FakeSupervisor::new().with_statuses([ProcessState::Running, ProcessState::Failing]),
        FakeProbe::new(),
    );

    let err = orch.bootstrap(&CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProcessNotRunning);
    assert!(err.to_string().contains("job failed during startup"));
    assert_eq!(orch.probe().calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_single_node_fails_on_readiness_rejection() {
    let state_dir = StateDir::new();
    let orch = orchestrator(
        "mysql",
        &state_dir,
        FakeSupervisor::new(),
        FakeProbe::new().with_outcomes([FakeProbe::rejected(503)]),
    );

    let err = orch.single_node(&CancellationToken::new()).await.unwrap_err();

    match err {
        LifecycleError::ReadinessRejected { status, ref address, .. } => {
            assert_eq!(status, 503);
            assert_eq!(address, "127.0.0.1:8114");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_join_reports_cancelled() {
    let state_dir = StateDir::new();
    let orch = orchestrator("mysql", &state_dir, FakeSupervisor::new(), FakeProbe::new());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
        trigger.cancel();
    });

    let err = orch.join(&cancel).await.unwrap_err();

    assert!(matches!(err, LifecycleError::Cancelled { ticks: 2, .. }), "{:?}", err);
    assert_eq!(state_dir.read_marker().as_deref(), Some("CLUSTERED"));
}
