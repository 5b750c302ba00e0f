//! End-to-end run tests: HTTP stream -> controller -> refresh

use std::sync::Arc;
use std::time::Duration;

use floodboard::cache_bust::{stamp_of, CacheBuster};
use floodboard::error::StreamError;
use floodboard::refresh::{MapDocument, RefreshCoordinator};
use floodboard::report::{ReportLoader, ReportSource, REPORT_PATH};
use floodboard::runner::{RunController, RunOutcome, RunState};
use floodboard::stream::{drive_run, HttpSimulationSource, SIMULATE_PATH};
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IDLE: Duration = Duration::from_secs(5);

// =============================================================================
// HELPERS
// =============================================================================

fn endpoint(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

fn source(server: &MockServer) -> HttpSimulationSource {
    HttpSimulationSource::new(reqwest::Client::new(), endpoint(server, SIMULATE_PATH))
}

fn sse(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

async fn run(server: &MockServer, intensity: u32) -> (RunController, RunOutcome, Vec<String>) {
    let mut controller = RunController::new();
    let request = controller.start(intensity).unwrap();
    let mut lines = Vec::new();
    let outcome = drive_run(&mut controller, &source(server), request, IDLE, |event| {
        lines.push(event.message.clone())
    })
    .await;
    (controller, outcome, lines)
}

// =============================================================================
// RUNS
// =============================================================================

#[tokio::test]
async fn test_run_streams_log_and_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SIMULATE_PATH))
        .and(query_param("intensity", "250"))
        .respond_with(sse(concat!(
            "data: Loading network\n\n",
            "data: Step 1/2\n\n",
            ": keepalive\n\n",
            "data: Step 2/2\n\n",
            "data: SIMULATION_COMPLETE\n\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let (controller, outcome, lines) = run(&server, 250).await;

    assert!(matches!(outcome, RunOutcome::Succeeded { .. }));
    assert_eq!(lines, vec!["Loading network", "Step 1/2", "Step 2/2"]);
    assert_eq!(controller.state(), RunState::Succeeded);
    assert!(controller.can_start());
}

#[tokio::test]
async fn test_crlf_stream_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SIMULATE_PATH))
        .respond_with(sse("data: hello\r\n\r\ndata: SIMULATION_COMPLETE\r\n\r\n"))
        .mount(&server)
        .await;

    let (_, outcome, lines) = run(&server, 100).await;
    assert!(matches!(outcome, RunOutcome::Succeeded { .. }));
    assert_eq!(lines, vec!["hello"]);
}

#[tokio::test]
async fn test_server_error_line_without_sentinel_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SIMULATE_PATH))
        .respond_with(sse("data: Step 1\n\ndata: Error executing simulation: boom\n\n"))
        .mount(&server)
        .await;

    let (controller, outcome, lines) = run(&server, 100).await;

    assert_eq!(
        outcome,
        RunOutcome::Failed {
            run_id: 1,
            error: StreamError::Incomplete
        }
    );
    assert_eq!(lines.len(), 2);
    assert_eq!(controller.state(), RunState::Failed);
    assert!(controller.can_start());
}

#[tokio::test]
async fn test_http_error_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SIMULATE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (controller, outcome, lines) = run(&server, 100).await;

    assert!(matches!(
        outcome,
        RunOutcome::Failed {
            error: StreamError::Status { status: 500 },
            ..
        }
    ));
    assert!(lines.is_empty());
    assert!(controller.can_start());
}

// =============================================================================
// REFRESH AFTER SUCCESS
// =============================================================================

#[tokio::test]
async fn test_success_refreshes_maps_and_report_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SIMULATE_PATH))
        .respond_with(sse("data: done soon\n\ndata: SIMULATION_COMPLETE\n\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(REPORT_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "content": "# New design" })),
        )
        // panel + preview
        .expect(2)
        .mount(&server)
        .await;

    let buster = Arc::new(CacheBuster::new());
    let maps = vec![
        MapDocument::new("flood", endpoint(&server, "/maps/flood")),
        MapDocument::new("route", endpoint(&server, "/maps/route")),
    ];
    let mut coordinator = RefreshCoordinator::new(maps, buster.clone());
    let loader = ReportLoader::new(reqwest::Client::new(), endpoint(&server, REPORT_PATH), buster);

    let (_, outcome, _) = run(&server, 100).await;
    let RunOutcome::Succeeded { run_id } = outcome else {
        panic!("run should succeed: {outcome:?}");
    };

    let plan = coordinator.on_run_complete(run_id, true).unwrap();
    assert!(coordinator.on_run_complete(run_id, true).is_none());

    for map in coordinator.maps() {
        assert_eq!(map.reloads, 1);
        assert!(stamp_of(&map.url).is_some());
    }

    let refreshed = plan.execute(&loader as &dyn ReportSource).await;
    assert_eq!(refreshed.report.unwrap().unwrap().content, "# New design");
    assert_eq!(refreshed.preview.unwrap().content, "# New design");
}
