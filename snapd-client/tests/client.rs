use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rstest::rstest;
use serde_json::{Value, json};
use snapd_client::types::AuthData;
use snapd_client::{
    BlockingClient, Client, ClientConfig, ClientMetrics, Error, ErrorKind, Find, RunSnapctl,
    SnapActionOptions, SnapSelect,
};
use snapd_test_utils::{MockDaemon, MockResponse};

fn config_for(daemon: &MockDaemon) -> ClientConfig {
    ClientConfig {
        socket_path: daemon.address().to_string(),
        snapctl_socket_path: daemon.address().to_string(),
        poll_interval_ms: 5,
        ..ClientConfig::default()
    }
}

fn change(id: &str, status: &str, ready: bool, done: u64) -> Value {
    json!({
        "id": id, "kind": "install-snap", "status": status, "ready": ready,
        "tasks": [{"id": "1", "status": status, "progress": {"done": done, "total": 10}}]
    })
}

fn snaps() -> Value {
    json!([
        {"name": "hello", "version": "2.10", "revision": "42", "status": "active"},
        {"name": "core22", "version": "20240111", "revision": "1122", "type": "base"}
    ])
}

/// Poll `condition` until it holds, for at most a second.
async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never became true");
}

#[test_log::test(tokio::test)]
async fn empty_snap_list_is_not_an_error() {
    let daemon = MockDaemon::start(|_| {
        MockResponse::json(200, json!({"type": "sync", "status-code": 200, "result": []}))
    })
    .unwrap();
    let client = Client::new(config_for(&daemon));

    let snaps = client.get_snaps(SnapSelect::Active, vec![]).await.unwrap();
    assert!(snaps.is_empty());

    let requests = daemon.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].target, "/v2/snaps");
    assert_eq!(requests[0].header("Host"), Some("placeholder"));
}

#[test_log::test(tokio::test)]
async fn three_partial_writes_decode_like_one() {
    let whole = MockResponse::sync(snaps());
    let header_len = whole
        .encode()
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .unwrap()
        + 4;
    let split = whole
        .clone()
        .split_at([10, header_len + 5], Duration::from_millis(20));

    let single = MockDaemon::start(move |_| whole.clone()).unwrap();
    let chunked = MockDaemon::start(move |_| split.clone()).unwrap();

    let expected = Client::new(config_for(&single))
        .get_snaps(SnapSelect::All, vec![])
        .await
        .unwrap();
    let actual = Client::new(config_for(&chunked))
        .get_snaps(SnapSelect::All, vec![])
        .await
        .unwrap();
    assert_eq!(actual, expected);
    assert_eq!(actual.len(), 2);
    assert_eq!(actual[0].name, "hello");
}

#[test_log::test(tokio::test)]
async fn body_delimited_by_close() {
    let daemon =
        MockDaemon::start(|_| MockResponse::sync(snaps()).without_content_length()).unwrap();
    let snaps = Client::new(config_for(&daemon))
        .get_snaps(SnapSelect::Active, vec![])
        .await
        .unwrap();
    assert_eq!(snaps.len(), 2);
}

#[test_log::test(tokio::test)]
async fn two_factor_required_keeps_message() {
    let daemon = MockDaemon::start(|_| {
        MockResponse::error(401, Some("two-factor-required"), "two-factor authentication required")
    })
    .unwrap();
    let client = Client::new(config_for(&daemon));

    let err = client
        .login("user@example.com", "secret", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TwoFactorRequired);
    assert_eq!(err.to_string(), "two-factor authentication required");

    let request = &daemon.requests()[0];
    assert_eq!(request.path, "/v2/login");
    assert_eq!(
        request.json(),
        json!({"email": "user@example.com", "password": "secret"})
    );
}

#[test_log::test(tokio::test)]
async fn cancelling_install_stops_polling() {
    let daemon = MockDaemon::start(|request| match request.path.as_str() {
        "/v2/snaps/hello" => MockResponse::async_change("7"),
        "/v2/changes/7" => MockResponse::sync(change("7", "Doing", false, 3)),
        _ => MockResponse::error(404, None, "not found"),
    })
    .unwrap();
    let client = Client::new(config_for(&daemon));

    let operation = client.spawn(
        snapd_client::SnapAction::new(snapd_client::SnapActionKind::Install, "hello"),
    );
    eventually(|| daemon.requests_to("/v2/changes/7") >= 2).await;
    operation.cancel();
    let err = operation.await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    // a poll already on the wire may still land
    tokio::time::sleep(Duration::from_millis(50)).await;
    let polls = daemon.requests_to("/v2/changes/7");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(daemon.requests_to("/v2/changes/7"), polls);

    // the change was never aborted
    assert!(
        daemon
            .requests()
            .iter()
            .all(|request| request.method == "GET" || request.path == "/v2/snaps/hello")
    );
}

#[test_log::test(tokio::test)]
async fn install_follows_change_and_reports_progress() {
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    let daemon = MockDaemon::start(move |request| match request.path.as_str() {
        "/v2/snaps/hello" => MockResponse::async_change("9"),
        "/v2/changes/9" => match counter.fetch_add(1, Ordering::SeqCst) {
            0 => MockResponse::sync(change("9", "Doing", false, 2)),
            1 => MockResponse::sync(change("9", "Doing", false, 6)),
            _ => MockResponse::sync(change("9", "Done", true, 10)),
        },
        _ => MockResponse::error(404, None, "not found"),
    })
    .unwrap();
    let client = Client::new(config_for(&daemon));

    let mut operation = client.spawn(
        snapd_client::SnapAction::new(snapd_client::SnapActionKind::Install, "hello")
            .with_options(SnapActionOptions {
                channel: Some("beta".into()),
                ..SnapActionOptions::default()
            }),
    );
    let mut progress = operation.progress().unwrap();
    assert!(operation.progress().is_none());
    operation.await.unwrap();

    let mut seen = Vec::new();
    while let Some(event) = progress.recv().await {
        seen.push(event.totals());
    }
    assert_eq!(seen, vec![(2, 10), (6, 10)]);
    assert_eq!(polls.load(Ordering::SeqCst), 3);
    assert_eq!(
        daemon.requests()[0].json(),
        json!({"action": "install", "channel": "beta"})
    );
}

#[test_log::test(tokio::test)]
async fn failed_change_is_an_error() {
    let daemon = MockDaemon::start(|request| match request.path.as_str() {
        "/v2/snaps/hello" => MockResponse::async_change("3"),
        _ => MockResponse::sync(json!({
            "id": "3", "status": "Error", "ready": true,
            "err": "cannot remove \"hello\": snap is in use"
        })),
    })
    .unwrap();
    let client = Client::new(config_for(&daemon));

    let err = client
        .remove("hello", SnapActionOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Failed);
    match err {
        Error::ChangeFailed { id, message } => {
            assert_eq!(id, "3");
            assert_eq!(message, "cannot remove \"hello\": snap is in use");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test_log::test(tokio::test)]
async fn long_poll_waits_on_change_notices() {
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    let daemon = MockDaemon::start(move |request| match request.path.as_str() {
        "/v2/snaps" => MockResponse::async_change("5"),
        "/v2/changes/5" => {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                MockResponse::sync(change("5", "Doing", false, 1))
            } else {
                MockResponse::sync(json!({
                    "id": "5", "status": "Done", "ready": true,
                    "data": {"snap-names": ["hello", "lxd"]}
                }))
            }
        }
        "/v2/notices" => MockResponse::sync(json!([{
            "id": "12", "type": "change-update", "key": "5",
            "first-occurred": "2024-03-01T12:00:00.5Z",
            "last-occurred": "2024-03-01T12:00:01.123456789Z",
            "last-repeated": "2024-03-01T12:00:01.123456789Z",
            "occurrences": 2
        }])),
        _ => MockResponse::error(404, None, "not found"),
    })
    .unwrap();
    let client = Client::new(ClientConfig {
        long_poll: true,
        long_poll_timeout_ms: 2_000,
        ..config_for(&daemon)
    });

    let refreshed = client.refresh_all().await.unwrap();
    assert_eq!(refreshed, vec!["hello".to_string(), "lxd".to_string()]);

    let notices: Vec<_> = daemon
        .requests()
        .into_iter()
        .filter(|request| request.path == "/v2/notices")
        .collect();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].query_value("types"), Some("change-update"));
    assert_eq!(notices[0].query_value("keys"), Some("5"));
    assert_eq!(notices[0].query_value("timeout"), Some("2s"));
}

#[rstest]
#[case::spaces_and_ampersand("hello world & friends")]
#[case::reserved("a=b?c/d#e+f")]
#[case::percent("100%")]
#[case::unicode("café ☕")]
#[test_log::test(tokio::test)]
async fn query_values_survive_the_wire(#[case] query: &str) {
    let daemon = MockDaemon::start(|_| MockResponse::sync(json!([]))).unwrap();
    let client = Client::new(config_for(&daemon));

    let found = client.find(Find::query(query)).await.unwrap();
    assert!(found.snaps.is_empty());
    assert_eq!(daemon.requests()[0].query_value("q"), Some(query));
}

#[test_log::test(tokio::test)]
async fn path_segments_are_escaped() {
    let daemon = MockDaemon::start(|_| MockResponse::sync(json!({"name": "odd name"}))).unwrap();
    let client = Client::new(config_for(&daemon));

    let snap = client.get_snap("odd name/..").await.unwrap();
    assert_eq!(snap.name, "odd name");
    let request = &daemon.requests()[0];
    assert_eq!(request.target, "/v2/snaps/odd%20name%2F..");
    assert_eq!(request.path, "/v2/snaps/odd name/..");
}

#[cfg(target_os = "linux")]
#[test_log::test(tokio::test)]
async fn abstract_socket_address() {
    let name = format!("snapd-rs-test-{}", std::process::id());
    let daemon = MockDaemon::start_abstract(&name, |_| {
        MockResponse::sync(json!({"series": "16", "version": "2.61", "on-classic": true}))
    })
    .unwrap();
    assert_eq!(daemon.address(), format!("@{name}"));

    let info = Client::new(config_for(&daemon))
        .get_system_information()
        .await
        .unwrap();
    assert_eq!(info.version, "2.61");
    assert!(info.on_classic);
}

#[test_log::test(tokio::test)]
async fn unreachable_socket_is_connection_failed() {
    let dir = tempfile::tempdir().unwrap();
    let client = Client::new(ClientConfig {
        socket_path: dir.path().join("missing.socket").display().to_string(),
        ..ClientConfig::default()
    });
    let err = client.get_system_information().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
}

#[test_log::test(tokio::test)]
async fn snapctl_failure_is_relayed_with_exit_code() {
    let daemon = MockDaemon::start(|_| {
        MockResponse::json(
            200,
            json!({
                "type": "error", "status-code": 200,
                "result": {
                    "kind": "unsuccessful",
                    "message": "snapctl exited with status 2",
                    "value": {"stdout": "", "stderr": "error: unknown key\n", "exit-code": 2}
                }
            }),
        )
    })
    .unwrap();
    let client = Client::new(config_for(&daemon));

    let output = client
        .run_snapctl(RunSnapctl::new(["get", "nope"]).with_context_id("cookie"))
        .await
        .unwrap();
    assert_eq!(output.exit_code, 2);
    assert_eq!(output.stderr, "error: unknown key\n");

    let request = &daemon.requests()[0];
    assert_eq!(request.path, "/v2/snapctl");
    assert_eq!(request.json()["context-id"], "cookie");
}

#[test_log::test(tokio::test)]
async fn maintenance_accompanies_result() {
    let daemon = MockDaemon::start(|_| {
        MockResponse::json(
            200,
            json!({
                "type": "sync", "status-code": 200, "result": [],
                "maintenance": {"kind": "daemon-restart", "message": "daemon is restarting"}
            }),
        )
    })
    .unwrap();
    let client = Client::new(config_for(&daemon));
    assert!(client.maintenance().is_none());

    let changes = client
        .get_changes(snapd_client::ChangeFilter::All, None)
        .await
        .unwrap();
    assert!(changes.is_empty());
    let maintenance = client.maintenance().unwrap();
    assert_eq!(maintenance.kind, "daemon-restart");
}

#[test_log::test(tokio::test)]
async fn auth_data_is_attached_until_replaced() {
    let daemon = MockDaemon::start(|_| MockResponse::sync(json!([]))).unwrap();
    let client = Client::new(ClientConfig {
        user_agent: Some("snapd-rs-tests".into()),
        allow_interaction: true,
        ..config_for(&daemon)
    });

    client.set_auth_data(Some(AuthData::new("root", vec!["d1".into(), "d2".into()])));
    client.get_users().await.unwrap();
    client.set_auth_data(None);
    client.get_users().await.unwrap();

    let requests = daemon.requests();
    assert_eq!(
        requests[0].header("Authorization"),
        Some(r#"Macaroon root="root", discharge="d1", discharge="d2""#)
    );
    assert_eq!(requests[0].header("User-Agent"), Some("snapd-rs-tests"));
    assert_eq!(requests[0].header("X-Allow-Interaction"), Some("true"));
    assert_eq!(requests[1].header("Authorization"), None);
}

#[test_log::test(tokio::test)]
async fn concurrent_calls_use_separate_connections() {
    let daemon = MockDaemon::start(|_| {
        MockResponse::sync(snaps()).split_at([20], Duration::from_millis(30))
    })
    .unwrap();
    let client = Client::new(config_for(&daemon));

    let calls = (0..4).map(|_| {
        let client = client.clone();
        async move { client.get_snaps(SnapSelect::Active, vec![]).await }
    });
    let results = futures::future::join_all(calls).await;
    assert!(results.iter().all(|result| result.as_ref().unwrap().len() == 2));
    assert_eq!(daemon.request_count(), 4);
}

#[test_log::test(tokio::test)]
async fn metrics_count_requests_by_outcome() {
    let daemon = MockDaemon::start(|request| match request.path.as_str() {
        "/v2/snaps" => MockResponse::sync(json!([])),
        _ => MockResponse::error(404, Some("snap-not-found"), "snap not found"),
    })
    .unwrap();
    let registry = prometheus::Registry::new();
    let metrics = Arc::new(ClientMetrics::new("test", &registry).unwrap());
    let client = Client::with_metrics(config_for(&daemon), metrics.clone());

    client.get_snaps(SnapSelect::Active, vec![]).await.unwrap();
    let err = client.get_snap("missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(
        metrics
            .requests
            .with_label_values(&["get-snaps", "ok"])
            .get(),
        1
    );
    assert_eq!(
        metrics
            .requests
            .with_label_values(&["get-snap", "NotFound"])
            .get(),
        1
    );
}

#[test]
fn blocking_client_runs_to_completion() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    let daemon = runtime
        .block_on(async {
            MockDaemon::start(move |request| match request.path.as_str() {
                "/v2/apps" if request.method == "POST" => MockResponse::async_change("11"),
                "/v2/apps" => MockResponse::sync(json!([
                    {"snap": "lxd", "name": "daemon", "daemon": "simple", "active": true}
                ])),
                _ => {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        MockResponse::sync(change("11", "Doing", false, 0))
                    } else {
                        MockResponse::sync(json!({"id": "11", "status": "Done", "ready": true}))
                    }
                }
            })
        })
        .unwrap();

    let client = BlockingClient::new(config_for(&daemon)).unwrap();
    let apps = client.get_apps(vec!["lxd".into()], true).unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].daemon.as_deref(), Some("simple"));

    client
        .control_apps(
            vec!["lxd.daemon".into()],
            snapd_client::AppAction::Restart { reload: true },
        )
        .unwrap();
    assert_eq!(polls.load(Ordering::SeqCst), 2);
    let restart = daemon
        .requests()
        .into_iter()
        .find(|request| request.method == "POST")
        .unwrap();
    assert_eq!(
        restart.json(),
        json!({"action": "restart", "names": ["lxd.daemon"], "reload": true})
    );
}
