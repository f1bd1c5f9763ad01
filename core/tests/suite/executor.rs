use std::sync::Arc;

use core_test_support::Action;
use core_test_support::CountingCookies;
use core_test_support::EDIT_PATH;
use core_test_support::FailingFor;
use core_test_support::FakeSession;
use core_test_support::PlaylistId;
use core_test_support::TEST_API_KEY;
use core_test_support::cookies;
use core_test_support::executor_for;
use core_test_support::http_transport;
use core_test_support::request_bodies;
use core_test_support::runtime_config;
use core_test_support::status;
use core_test_support::succeeded;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::Request;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;
use ytqf_core::ExecutorError;
use ytqf_core::MutationExecutor;
use ytqf_core::SessionError;
use ytqf_protocol::MutationResult;

fn header(request: &Request, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn add_succeeds_on_literal_collection_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EDIT_PATH))
        .and(query_param("key", TEST_API_KEY))
        .and(query_param("prettyPrint", "false"))
        .and(PlaylistId("PL123456789"))
        .respond_with(ResponseTemplate::new(200).set_body_json(succeeded()))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(
        &server,
        FakeSession::new(runtime_config()),
        cookies("PREF=f1; SAPISID=sapisid-secret"),
    );
    let result = executor.add("abc123", "PL123456789").await.unwrap();

    assert_eq!(
        result,
        MutationResult::added(
            vec!["STATUS_SUCCEEDED".to_string(), "STATUS_SUCCEEDED".to_string()],
            EDIT_PATH.to_string(),
            "PL123456789".to_string(),
        )
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(header(request, "content-type").as_deref(), Some("application/json"));
    assert_eq!(header(request, "x-origin").as_deref(), Some("https://www.youtube.com"));
    assert_eq!(header(request, "x-youtube-client-name").as_deref(), Some("1"));
    assert_eq!(
        header(request, "x-youtube-client-version").as_deref(),
        Some("2.20240101.00.00")
    );
    assert_eq!(header(request, "x-goog-authuser").as_deref(), Some("0"));
    assert_eq!(header(request, "x-goog-visitor-id").as_deref(), Some("visitor-123"));
    assert_eq!(header(request, "x-youtube-bootstrap-logged-in").as_deref(), Some("true"));
    assert_eq!(header(request, "x-goog-pageid"), None);
    assert_eq!(
        header(request, "cookie").as_deref(),
        Some("PREF=f1; SAPISID=sapisid-secret")
    );
    let authorization = header(request, "authorization").expect("signed request");
    let (scheme, value) = authorization.split_once(' ').expect("scheme and value");
    assert_eq!(scheme, "SAPISIDHASH");
    let (timestamp, digest) = value.split_once('_').expect("timestamp_digest");
    assert!(timestamp.parse::<i64>().is_ok(), "timestamp was {timestamp}");
    assert_eq!(digest.len(), 40);

    let body = request.body_json::<serde_json::Value>().unwrap();
    assert_eq!(
        body,
        json!({
            "context": {
                "client": { "clientName": "WEB", "clientVersion": "2.20240101.00.00", "hl": "en" },
                "user": { "lockedSafetyMode": false },
            },
            "playlistId": "PL123456789",
            "actions": [{ "action": "ACTION_ADD_VIDEO", "addedVideoId": "abc123" }],
        })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn prefixed_collection_id_falls_back_to_stripped_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(PlaylistId("VLPL123456789"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "error": { "code": 400, "message": "Invalid playlist" } })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(PlaylistId("PL123456789"))
        .respond_with(ResponseTemplate::new(200).set_body_json(succeeded()))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(&server, FakeSession::new(runtime_config()), cookies(""));
    let result = executor.add("abc123", "VLPL123456789").await.unwrap();

    assert_eq!(result.message, "Added");
    assert_eq!(result.collection_id, "PL123456789");
    let tried: Vec<serde_json::Value> = request_bodies(&server)
        .await
        .into_iter()
        .map(|body| body["playlistId"].clone())
        .collect();
    assert_eq!(tried, vec![json!("VLPL123456789"), json!("PL123456789")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn remove_tries_next_action_shape_after_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(Action("ACTION_REMOVE_VIDEO_BY_VIDEO_ID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status("STATUS_FAILED")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(Action("ACTION_REMOVE_VIDEO"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status("STATUS_SUCCEEDED")))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(&server, FakeSession::new(runtime_config()), cookies(""));
    let result = executor.remove("abc123", "PL123456789").await.unwrap();

    assert_eq!(
        result,
        MutationResult::removed(
            vec!["STATUS_SUCCEEDED".to_string()],
            EDIT_PATH.to_string(),
            "PL123456789".to_string(),
        )
    );
    let bodies = request_bodies(&server).await;
    assert_eq!(
        bodies.iter().map(|b| b["actions"].clone()).collect::<Vec<_>>(),
        vec![
            json!([{ "action": "ACTION_REMOVE_VIDEO_BY_VIDEO_ID", "removedVideoId": "abc123" }]),
            json!([{ "action": "ACTION_REMOVE_VIDEO", "removedVideoId": "abc123" }]),
        ]
    );
    assert!(bodies.iter().all(|b| b["playlistId"] == "PL123456789"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cookies_are_read_once_per_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(Action("ACTION_REMOVE_VIDEO_BY_VIDEO_ID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status("STATUS_FAILED")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(Action("ACTION_REMOVE_VIDEO"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status("STATUS_SUCCEEDED")))
        .expect(1)
        .mount(&server)
        .await;

    let jar = CountingCookies::new("PREF=f1; SAPISID=sapisid-secret");
    let executor = MutationExecutor::new(
        FakeSession::new(runtime_config()),
        jar.clone(),
        http_transport(&server),
    );
    executor.remove("abc123", "PL123456789").await.unwrap();

    assert_eq!(jar.reads(), 2);
    for request in server.received_requests().await.unwrap() {
        assert_eq!(
            header(&request, "cookie").as_deref(),
            Some("PREF=f1; SAPISID=sapisid-secret")
        );
        assert!(header(&request, "authorization").is_some());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unsigned_request_can_still_succeed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status("STATUS_SUCCEEDED")))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(&server, FakeSession::new(runtime_config()), cookies("PREF=f1"));
    let result = executor.add("abc123", "PL123456789").await.unwrap();
    assert_eq!(result.message, "Added");

    let request = &server.received_requests().await.unwrap()[0];
    assert_eq!(header(request, "authorization"), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn already_member_marker_maps_to_distinct_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "STATUS_SUCCEEDED",
            "playlistEditResults": [{ "playlistEditVideoAlreadyInPlaylistResultData": {} }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(&server, FakeSession::new(runtime_config()), cookies(""));
    let result = executor.add("abc123", "PL123456789").await.unwrap();

    assert_eq!(result.message, "Already in playlist");
    assert_eq!(
        result.statuses,
        vec!["STATUS_SUCCEEDED".to_string(), "VIDEO_ALREADY_IN_PLAYLIST".to_string()]
    );
    assert_eq!(result.undo_request(ytqf_protocol::Operation::Add, "abc123", "PL123456789"), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exhausted_remove_reports_every_attempt_with_hint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status("STATUS_FAILED")))
        .expect(4)
        .mount(&server)
        .await;

    let executor = executor_for(&server, FakeSession::new(runtime_config()), cookies(""));
    let err = executor.remove("abc123", "PL123456789").await.unwrap_err();

    let ExecutorError::Exhausted(exhaustion) = &err else {
        panic!("expected exhaustion, got {err:?}");
    };
    assert_eq!(
        exhaustion.diagnostics,
        vec![
            format!("{EDIT_PATH}(PL123456789): STATUS_FAILED"),
            format!("{EDIT_PATH}(PL123456789): STATUS_FAILED"),
            format!("{EDIT_PATH}(VLPL123456789): STATUS_FAILED"),
            format!("{EDIT_PATH}(VLPL123456789): STATUS_FAILED"),
        ]
    );
    assert_eq!(
        err.to_string(),
        format!(
            "YouTube rejected remove action: {EDIT_PATH}(PL123456789): STATUS_FAILED | \
             {EDIT_PATH}(PL123456789): STATUS_FAILED | {EDIT_PATH}(VLPL123456789): STATUS_FAILED | \
             {EDIT_PATH}(VLPL123456789): STATUS_FAILED \
             (if this repeats, YouTube may require video-specific set IDs for removal)"
        )
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unrecognized_body_is_reported_with_its_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "responseContext": {}, "trackingParams": "x" })),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(&server, FakeSession::new(runtime_config()), cookies(""));
    let err = executor.add("abc123", "PL123456789").await.unwrap_err();

    assert_eq!(
        err.to_string(),
        format!(
            "YouTube rejected add action: \
             {EDIT_PATH}(PL123456789): no-playlistEditResults [responseContext,trackingParams] | \
             {EDIT_PATH}(VLPL123456789): no-playlistEditResults [no-payload] \
             (check playlist ownership/channel and that manual Save works for this playlist)"
        )
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn network_failure_continues_the_cascade() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(PlaylistId("VLPL123456789"))
        .respond_with(ResponseTemplate::new(200).set_body_json(succeeded()))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Arc::new(FailingFor {
        collection_id: "PL123456789".to_string(),
        inner: http_transport(&server),
    });
    let executor = MutationExecutor::new(
        FakeSession::new(runtime_config()),
        cookies(""),
        transport,
    );
    let result = executor.add("abc123", "PL123456789").await.unwrap();
    assert_eq!(result.collection_id, "VLPL123456789");

    let failing = MutationExecutor::new(
        FakeSession::new(runtime_config()),
        cookies(""),
        Arc::new(FailingFor {
            collection_id: "PLzzzzzzzzz".to_string(),
            inner: Arc::new(FailingFor {
                collection_id: "VLPLzzzzzzzzz".to_string(),
                inner: http_transport(&server),
            }),
        }),
    );
    let ExecutorError::Exhausted(exhaustion) =
        failing.add("abc123", "PLzzzzzzzzz").await.unwrap_err()
    else {
        panic!("expected exhaustion");
    };
    assert_eq!(exhaustion.diagnostics.len(), 2);
    assert!(
        exhaustion.diagnostics[0].starts_with(&format!("{EDIT_PATH}(PLzzzzzzzzz): network ")),
        "{:?}",
        exhaustion.diagnostics
    );
    assert!(exhaustion.diagnostics[1].starts_with(&format!("{EDIT_PATH}(VLPLzzzzzzzzz): network ")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn every_configured_endpoint_is_tried_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/first"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/second"))
        .respond_with(ResponseTemplate::new(200).set_body_json(succeeded()))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(&server, FakeSession::new(runtime_config()), cookies(""))
        .with_endpoints(vec!["/first".to_string(), "/second".to_string()]);
    let result = executor.add("abc123", "PL123456789").await.unwrap();

    assert_eq!(result.endpoint, "/second");
    assert_eq!(result.collection_id, "PL123456789");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delegated_session_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(succeeded()))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = runtime_config();
    config.delegated_session_id = "112233".to_string();
    config.session_index = "2".to_string();
    let executor = executor_for(&server, FakeSession::new(config), cookies(""));
    executor.add("abc123", "PL123456789").await.unwrap();

    let request = &server.received_requests().await.unwrap()[0];
    assert_eq!(header(request, "x-goog-pageid").as_deref(), Some("112233"));
    assert_eq!(header(request, "x-goog-authuser").as_deref(), Some("2"));
    let body = request.body_json::<serde_json::Value>().unwrap();
    assert_eq!(
        body["context"]["user"],
        json!({ "lockedSafetyMode": false, "onBehalfOfUser": "112233" })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn session_is_read_fresh_for_every_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("key", TEST_API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(succeeded()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(query_param("key", "rotated-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(succeeded()))
        .expect(1)
        .mount(&server)
        .await;

    let session = FakeSession::new(runtime_config());
    let executor = executor_for(&server, Arc::clone(&session), cookies(""));
    executor.add("abc123", "PL123456789").await.unwrap();

    let mut rotated = runtime_config();
    rotated.api_key = "rotated-key".to_string();
    session.set(rotated);
    executor.add("abc123", "PL123456789").await.unwrap();

    assert_eq!(session.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_session_aborts_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(succeeded()))
        .expect(0)
        .mount(&server)
        .await;

    let executor = executor_for(&server, FakeSession::unavailable(), cookies("SAPISID=x"));
    let err = executor.add("abc123", "PL123456789").await.unwrap_err();

    assert!(matches!(err, ExecutorError::ConfigUnavailable(SessionError::Unavailable)));
    assert_eq!(err.to_string(), "Could not access YouTube config (ytcfg).");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_identifiers_fail_without_touching_the_session() {
    let server = MockServer::start().await;
    let session = FakeSession::new(runtime_config());
    let executor = executor_for(&server, Arc::clone(&session), cookies(""));

    let err = executor.add("", "PL123456789").await.unwrap_err();
    assert!(matches!(err, ExecutorError::Precondition(_)));
    let err = executor.remove("abc123", "").await.unwrap_err();
    assert!(matches!(err, ExecutorError::Precondition(_)));

    assert_eq!(session.calls(), 0);
    assert!(server.received_requests().await.unwrap().is_empty());
}
