//! Both contexts wired over one in-process bus, against a mock remote.

use std::sync::Arc;
use std::time::Duration;

use core_test_support::FakeSession;
use core_test_support::PlaylistId;
use core_test_support::cookies;
use core_test_support::executor_for;
use core_test_support::runtime_config;
use core_test_support::status;
use core_test_support::succeeded;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use ytqf_bus::BusError;
use ytqf_bus::ContextOrigin;
use ytqf_bus::Envelope;
use ytqf_bus::LocalBus;
use ytqf_bus::MessageBus;
use ytqf_bus::RelayClient;
use ytqf_core::Bridge;
use ytqf_protocol::CONTENT_SOURCE;
use ytqf_protocol::ResponseMessage;

struct Relay {
    local: LocalBus,
    bus: Arc<dyn MessageBus>,
    origin: ContextOrigin,
    shutdown: CancellationToken,
    bridge: tokio::task::JoinHandle<()>,
}

fn start_relay(server: &MockServer) -> Relay {
    let local = LocalBus::new();
    let bus: Arc<dyn MessageBus> = Arc::new(local.clone());
    let origin = ContextOrigin::unique();
    let executor = Arc::new(executor_for(
        server,
        FakeSession::new(runtime_config()),
        cookies("SAPISID=secret"),
    ));
    let shutdown = CancellationToken::new();
    let bridge = Bridge::new(Arc::clone(&bus), origin, executor).spawn(shutdown.clone());
    Relay {
        local,
        bus,
        origin,
        shutdown,
        bridge,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn add_round_trips_through_the_bridge() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(succeeded()))
        .expect(1)
        .mount(&server)
        .await;

    let relay = start_relay(&server);
    let client = RelayClient::start(Arc::clone(&relay.bus), relay.origin);
    let detail = client.add("abc123", "PL123456789").await.unwrap().unwrap();

    assert_eq!(detail.message, "Added");
    assert_eq!(detail.collection_id, "PL123456789");
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exhausted_cascade_surfaces_as_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status("STATUS_FAILED")))
        .expect(4)
        .mount(&server)
        .await;

    let relay = start_relay(&server);
    let client = RelayClient::start(Arc::clone(&relay.bus), relay.origin);
    let err = client.remove("abc123", "PL123456789").await.unwrap_err();

    let BusError::Rejected(message) = &err else {
        panic!("expected rejection, got {err:?}");
    };
    assert!(message.starts_with("YouTube rejected remove action: "), "{message}");
    assert!(
        message.ends_with("(if this repeats, YouTube may require video-specific set IDs for removal)"),
        "{message}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_settle_independently() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(PlaylistId("PLaaaaaaaaaa"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(succeeded())
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(PlaylistId("PLbbbbbbbbbb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status("STATUS_SUCCEEDED")))
        .mount(&server)
        .await;

    let relay = start_relay(&server);
    let client = RelayClient::start(Arc::clone(&relay.bus), relay.origin);
    let (slow, fast) = tokio::join!(
        client.add("abc123", "PLaaaaaaaaaa"),
        client.remove("abc123", "PLbbbbbbbbbb"),
    );

    let slow = slow.unwrap().unwrap();
    let fast = fast.unwrap().unwrap();
    assert_eq!((slow.message.as_str(), slow.collection_id.as_str()), ("Added", "PLaaaaaaaaaa"));
    assert_eq!((fast.message.as_str(), fast.collection_id.as_str()), ("Removed", "PLbbbbbbbbbb"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn incomplete_request_gets_missing_payload_answer() {
    let server = MockServer::start().await;
    let relay = start_relay(&server);
    let mut responses = relay.bus.subscribe(Box::new(|envelope: &Envelope| {
        ResponseMessage::matches(&envelope.data)
    }));

    relay.bus.publish(Envelope::new(
        relay.origin,
        json!({
            "source": CONTENT_SOURCE,
            "type": "YTQF_ADD_TO_PLAYLIST",
            "requestId": "ytqf-1-0",
            "payload": { "itemId": "abc123" },
        }),
    ));

    let envelope = tokio::time::timeout(Duration::from_secs(5), responses.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        envelope.data,
        json!({
            "source": "YTQF_BRIDGE",
            "type": "YTQF_ADD_RESULT",
            "requestId": "ytqf-1-0",
            "ok": false,
            "error": "Missing request payload.",
        })
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn requests_from_other_origins_are_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(succeeded()))
        .expect(0)
        .mount(&server)
        .await;

    let relay = start_relay(&server);
    let foreign = RelayClient::with_timeout(
        Arc::clone(&relay.bus),
        ContextOrigin::unique(),
        Duration::from_millis(200),
    );
    let err = foreign.add("abc123", "PL123456789").await.unwrap_err();

    assert!(matches!(
        err,
        BusError::Timeout(ref message) if message == "Timed out while adding to playlist."
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_releases_the_bridge_subscription() {
    let server = MockServer::start().await;
    let relay = start_relay(&server);
    assert_eq!(relay.local.subscriber_count(), 1);

    relay.shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), relay.bridge)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(relay.local.subscriber_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn serve_answers_until_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status("STATUS_SUCCEEDED")))
        .expect(1)
        .mount(&server)
        .await;

    let local = LocalBus::new();
    let bus: Arc<dyn MessageBus> = Arc::new(local.clone());
    let origin = ContextOrigin::unique();
    let executor = Arc::new(executor_for(
        &server,
        FakeSession::new(runtime_config()),
        cookies("SAPISID=secret"),
    ));
    let shutdown = CancellationToken::new();
    let serving = tokio::spawn(Bridge::new(Arc::clone(&bus), origin, executor).serve(shutdown.clone()));

    // `serve` subscribes on its own task; wait for it before publishing.
    tokio::time::timeout(Duration::from_secs(5), async {
        while local.subscriber_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let client = RelayClient::start(Arc::clone(&bus), origin);
    let detail = client.remove("abc123", "PL123456789").await.unwrap().unwrap();
    assert_eq!(detail.message, "Removed");
    drop(client);

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .unwrap()
        .unwrap();
    // The client's listener is aborted asynchronously on drop.
    tokio::time::timeout(Duration::from_secs(5), async {
        while local.subscriber_count() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}
