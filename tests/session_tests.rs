//! Session lifecycle over the real HTTP exchange and WebSocket transport.

mod common;

use std::time::Duration;

use common::{dead_addr, requests_to, MockRealtimeServer};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use agent_connect::{
    AppConfig, ConnectionOptions, ConnectionStatus, SessionController, SessionError,
    TokenExchangeClient, View, ViewController, WebSocketTransport,
};

const TOKEN: &str = "aGVhZGVy.cGF5bG9hZA.c2ln";
const WAIT: Duration = Duration::from_secs(3);

type Controller = SessionController<TokenExchangeClient, WebSocketTransport>;

async fn token_backend(reply: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/connection-details"))
        .respond_with(reply)
        .mount(&server)
        .await;
    server
}

fn controller_with(backend: &MockServer) -> Controller {
    let config = AppConfig {
        agent_name: "kora".into(),
        origin: Some(backend.uri()),
        ..Default::default()
    };
    let source = TokenExchangeClient::from_config(&config).unwrap();
    SessionController::new("kora", source, WebSocketTransport::new("/rtc"))
}

async fn controller_for(server_url: &str) -> (MockServer, Controller) {
    let backend = token_backend(
        ResponseTemplate::new(200).set_body_json(json!({ "participantToken": TOKEN, "serverUrl": server_url })),
    )
    .await;
    let controller = controller_with(&backend);
    (backend, controller)
}

async fn wait_for_status(controller: &Controller, want: ConnectionStatus) {
    let mut rx = controller.subscribe();
    tokio::time::timeout(WAIT, rx.wait_for(|s| *s == want))
        .await
        .unwrap_or_else(|_| panic!("status never became {want}"))
        .unwrap();
}

#[tokio::test]
async fn test_connect_opens_signal_channel_with_token() {
    let mut rt = MockRealtimeServer::start().await;
    let (_backend, controller) = controller_for(&rt.url()).await;

    let credential = controller
        .connect(&ConnectionOptions::default().with_voice("echo"))
        .await
        .unwrap();
    assert_eq!(credential.participant_token, TOKEN);
    assert_eq!(controller.status(), ConnectionStatus::Connected);

    let uri = tokio::time::timeout(WAIT, rt.handshakes.recv()).await.unwrap().unwrap();
    assert_eq!(uri, format!("/rtc?access_token={TOKEN}"));

    let session = controller.current_session().unwrap();
    assert_eq!(session.credential.server_url, rt.url());
}

#[tokio::test]
async fn test_disconnect_closes_transport_and_returns_to_idle() {
    let mut rt = MockRealtimeServer::start().await;
    let (_backend, controller) = controller_for(&rt.url()).await;
    controller.connect(&ConnectionOptions::default()).await.unwrap();

    controller.disconnect();
    assert_eq!(controller.status(), ConnectionStatus::Idle);
    assert!(controller.current_session().is_none());
    tokio::time::timeout(WAIT, rt.client_closes.recv())
        .await
        .expect("server never saw the client close")
        .unwrap();
}

#[tokio::test]
async fn test_peer_close_marks_disconnected_and_flips_view_back() {
    let rt = MockRealtimeServer::start().await;
    let (_backend, controller) = controller_for(&rt.url()).await;
    let mut views = ViewController::new(controller.subscribe());

    controller.connect(&ConnectionOptions::default()).await.unwrap();
    let t = tokio::time::timeout(WAIT, views.next_transition()).await.unwrap().unwrap();
    assert_eq!((t.from, t.to), (View::Welcome, View::Session));

    rt.close_all();
    wait_for_status(&controller, ConnectionStatus::Disconnected).await;
    assert!(controller.current_session().is_none());

    let t = tokio::time::timeout(WAIT, views.next_transition()).await.unwrap().unwrap();
    assert_eq!((t.from, t.to), (View::Session, View::Welcome));
}

#[tokio::test]
async fn test_reconnect_replaces_the_live_session() {
    let mut rt = MockRealtimeServer::start().await;
    let (backend, controller) = controller_for(&rt.url()).await;

    controller.connect(&ConnectionOptions::default()).await.unwrap();
    let first = controller.current_session().unwrap();

    controller
        .connect(&ConnectionOptions::default().with_language("de"))
        .await
        .unwrap();
    let second = controller.current_session().unwrap();

    assert_ne!(first.id, second.id);
    assert!(second.attempt > first.attempt);
    assert_eq!(controller.status(), ConnectionStatus::Connected);
    tokio::time::timeout(WAIT, rt.client_closes.recv())
        .await
        .expect("first session was not closed")
        .unwrap();
    assert_eq!(requests_to(&backend, "/api/connection-details").await.len(), 2);
}

#[tokio::test]
async fn test_exchange_failure_returns_to_idle_with_error() {
    let backend = token_backend(ResponseTemplate::new(503).set_body_string("down")).await;
    let controller = controller_with(&backend);

    let err = controller.connect(&ConnectionOptions::default()).await.unwrap_err();
    match err {
        SessionError::Exchange(e) => assert_eq!(e.status(), Some(503)),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(controller.status(), ConnectionStatus::Idle);
    assert!(controller.last_error().is_some());
    assert!(controller.current_session().is_none());
}

#[tokio::test]
async fn test_unreachable_realtime_server_is_transport_error() {
    let dead = format!("ws://{}", dead_addr().await);
    let (_backend, controller) = controller_for(&dead).await;

    let err = controller.connect(&ConnectionOptions::default()).await.unwrap_err();
    assert!(matches!(err, SessionError::Transport { .. }), "got {err:?}");
    assert_eq!(controller.status(), ConnectionStatus::Idle);
}
