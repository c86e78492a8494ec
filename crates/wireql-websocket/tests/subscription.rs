//! Integration tests driving a real in-process graphql-ws server.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    Request as HandshakeRequest, Response as HandshakeResponse,
};
use tokio_tungstenite::tungstenite::http::HeaderValue;

use wireql_protocol::{ClientError, Request, TransportError};
use wireql_websocket::{SessionState, SubscriptionConfig, SubscriptionSession};

type ServerWs = WebSocketStream<TcpStream>;

/// Bind an ephemeral port and run `script` against the first connection.
async fn serve_once<F, Fut>(script: F) -> (String, JoinHandle<()>)
where
    F: FnOnce(ServerWs) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        // Echo the graphql-ws subprotocol the client negotiates, otherwise
        // tungstenite's client rejects the handshake.
        let ws = tokio_tungstenite::accept_hdr_async(
            stream,
            |_req: &HandshakeRequest, mut response: HandshakeResponse| {
                response.headers_mut().insert(
                    "Sec-WebSocket-Protocol",
                    HeaderValue::from_static("graphql-ws"),
                );
                Ok(response)
            },
        )
        .await
        .unwrap();
        script(ws).await;
    });
    (format!("ws://{addr}"), handle)
}

/// Read frames until a text frame arrives; assert its `type` and return it.
async fn expect_type(ws: &mut ServerWs, expected: &str) -> Value {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                let value: Value = serde_json::from_str(text.as_str()).unwrap();
                assert_eq!(value["type"], expected, "frame: {value}");
                return value;
            }
            Some(Ok(_)) => continue,
            other => panic!("expected `{expected}` frame, got {other:?}"),
        }
    }
}

async fn send_json(ws: &mut ServerWs, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

/// Handshake from the server side: init → ack → start.
async fn accept_subscription(ws: &mut ServerWs) -> Value {
    expect_type(ws, "connection_init").await;
    send_json(ws, json!({"type": "connection_ack"})).await;
    expect_type(ws, "start").await
}

fn book_added_request() -> Request {
    Request::new("subscription { bookAdded { id title } }")
}

#[tokio::test]
async fn yields_events_in_order_until_complete() {
    let (url, server) = serve_once(|mut ws| async move {
        let start = accept_subscription(&mut ws).await;
        assert_eq!(start["id"], "1");
        assert_eq!(
            start["payload"]["query"],
            "subscription { bookAdded { id title } }"
        );

        for n in [1, 2] {
            send_json(
                &mut ws,
                json!({"type": "data", "id": "1", "payload": {"data": {"bookAdded": {"id": n}}}}),
            )
            .await;
        }
        send_json(&mut ws, json!({"type": "complete", "id": "1"})).await;
    })
    .await;

    let mut session = SubscriptionSession::connect(SubscriptionConfig::new(url), &book_added_request())
        .await
        .unwrap();

    // Consume through the Stream impl to exercise it.
    let first = session.next().await.unwrap().unwrap();
    assert_eq!(first, json!({"bookAdded": {"id": 1}}));
    let second = session.next().await.unwrap().unwrap();
    assert_eq!(second, json!({"bookAdded": {"id": 2}}));

    // No further elements after `complete`.
    assert!(session.next().await.is_none());
    assert_eq!(session.state().await, SessionState::Complete);

    // Closing a completed session is a no-op.
    session.close().await.unwrap();
    assert_eq!(session.state().await, SessionState::Complete);

    server.await.unwrap();
}

#[tokio::test]
async fn server_error_fails_the_session() {
    let (url, server) = serve_once(|mut ws| async move {
        accept_subscription(&mut ws).await;
        send_json(
            &mut ws,
            json!({"type": "error", "id": "1", "payload": [{"message": "subscription denied"}]}),
        )
        .await;
    })
    .await;

    let mut session = SubscriptionSession::connect(SubscriptionConfig::new(url), &book_added_request())
        .await
        .unwrap();

    match session.next_event().await {
        Some(Err(ClientError::Execution(e))) => {
            assert_eq!(e.errors[0].message, "subscription denied");
        }
        other => panic!("expected an execution error, got {other:?}"),
    }
    assert!(session.next_event().await.is_none());
    assert_eq!(session.state().await, SessionState::Failed);

    server.await.unwrap();
}

#[tokio::test]
async fn speaking_before_ack_is_a_protocol_violation() {
    let (url, server) = serve_once(|mut ws| async move {
        expect_type(&mut ws, "connection_init").await;
        send_json(
            &mut ws,
            json!({"type": "data", "id": "1", "payload": {"data": {}}}),
        )
        .await;
    })
    .await;

    let err = SubscriptionSession::connect(SubscriptionConfig::new(url), &book_added_request())
        .await
        .unwrap_err();

    match err {
        ClientError::Protocol(v) => {
            assert_eq!(v.state, "ack-pending");
            assert_eq!(v.received, "data");
        }
        other => panic!("expected a protocol violation, got {other:?}"),
    }

    server.await.unwrap();
}

#[tokio::test]
async fn close_sends_stop_and_releases_the_connection() {
    let (url, server) = serve_once(|mut ws| async move {
        accept_subscription(&mut ws).await;
        send_json(
            &mut ws,
            json!({"type": "data", "id": "1", "payload": {"data": {"bookAdded": {"id": 1}}}}),
        )
        .await;
        let stop = expect_type(&mut ws, "stop").await;
        assert_eq!(stop["id"], "1");
    })
    .await;

    let mut session = SubscriptionSession::connect(SubscriptionConfig::new(url), &book_added_request())
        .await
        .unwrap();

    assert!(session.next_event().await.unwrap().is_ok());
    session.close().await.unwrap();
    assert_eq!(session.state().await, SessionState::Closed);

    // The server observed the stop frame.
    server.await.unwrap();
}

#[tokio::test]
async fn ack_deadline_times_out_into_failure() {
    let (url, _server) = serve_once(|mut ws| async move {
        // Accept the socket but never acknowledge.
        expect_type(&mut ws, "connection_init").await;
        tokio::time::sleep(Duration::from_secs(30)).await;
    })
    .await;

    let config = SubscriptionConfig::new(url).connect_timeout(Duration::from_millis(200));
    let err = SubscriptionSession::connect(config, &book_added_request())
        .await
        .unwrap_err();

    match err {
        ClientError::Transport(TransportError::Timeout { operation, .. }) => {
            assert_eq!(operation, "subscription connect");
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_message_type_while_active_fails_the_session() {
    let (url, server) = serve_once(|mut ws| async move {
        accept_subscription(&mut ws).await;
        send_json(&mut ws, json!({"type": "ka"})).await;
    })
    .await;

    let mut session = SubscriptionSession::connect(SubscriptionConfig::new(url), &book_added_request())
        .await
        .unwrap();

    match session.next_event().await {
        Some(Err(ClientError::Protocol(v))) => {
            assert_eq!(v.received, "ka");
            assert_eq!(v.state, "active");
        }
        other => panic!("expected a protocol violation, got {other:?}"),
    }
    assert_eq!(session.state().await, SessionState::Failed);

    server.await.unwrap();
}

#[tokio::test]
async fn events_for_other_subscription_ids_are_ignored() {
    let (url, server) = serve_once(|mut ws| async move {
        accept_subscription(&mut ws).await;
        send_json(
            &mut ws,
            json!({"type": "data", "id": "99", "payload": {"data": {"stray": true}}}),
        )
        .await;
        send_json(
            &mut ws,
            json!({"type": "data", "id": "1", "payload": {"data": {"bookAdded": {"id": 1}}}}),
        )
        .await;
        send_json(&mut ws, json!({"type": "complete", "id": "1"})).await;
    })
    .await;

    let mut session = SubscriptionSession::connect(SubscriptionConfig::new(url), &book_added_request())
        .await
        .unwrap();

    let only = session.next_event().await.unwrap().unwrap();
    assert_eq!(only, json!({"bookAdded": {"id": 1}}));
    assert!(session.next_event().await.is_none());

    server.await.unwrap();
}

#[tokio::test]
async fn variables_travel_in_the_start_payload() {
    let (url, server) = serve_once(|mut ws| async move {
        let start = accept_subscription(&mut ws).await;
        assert_eq!(start["payload"]["variables"], json!({"genre": "dystopian"}));
        send_json(&mut ws, json!({"type": "complete", "id": "1"})).await;
    })
    .await;

    let request = Request::new("subscription ($genre: String!) { bookAdded(genre: $genre) { id } }")
        .variable("genre", "dystopian");
    let mut session = SubscriptionSession::connect(SubscriptionConfig::new(url), &request)
        .await
        .unwrap();

    assert!(session.next_event().await.is_none());
    server.await.unwrap();
}
