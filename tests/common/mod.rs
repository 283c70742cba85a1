//! Shared helpers for the HTTP mock server and an in-process real-time server.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request as HandshakeRequest, Response as HandshakeResponse,
};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use wiremock::{MockServer, Request};

// ---------------------------------------------------------------------------
// HTTP backend helpers (wiremock)
// ---------------------------------------------------------------------------

/// Requests the mock server received for `path`, in arrival order.
pub async fn requests_to(server: &MockServer, path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == path)
        .collect()
}

/// Wait (bounded) for the first request to `path`. Covers detached senders.
pub async fn wait_for_request(server: &MockServer, path: &str) -> Request {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if let Some(r) = requests_to(server, path).await.into_iter().next() {
            return r;
        }
        assert!(tokio::time::Instant::now() < deadline, "no request to {path} arrived");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

pub fn json_body(request: &Request) -> serde_json::Value {
    request.body_json().expect("request body is JSON")
}

/// An address nothing listens on.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

// ---------------------------------------------------------------------------
// Mock real-time server
// ---------------------------------------------------------------------------

pub struct MockRealtimeServer {
    pub addr: SocketAddr,
    /// Request URI of every accepted handshake.
    pub handshakes: mpsc::UnboundedReceiver<String>,
    /// One entry per connection the client closed.
    pub client_closes: mpsc::UnboundedReceiver<()>,
    close_all: broadcast::Sender<()>,
}

impl MockRealtimeServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (hs_tx, handshakes) = mpsc::unbounded_channel();
        let (closed_tx, client_closes) = mpsc::unbounded_channel();
        let (close_all, _) = broadcast::channel(8);

        let close_signal = close_all.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { return };
                let hs_tx = hs_tx.clone();
                let closed_tx = closed_tx.clone();
                let mut close_rx = close_signal.subscribe();
                tokio::spawn(async move {
                    let record = move |req: &HandshakeRequest, resp: HandshakeResponse| -> Result<HandshakeResponse, ErrorResponse> {
                        let _ = hs_tx.send(req.uri().to_string());
                        Ok(resp)
                    };
                    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, record).await else {
                        return;
                    };
                    loop {
                        tokio::select! {
                            _ = close_rx.recv() => {
                                let _ = ws.close(None).await;
                                return;
                            }
                            msg = ws.next() => match msg {
                                Some(Ok(WsMessage::Close(_))) | None | Some(Err(_)) => {
                                    let _ = closed_tx.send(());
                                    return;
                                }
                                Some(Ok(WsMessage::Ping(p))) => {
                                    let _ = ws.send(WsMessage::Pong(p)).await;
                                }
                                Some(Ok(_)) => {}
                            },
                        }
                    }
                });
            }
        });

        Self {
            addr,
            handshakes,
            client_closes,
            close_all,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Close every open connection from the server side.
    pub fn close_all(&self) {
        let _ = self.close_all.send(());
    }
}
