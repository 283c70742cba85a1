//! Real-time transport opened with an issued credential.
//!
//! Opening a transport performs the handshake and hands back a [`LinkDriver`]:
//! a future that owns the live connection and resolves once it is over. The
//! session layer spawns the driver and stops it through the shutdown channel
//! passed to [`RealtimeTransport::open`].

use std::future::Future;

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, trace};

use crate::credential::SessionCredential;
use crate::error::SessionError;

/// Future driving one open connection until it ends.
pub type LinkDriver = BoxFuture<'static, LinkEnd>;

/// Why a link stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEnd {
    /// Torn down locally (disconnect, or superseded by a newer attempt).
    Shutdown,
    ClosedByPeer,
    Failed(String),
}

pub trait RealtimeTransport: Send + Sync + 'static {
    /// Open a connection for `credential`. Resolves once the handshake is done.
    ///
    /// The returned driver must finish with [`LinkEnd::Shutdown`] soon after
    /// `shutdown` fires or its sender is dropped.
    fn open(
        &self,
        credential: SessionCredential,
        shutdown: oneshot::Receiver<()>,
    ) -> impl Future<Output = Result<LinkDriver, SessionError>> + Send;
}

/// WebSocket signalling transport (`<serverUrl><signal_path>?access_token=...`).
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    signal_path: String,
}

impl WebSocketTransport {
    pub fn new(signal_path: impl Into<String>) -> Self {
        Self {
            signal_path: signal_path.into(),
        }
    }
}

/// Build the signalling URL. `http`/`https` server URLs are mapped to `ws`/`wss`.
pub fn signal_url(server_url: &str, signal_path: &str, token: &str) -> Result<Url, SessionError> {
    let invalid = |detail: String| SessionError::Transport {
        url: server_url.to_string(),
        detail,
    };
    let mut url = Url::parse(server_url).map_err(|e| invalid(e.to_string()))?;
    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    };
    url.set_scheme(scheme)
        .map_err(|_| invalid(format!("cannot switch to scheme '{scheme}'")))?;

    let path = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        signal_path.trim_start_matches('/')
    );
    url.set_path(&path);
    url.query_pairs_mut().append_pair("access_token", token);
    Ok(url)
}

impl RealtimeTransport for WebSocketTransport {
    fn open(
        &self,
        credential: SessionCredential,
        shutdown: oneshot::Receiver<()>,
    ) -> impl Future<Output = Result<LinkDriver, SessionError>> + Send {
        let signal_path = self.signal_path.clone();
        async move {
            let url = signal_url(&credential.server_url, &signal_path, &credential.participant_token)?;
            debug!(server_url = %credential.server_url, "opening websocket transport");

            let (ws, _resp) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| SessionError::Transport {
                    url: credential.server_url.clone(),
                    detail: e.to_string(),
                })?;
            info!(server_url = %credential.server_url, "websocket transport open");

            let driver: LinkDriver = Box::pin(drive(ws, shutdown));
            Ok(driver)
        }
    }
}

async fn drive<S>(ws: tokio_tungstenite::WebSocketStream<S>, mut shutdown: oneshot::Receiver<()>) -> LinkEnd
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                let _ = sink.send(WsMessage::Close(None)).await;
                return LinkEnd::Shutdown;
            }
            msg = stream.next() => match msg {
                None | Some(Ok(WsMessage::Close(_))) => return LinkEnd::ClosedByPeer,
                Some(Err(e)) => return LinkEnd::Failed(e.to_string()),
                Some(Ok(frame)) => trace!(len = frame.len(), "signal frame"),
            },
        }
    }
}
