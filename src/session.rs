//! Connection session lifecycle and the single "current session" slot.
//!
//! ## Design
//! - [`SessionController`] owns one slot holding at most one live
//!   connection session plus a monotonically increasing attempt counter.
//! - Every `connect` bumps the counter and tears down whatever the slot held.
//!   Results of an attempt are applied only while its number is still the
//!   current one; anything older is discarded (last attempt wins).
//! - Status is published through a `tokio::sync::watch` channel so views can
//!   project it without tracking state of their own.
//!
//! ```text
//! Idle --connect--> Connecting --credential + transport ok--> Connected
//!   ^                   |                                       |
//!   +------ failure ----+                    peer close / error v
//!   +---------------------- disconnect ------------------- Disconnected
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::credential::SessionCredential;
use crate::error::SessionError;
use crate::exchange::CredentialSource;
use crate::options::ConnectionOptions;
use crate::payload::CredentialRequest;
use crate::transport::{LinkDriver, LinkEnd, RealtimeTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Connected,
    /// The transport dropped underneath a connected session.
    Disconnected,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionStatus::Idle => "idle",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        };
        write!(f, "{s}")
    }
}

/// The live transport bound to one issued credential.
struct ConnectionSession {
    id: Uuid,
    attempt: u64,
    credential: SessionCredential,
    shutdown: Option<oneshot::Sender<()>>,
}

impl ConnectionSession {
    /// Signal the link driver to close. The driver exits on its own.
    fn close(mut self) {
        debug!(session = %self.id, attempt = self.attempt, "tearing down session");
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Read-only view of the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: Uuid,
    pub attempt: u64,
    pub credential: SessionCredential,
}

#[derive(Default)]
struct Slot {
    attempt: u64,
    session: Option<ConnectionSession>,
    last_error: Option<String>,
}

struct Shared {
    slot: Mutex<Slot>,
    status: watch::Sender<ConnectionStatus>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new attempt, superseding any pending attempt and live session.
    fn begin_attempt(&self) -> u64 {
        let (attempt, previous) = {
            let mut slot = self.lock();
            slot.attempt += 1;
            slot.last_error = None;
            self.status.send_replace(ConnectionStatus::Connecting);
            (slot.attempt, slot.session.take())
        };
        if let Some(session) = previous {
            session.close();
        }
        attempt
    }

    fn is_current(&self, attempt: u64) -> bool {
        self.lock().attempt == attempt
    }

    /// Record a failed attempt. Failures of superseded attempts change nothing.
    fn fail(&self, attempt: u64, err: SessionError) -> SessionError {
        let mut slot = self.lock();
        if slot.attempt != attempt {
            debug!(attempt, error = %err, "discarding failure of superseded attempt");
            return SessionError::Superseded;
        }
        warn!(attempt, error = %err, "connect attempt failed");
        slot.last_error = Some(err.to_string());
        self.status.send_replace(ConnectionStatus::Idle);
        err
    }

    /// Make a freshly opened link the current session, unless the attempt went stale.
    fn install(
        self: &Arc<Self>,
        attempt: u64,
        credential: SessionCredential,
        shutdown: oneshot::Sender<()>,
        driver: LinkDriver,
    ) -> Result<Uuid, SessionError> {
        let mut slot = self.lock();
        if slot.attempt != attempt {
            drop(slot);
            debug!(attempt, "discarding transport of superseded attempt");
            let _ = shutdown.send(());
            tokio::spawn(driver);
            return Err(SessionError::Superseded);
        }

        let id = Uuid::new_v4();
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let end = driver.await;
            shared.link_ended(id, end);
        });

        info!(session = %id, attempt, server_url = %credential.server_url, "session connected");
        slot.session = Some(ConnectionSession {
            id,
            attempt,
            credential,
            shutdown: Some(shutdown),
        });
        self.status.send_replace(ConnectionStatus::Connected);
        Ok(id)
    }

    fn link_ended(&self, id: Uuid, end: LinkEnd) {
        let mut slot = self.lock();
        if slot.session.as_ref().map(|s| s.id) != Some(id) {
            return;
        }
        slot.session = None;
        match &end {
            LinkEnd::Failed(detail) => {
                warn!(session = %id, error = %detail, "transport failed");
                slot.last_error = Some(detail.clone());
            }
            _ => info!(session = %id, reason = ?end, "transport closed"),
        }
        self.status.send_replace(ConnectionStatus::Disconnected);
    }

    fn reset(&self) {
        let previous = {
            let mut slot = self.lock();
            slot.attempt += 1;
            slot.last_error = None;
            self.status.send_replace(ConnectionStatus::Idle);
            slot.session.take()
        };
        if let Some(session) = previous {
            session.close();
        }
    }
}

/// Drives connect/disconnect for one client. At most one session is current.
pub struct SessionController<S, T> {
    agent_name: String,
    source: S,
    transport: T,
    shared: Arc<Shared>,
}

impl<S: CredentialSource, T: RealtimeTransport> SessionController<S, T> {
    pub fn new(agent_name: impl Into<String>, source: S, transport: T) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Idle);
        Self {
            agent_name: agent_name.into(),
            source,
            transport,
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::default()),
                status,
            }),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status.borrow()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }

    /// Message of the most recent failure, cleared by the next connect or disconnect.
    pub fn last_error(&self) -> Option<String> {
        self.shared.lock().last_error.clone()
    }

    pub fn current_session(&self) -> Option<SessionInfo> {
        self.shared.lock().session.as_ref().map(|s| SessionInfo {
            id: s.id,
            attempt: s.attempt,
            credential: s.credential.clone(),
        })
    }

    /// Build a request from `options`, exchange it and open the transport.
    ///
    /// Supersedes any pending attempt and tears down the current session.
    /// On failure the status returns to `Idle` and the error is returned.
    /// If a newer `connect` or a `disconnect` overtakes this call, its result
    /// is discarded and `SessionError::Superseded` is returned.
    pub async fn connect(&self, options: &ConnectionOptions) -> Result<SessionCredential, SessionError> {
        let attempt = self.shared.begin_attempt();
        debug!(attempt, "connect attempt started");

        let request = CredentialRequest::build(&self.agent_name, options);
        let credential = match self.source.request_credential(request).await {
            Ok(c) => c,
            Err(e) => return Err(self.shared.fail(attempt, e.into())),
        };

        if !self.shared.is_current(attempt) {
            debug!(attempt, "discarding credential of superseded attempt");
            return Err(SessionError::Superseded);
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let driver = match self.transport.open(credential.clone(), shutdown_rx).await {
            Ok(d) => d,
            Err(e) => return Err(self.shared.fail(attempt, e)),
        };

        self.shared.install(attempt, credential.clone(), shutdown_tx, driver)?;
        Ok(credential)
    }

    /// Tear down the current session (if any) and abandon pending attempts.
    pub fn disconnect(&self) {
        debug!("disconnect requested");
        self.shared.reset();
    }
}

impl<S, T> Drop for SessionController<S, T> {
    fn drop(&mut self) {
        let previous = self.shared.lock().session.take();
        if let Some(session) = previous {
            session.close();
        }
    }
}
