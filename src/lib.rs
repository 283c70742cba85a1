//! # agent-connect
//!
//! Client side of an ephemeral real-time agent session: trade the user's
//! chosen options for a signed participant credential, open the real-time
//! transport with it, and expose a connection status that a view layer
//! projects onto a welcome screen or a session screen.
//!
//! ```rust,ignore
//! let config = AppConfig::resolve(None)?;
//! let http = exchange::build_http_client(&config);
//! let source = TokenExchangeClient::with_client(&config, http.clone())?
//!     .with_notifier(SettingsNotifier::from_config(&config, http));
//! let controller = SessionController::new(
//!     config.agent_name.clone(),
//!     source,
//!     WebSocketTransport::new(config.signal_path.clone()),
//! );
//! let mut views = ViewController::new(controller.subscribe());
//! controller.connect(&ConnectionOptions::default().with_voice("echo")).await?;
//! ```

pub mod auth;
pub mod cli;
pub mod config;
pub mod credential;
pub mod error;
pub mod exchange;
pub mod notify;
pub mod options;
pub mod payload;
pub mod session;
pub mod transport;
pub mod view;

pub use config::AppConfig;
pub use credential::{RawTokenResponse, SessionCredential};
pub use error::{ExchangeError, FormatError, SessionError, TransportError};
pub use exchange::{CredentialSource, TokenExchangeClient};
pub use notify::SettingsNotifier;
pub use options::{ConnectionOptions, UserSettings};
pub use payload::CredentialRequest;
pub use session::{ConnectionStatus, SessionController};
pub use transport::{RealtimeTransport, WebSocketTransport};
pub use view::{select_view, View, ViewController};
