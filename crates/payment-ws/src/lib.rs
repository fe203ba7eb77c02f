//! Reconnecting WebSocket client.
//!
//! - [`session`]: one live connection with ordered receive and verbatim send.
//! - [`client`]: the connect/listen/retry loop around it.
//! - [`transport`]: the [`Connector`](transport::Connector) seam, backed by
//!   `tokio-tungstenite` in production and by [`memory`] in tests.
//!
//! ```no_run
//! use payment_ws::{ReconnectingClient, ReconnectPolicy};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(
//!     ReconnectingClient::new("wss://echo.websocket.org".parse()?)
//!         .with_policy(ReconnectPolicy::fixed(Duration::from_secs(5))),
//! );
//! let cancel = CancellationToken::new();
//! let task = client.clone().spawn(cancel.clone());
//! client.send("Test Message").await.ok();
//! cancel.cancel();
//! task.await??;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod handler;
pub mod memory;
pub mod policy;
pub mod session;
pub mod transport;

pub use client::{ClientState, ReconnectingClient};
pub use error::{ClientError, SessionError};
pub use handler::{LogHandler, MessageHandler, handler_fn};
pub use policy::{Backoff, ReconnectPolicy};
pub use session::{ConnectionSession, SessionSender};
pub use transport::{Connector, Transport, WebSocketConnector};
