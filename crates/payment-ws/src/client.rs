//! Long-lived client that keeps a session to the remote endpoint alive.
//!
//! ```text
//!              start                 open ok
//! Disconnected ─────▶ Connecting ─────────────▶ Connected ──┐
//!      ▲                  │ open failed              │      │ receive()
//!      │                  ▼                          │      │ loop
//!      └──── delay ◀── Disconnected ◀── lost/closed ─┘ ◀────┘
//!
//!   any state ── cancellation ──▶ Stopped
//! ```
//!
//! The first attempt is made immediately. After every failure (open failed,
//! connection lost, peer closed) the client waits the policy delay and tries
//! again, indefinitely unless the policy sets an attempt cap. The delay, the
//! open and the receive are each raced against the [`CancellationToken`], so a
//! cancellation is observed within one step and the current session is closed
//! before [`connect`](ReconnectingClient::connect) returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use payment_types::report::{Reporter, TracingReporter};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{ClientError, SessionError};
use crate::handler::{LogHandler, MessageHandler};
use crate::policy::ReconnectPolicy;
use crate::session::{ConnectionSession, SessionSender};
use crate::transport::{Connector, WebSocketConnector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Connected,
    Stopped,
}

impl std::fmt::Display for ClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientState::Disconnected => f.write_str("disconnected"),
            ClientState::Connecting => f.write_str("connecting"),
            ClientState::Connected => f.write_str("connected"),
            ClientState::Stopped => f.write_str("stopped"),
        }
    }
}

/// How a listen loop ended.
enum ListenEnd {
    Cancelled,
    PeerClosed,
    Lost(SessionError),
}

pub struct ReconnectingClient {
    uri: Url,
    connector: Arc<dyn Connector>,
    handler: Arc<dyn MessageHandler>,
    reporter: Arc<dyn Reporter>,
    policy: ReconnectPolicy,
    state: watch::Sender<ClientState>,
    outbound: Mutex<SessionSender>,
    running: AtomicBool,
}

impl std::fmt::Debug for ReconnectingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectingClient")
            .field("uri", &self.uri.as_str())
            .field("state", &self.state())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ReconnectingClient {
    /// WebSocket client for `uri` with the default policy, handler and reporter.
    pub fn new(uri: Url) -> Self {
        let (state, _) = watch::channel(ClientState::Disconnected);
        Self {
            uri,
            connector: Arc::new(WebSocketConnector),
            handler: Arc::new(LogHandler),
            reporter: Arc::new(TracingReporter),
            policy: ReconnectPolicy::default(),
            state,
            outbound: Mutex::new(SessionSender::disconnected()),
            running: AtomicBool::new(false),
        }
    }

    pub fn with_connector<C: Connector + 'static>(mut self, connector: C) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    pub fn with_handler<H: MessageHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Arc::new(handler);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn state(&self) -> ClientState {
        *self.state.borrow()
    }

    /// Watch channel that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.state.subscribe()
    }

    /// Sends on the current session. Fails with `NotConnected` unless `Connected`,
    /// including when the session is torn down while the send is in flight.
    pub async fn send<M: Into<String>>(&self, message: M) -> Result<(), SessionError> {
        let message = message.into();
        let sender = self
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match sender.send(message.as_str()).await {
            Ok(()) => {
                self.reporter.info(&format!("Sent message: {message}"));
                Ok(())
            }
            Err(e) => {
                self.reporter
                    .error(&format!("Failed to send message: {e}"));
                Err(e)
            }
        }
    }

    /// Runs the connect/listen/retry loop until `cancel` fires.
    ///
    /// Returns `Ok(())` on cancellation. Dropping the returned future has the same
    /// effect on the client: it ends up `Stopped` and can be connected again.
    /// Errors only with
    /// [`ClientError::AlreadyRunning`] or, when the policy caps attempts,
    /// [`ClientError::RetriesExhausted`]. Transport errors never escape.
    pub async fn connect(&self, cancel: CancellationToken) -> Result<(), ClientError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(ClientError::AlreadyRunning);
        }
        // Also runs when this future is dropped mid-loop (aborted task, lost select).
        let _guard = RunGuard(self);
        self.run_loop(&cancel).await
    }

    /// Spawns [`connect`](Self::connect) onto the current runtime.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<Result<(), ClientError>> {
        tokio::spawn(async move { self.connect(cancel).await })
    }

    async fn run_loop(&self, cancel: &CancellationToken) -> Result<(), ClientError> {
        let mut failures: u32 = 0;
        loop {
            self.set_state(ClientState::Connecting);
            self.reporter
                .info(&format!("Attempting to connect to {}", self.uri));
            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                opened = ConnectionSession::open(self.connector.as_ref(), &self.uri) => opened,
            };

            match opened {
                Ok(mut session) => {
                    failures = 0;
                    self.install(session.sender());
                    self.set_state(ClientState::Connected);
                    self.reporter.info("Connected to WebSocket server");

                    let ended = self.listen(&mut session, cancel).await;
                    self.install(SessionSender::disconnected());
                    session.close().await;
                    match ended {
                        ListenEnd::Cancelled => return Ok(()),
                        ListenEnd::PeerClosed => self
                            .reporter
                            .error("Connection error: connection closed by peer"),
                        ListenEnd::Lost(e) => {
                            self.reporter.error(&format!("Connection error: {e}"))
                        }
                    }
                }
                Err(e) => self.reporter.error(&format!("Connection error: {e}")),
            }

            failures = failures.saturating_add(1);
            self.set_state(ClientState::Disconnected);
            if self.policy.is_exhausted(failures) {
                self.reporter.error(&format!(
                    "Giving up after {failures} consecutive failed attempts"
                ));
                return Err(ClientError::RetriesExhausted { attempts: failures });
            }

            let delay = self.policy.delay_for(failures);
            self.reporter
                .info(&format!("Reconnecting in {:.1}s", delay.as_secs_f64()));
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn listen(&self, session: &mut ConnectionSession, cancel: &CancellationToken) -> ListenEnd {
        let reply = session.sender();
        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => return ListenEnd::Cancelled,
                received = session.receive() => received,
            };
            match received {
                Ok(Some(message)) => {
                    self.reporter.info(&format!("Received message: {message}"));
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return ListenEnd::Cancelled,
                        _ = self.handler.handle(message, &reply) => {}
                    }
                }
                Ok(None) => return ListenEnd::PeerClosed,
                Err(e) => return ListenEnd::Lost(e),
            }
        }
    }

    fn install(&self, sender: SessionSender) {
        *self.outbound.lock().unwrap_or_else(PoisonError::into_inner) = sender;
    }

    fn set_state(&self, state: ClientState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, uri = %self.uri, "client_transition");
        }
    }
}

/// Resets a client to `Stopped` once its run ends, however it ends.
struct RunGuard<'a>(&'a ReconnectingClient);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let client = self.0;
        client.install(SessionSender::disconnected());
        client.set_state(ClientState::Stopped);
        client.reporter.info("WebSocket connection closed");
        client.running.store(false, Ordering::Release);
    }
}
