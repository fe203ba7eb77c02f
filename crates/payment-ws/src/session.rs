//! One live connection to the remote endpoint.
//!
//! A [`ConnectionSession`] owns its transport exclusively. The inbound half is
//! read through [`ConnectionSession::receive`] by whoever holds the session (the
//! reconnect loop). The outbound half lives behind a shared lock so that
//! [`SessionSender`] clones can send from other tasks; once the session is
//! closed those clones fail with [`SessionError::NotConnected`] instead of
//! touching a torn-down transport.
//!
//! Sessions are never reused: after [`close`](ConnectionSession::close) a new
//! one has to be opened.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use url::Url;

use crate::error::SessionError;
use crate::transport::{Connector, MessageSink, MessageStream};

/// Upper bound for the close handshake; the transport is dropped either way.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Cloneable outbound handle of a session.
#[derive(Clone)]
pub struct SessionSender {
    sink: Arc<Mutex<Option<MessageSink>>>,
}

impl std::fmt::Debug for SessionSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSender").finish_non_exhaustive()
    }
}

impl SessionSender {
    fn new(sink: MessageSink) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Some(sink))),
        }
    }

    /// A sender with no transport behind it; every send fails with `NotConnected`.
    pub fn disconnected() -> Self {
        Self {
            sink: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn send<M: Into<String>>(&self, message: M) -> Result<(), SessionError> {
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(SessionError::NotConnected)?;
        sink.send(message.into()).await
    }

    pub async fn is_open(&self) -> bool {
        self.sink.lock().await.is_some()
    }

    async fn shutdown(&self) {
        let sink = self.sink.lock().await.take();
        if let Some(mut sink) = sink {
            match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(error = %e, "Error while closing transport"),
                Err(_) => tracing::debug!("Timed out closing transport"),
            }
        }
    }
}

pub struct ConnectionSession {
    uri: Url,
    outbound: SessionSender,
    inbound: Option<MessageStream>,
}

impl std::fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("uri", &self.uri.as_str())
            .field("open", &self.is_open())
            .finish()
    }
}

impl ConnectionSession {
    /// Opens a session to `uri` through `connector`.
    pub async fn open<C>(connector: &C, uri: &Url) -> Result<Self, SessionError>
    where
        C: Connector + ?Sized,
    {
        let transport = connector.connect(uri).await?;
        Ok(Self {
            uri: uri.clone(),
            outbound: SessionSender::new(transport.sink),
            inbound: Some(transport.stream),
        })
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn is_open(&self) -> bool {
        self.inbound.is_some()
    }

    /// Next inbound message.
    ///
    /// - `Ok(Some(message))` for each message, in arrival order.
    /// - `Ok(None)` once the peer has closed the connection.
    /// - `Err(ConnectionLost)` on abnormal termination.
    /// - `Err(NotConnected)` after [`close`](Self::close).
    ///
    /// Cancel-safe: dropping the returned future loses no message.
    pub async fn receive(&mut self) -> Result<Option<String>, SessionError> {
        let inbound = self.inbound.as_mut().ok_or(SessionError::NotConnected)?;
        match inbound.next().await {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    pub async fn send<M: Into<String>>(&self, message: M) -> Result<(), SessionError> {
        self.outbound.send(message).await
    }

    pub fn sender(&self) -> SessionSender {
        self.outbound.clone()
    }

    /// Releases the transport. Closing an already closed session does nothing.
    pub async fn close(&mut self) {
        self.inbound.take();
        self.outbound.shutdown().await;
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        // Best effort: without an async context the sink is dropped rather than closed.
        if let Ok(mut sink) = self.outbound.sink.try_lock() {
            sink.take();
        }
    }
}
