//! In-process transport pair.
//!
//! [`memory_transport`] returns a [`Transport`] for the client side and a
//! [`MemoryPeer`] that plays the remote server: whatever the peer pushes shows
//! up on the client's inbound stream, whatever the client sends lands in the
//! peer's queue. Dropping (or [`closing`](MemoryPeer::close)) the peer ends the
//! client's inbound stream the same way an orderly WebSocket close does.

use futures_util::stream;
use futures_util::sink;
use tokio::sync::mpsc;

use crate::error::SessionError;
use crate::transport::Transport;

#[derive(Debug)]
pub struct MemoryPeer {
    to_client: Option<mpsc::UnboundedSender<Result<String, SessionError>>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Pushes one inbound message to the client. Returns `false` once the client
    /// side is gone.
    pub fn push<M: Into<String>>(&self, message: M) -> bool {
        match &self.to_client {
            Some(tx) => tx.send(Ok(message.into())).is_ok(),
            None => false,
        }
    }

    /// Makes the client's next `receive` fail with `ConnectionLost`.
    pub fn fail<M: Into<String>>(&self, reason: M) -> bool {
        match &self.to_client {
            Some(tx) => tx
                .send(Err(SessionError::ConnectionLost(reason.into())))
                .is_ok(),
            None => false,
        }
    }

    /// Orderly close from the peer side: the client sees the end of its stream.
    pub fn close(&mut self) {
        self.to_client.take();
    }

    /// Next message the client sent, or `None` once the client released its sink.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }
}

pub fn memory_transport() -> (Transport, MemoryPeer) {
    let (to_client, inbound) = mpsc::unbounded_channel::<Result<String, SessionError>>();
    let (outbound, from_client) = mpsc::unbounded_channel::<String>();

    let stream = stream::unfold(inbound, |mut inbound| async move {
        inbound.recv().await.map(|item| (item, inbound))
    });
    let sink = sink::unfold(outbound, |outbound, message: String| async move {
        outbound
            .send(message)
            .map_err(|_| SessionError::ConnectionLost("peer went away".to_string()))?;
        Ok::<_, SessionError>(outbound)
    });

    let peer = MemoryPeer {
        to_client: Some(to_client),
        from_client,
    };
    (Transport::new(sink, stream), peer)
}
