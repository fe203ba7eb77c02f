//! Transport seam between a session and the wire.
//!
//! A [`Connector`] turns a URI into a [`Transport`]: a sink of outbound text
//! messages and a stream of inbound ones. [`WebSocketConnector`] is the real
//! implementation; anything else (an in-memory pair in tests, a proxy) only has
//! to produce the same two halves.

use std::future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::Error as TungsteniteError;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::error::SessionError;

pub type MessageSink = Pin<Box<dyn Sink<String, Error = SessionError> + Send>>;
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<String, SessionError>> + Send>>;

/// Both halves of an established connection.
pub struct Transport {
    pub sink: MessageSink,
    pub stream: MessageStream,
}

impl Transport {
    pub fn new<Si, St>(sink: Si, stream: St) -> Self
    where
        Si: Sink<String, Error = SessionError> + Send + 'static,
        St: Stream<Item = Result<String, SessionError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream.fuse()),
        }
    }
}

#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Establishes a connection or fails with [`SessionError::ConnectFailed`].
    async fn connect(&self, uri: &Url) -> Result<Transport, SessionError>;
}

#[async_trait::async_trait]
impl<T: Connector + ?Sized> Connector for Arc<T> {
    async fn connect(&self, uri: &Url) -> Result<Transport, SessionError> {
        self.as_ref().connect(uri).await
    }
}

/// `ws://` and `wss://` connector backed by `tokio-tungstenite`.
///
/// Text frames are delivered verbatim. Binary frames are decoded as lossy
/// UTF-8. Ping/pong is answered by the transport and never surfaces. A close
/// frame from the peer ends the inbound stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, uri: &Url) -> Result<Transport, SessionError> {
        let (socket, _response) = tokio_tungstenite::connect_async(uri.as_str())
            .await
            .map_err(|e| SessionError::ConnectFailed(e.to_string()))?;
        let (sink, stream) = socket.split();

        let sink = sink
            .sink_map_err(|e| SessionError::ConnectionLost(e.to_string()))
            .with(|text: String| future::ready(Ok::<_, SessionError>(Message::text(text))));

        let stream = stream
            .take_while(|frame| {
                future::ready(!matches!(
                    frame,
                    Ok(Message::Close(_)) | Err(TungsteniteError::ConnectionClosed)
                ))
            })
            .filter_map(|frame| future::ready(decode_frame(frame)));

        Ok(Transport::new(sink, stream))
    }
}

fn decode_frame(frame: Result<Message, TungsteniteError>) -> Option<Result<String, SessionError>> {
    match frame {
        Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
        Ok(Message::Binary(bytes)) => Some(Ok(String::from_utf8_lossy(&bytes).into_owned())),
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_) | Message::Close(_)) => None,
        Err(e) => Some(Err(SessionError::ConnectionLost(e.to_string()))),
    }
}
