use std::future::Future;

use crate::session::SessionSender;

/// Receives every inbound message of a [`ReconnectingClient`](crate::client::ReconnectingClient),
/// in arrival order, one at a time.
///
/// `reply` sends on the session the message arrived on. It fails with
/// `NotConnected` if that session has been torn down meanwhile.
#[async_trait::async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: String, reply: &SessionSender);
}

/// Default handler: logs the message and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHandler;

#[async_trait::async_trait]
impl MessageHandler for LogHandler {
    async fn handle(&self, message: String, _reply: &SessionSender) {
        tracing::info!("Handling message: {}", message);
    }
}

/// Adapts an async closure into a [`MessageHandler`].
///
/// ```
/// use payment_ws::handler::handler_fn;
///
/// let echo = handler_fn(|message, reply| async move {
///     let _ = reply.send(message).await;
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(String, SessionSender) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    FnHandler(f)
}

#[derive(Debug, Clone)]
pub struct FnHandler<F>(F);

#[async_trait::async_trait]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(String, SessionSender) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn handle(&self, message: String, reply: &SessionSender) {
        (self.0)(message, reply.clone()).await
    }
}
