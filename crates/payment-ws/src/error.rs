/// Transport-level failures of a single session.
///
/// `ConnectFailed` and `ConnectionLost` are always absorbed by the
/// [`ReconnectingClient`](crate::client::ReconnectingClient) retry loop.
/// `NotConnected` is handed back to whoever tried to send.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Connection failed: {0}")]
    ConnectFailed(String),
    #[error("Connection lost: {0}")]
    ConnectionLost(String),
    #[error("Not connected")]
    NotConnected,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// `connect` was called while another listen loop was already running.
    #[error("Client is already running")]
    AlreadyRunning,
    /// Only reachable when the reconnect policy sets a maximum attempt count.
    #[error("Gave up after {attempts} consecutive failed connection attempts")]
    RetriesExhausted { attempts: u32 },
}
