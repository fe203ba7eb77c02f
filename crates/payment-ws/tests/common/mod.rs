#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use payment_types::report::MemoryReporter;
use payment_ws::memory::{MemoryPeer, memory_transport};
use payment_ws::{ClientState, Connector, ReconnectPolicy, ReconnectingClient, SessionError, Transport};
use tokio::sync::mpsc;
use url::Url;

#[derive(Debug, Clone, Copy)]
pub enum Step {
    Fail,
    Accept,
}

/// Connector that follows a fixed script of outcomes, one per attempt, and
/// refuses every attempt once the script runs out. Accepted connections hand
/// their peer side to the test through the receiver returned by [`scripted`].
#[derive(Clone)]
pub struct ScriptedConnector {
    script: Arc<Mutex<VecDeque<Step>>>,
    attempts: Arc<AtomicUsize>,
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

impl ScriptedConnector {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _uri: &Url) -> Result<Transport, SessionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front().unwrap_or(Step::Fail);
        match step {
            Step::Fail => Err(SessionError::ConnectFailed("refused".to_string())),
            Step::Accept => {
                let (transport, peer) = memory_transport();
                let _ = self.peers.send(peer);
                Ok(transport)
            }
        }
    }
}

pub fn scripted(steps: &[Step]) -> (ScriptedConnector, mpsc::UnboundedReceiver<MemoryPeer>) {
    let (peers, rx) = mpsc::unbounded_channel();
    let connector = ScriptedConnector {
        script: Arc::new(Mutex::new(steps.iter().copied().collect())),
        attempts: Arc::new(AtomicUsize::new(0)),
        peers,
    };
    (connector, rx)
}

pub fn test_uri() -> Url {
    "ws://payments.test/stream".parse().unwrap()
}

pub fn build_client(
    connector: ScriptedConnector,
    delay: Duration,
) -> (ReconnectingClient, Arc<MemoryReporter>) {
    let reporter = Arc::new(MemoryReporter::new());
    let client = ReconnectingClient::new(test_uri())
        .with_connector(connector)
        .with_reporter(reporter.clone())
        .with_policy(ReconnectPolicy::fixed(delay));
    (client, reporter)
}

pub async fn wait_for_state(client: &ReconnectingClient, state: ClientState) {
    let mut rx = client.subscribe();
    tokio::time::timeout(Duration::from_secs(30), rx.wait_for(|s| *s == state))
        .await
        .expect("state not reached in time")
        .expect("state channel closed");
}
