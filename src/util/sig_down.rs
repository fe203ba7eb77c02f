use std::future::Future;

use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Graceful shutdown on SIGTERM or SIGINT.
///
/// A background task cancels [`cancellation_token`](Self::cancellation_token)
/// when either signal arrives. Long-running subsystems (the reconnecting client)
/// are started through [`spawn`](Self::spawn) so that [`wait`](Self::wait) can
/// hold the process open until they have released their connections.
pub struct SigDown {
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl SigDown {
    /// Fails if the signal handlers cannot be registered.
    pub fn try_new() -> Result<Self, std::io::Error> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let cancellation_token = CancellationToken::new();
        let task_tracker = TaskTracker::new();

        let token = cancellation_token.clone();
        task_tracker.spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("SIGTERM received, shutting down"),
                _ = sigint.recv() => tracing::info!("SIGINT received, shutting down"),
                _ = token.cancelled() => {}
            }
            token.cancel();
        });

        Ok(Self {
            task_tracker,
            cancellation_token,
        })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Runs `task` until completion; [`wait`](Self::wait) waits for it.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.task_tracker.spawn(task);
    }

    /// Cancels everything, as if a signal had arrived.
    pub fn trigger(&self) {
        self.cancellation_token.cancel();
    }

    /// Waits for shutdown and for every spawned task to finish.
    pub async fn wait(&self) {
        self.cancellation_token.cancelled().await;
        self.task_tracker.close();
        self.task_tracker.wait().await;
    }
}
