//! Per-handshake cancellation
//!
//! A `CancellationScope` is created for each inbound request and handed to
//! every API call made on its behalf. The client races each outstanding HTTP
//! call against the scope, so cancelling aborts the call itself rather than
//! only the caller's await point.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancellationScope {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for CancellationScope {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationScope {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Cancel the scope; every clone observes it. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once the scope is cancelled
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            // The sender lives as long as `self`, so this is unreachable in
            // practice; never resolve rather than report a false cancel.
            std::future::pending::<()>().await;
        }
    }

    /// Guard that cancels the scope when dropped
    ///
    /// Held by request handlers so that a dropped request future (client
    /// disconnect) cancels any work still holding a clone of the scope.
    #[must_use]
    pub fn drop_guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            scope: self.clone(),
            armed: true,
        }
    }
}

pub struct CancelOnDrop {
    scope: CancellationScope,
    armed: bool,
}

impl CancelOnDrop {
    /// Keep the scope alive after the guard is dropped
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.scope.cancel();
        }
    }
}
