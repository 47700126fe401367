//! Per-module readiness hand-off between the sync and build pipelines

use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::timeout;

/// The writing side dropped without ever signaling; the sync pipeline
/// aborted before reaching this module.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("sync pipeline dropped the signal before setting it")]
pub struct SignalAborted;

/// Writer half of one module's readiness signal.
///
/// `mark_ready` consumes the sender, so a signal transitions unset→set at
/// most once per run by construction.
#[derive(Debug)]
pub struct ReadySender {
    tx: watch::Sender<bool>,
}

impl ReadySender {
    /// Signal that this module's repository is synchronized
    pub fn mark_ready(self) {
        // The reader may already be gone; that is not this side's problem
        let _ = self.tx.send(true);
    }
}

/// Reader half of one module's readiness signal
#[derive(Debug)]
pub struct ReadyWaiter {
    rx: watch::Receiver<bool>,
}

impl ReadyWaiter {
    /// Immediate check without suspending
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the signal is set.
    ///
    /// Resolves to [`SignalAborted`] if the sender is dropped unset.
    pub async fn wait(&mut self) -> Result<(), SignalAborted> {
        loop {
            if *self.rx.borrow_and_update() {
                return Ok(());
            }
            if self.rx.changed().await.is_err() {
                // Sender gone; the final value decides
                if *self.rx.borrow() {
                    return Ok(());
                }
                return Err(SignalAborted);
            }
        }
    }

    /// Wait up to `limit`. `Ok(true)` means ready, `Ok(false)` means the
    /// bounded wait expired with the signal still unset.
    pub async fn wait_for(&mut self, limit: Duration) -> Result<bool, SignalAborted> {
        match timeout(limit, self.wait()).await {
            Ok(Ok(())) => Ok(true),
            Ok(Err(aborted)) => Err(aborted),
            Err(_) => Ok(false),
        }
    }
}

/// Allocate one readiness signal per module, index-aligned with the sorted
/// module list
pub fn ready_channels(count: usize) -> (Vec<ReadySender>, Vec<ReadyWaiter>) {
    let mut senders = Vec::with_capacity(count);
    let mut waiters = Vec::with_capacity(count);

    for _ in 0..count {
        let (tx, rx) = watch::channel(false);
        senders.push(ReadySender { tx });
        waiters.push(ReadyWaiter { rx });
    }

    (senders, waiters)
}
