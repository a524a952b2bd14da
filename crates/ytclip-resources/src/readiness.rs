//! Process-wide "all resources verified" flag.

use tokio::sync::watch;

/// Single-writer readiness flag. Only the resource manager holds one.
///
/// Once set the flag never goes back to false.
#[derive(Debug)]
pub struct ReadinessFlag {
    tx: watch::Sender<bool>,
}

impl ReadinessFlag {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub(crate) fn set(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Read-only view for consumers.
    pub fn handle(&self) -> ReadinessHandle {
        ReadinessHandle {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read-only view of the readiness flag.
#[derive(Debug, Clone)]
pub struct ReadinessHandle {
    rx: watch::Receiver<bool>,
}

impl ReadinessHandle {
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the flag is set. Returns false if the writer is gone first.
    pub async fn wait(&self) -> bool {
        let mut rx = self.rx.clone();
        let ready = rx.wait_for(|ready| *ready).await.is_ok();
        ready
    }

    /// A handle that always reads true, for wiring tests.
    pub fn always_ready() -> Self {
        let (tx, rx) = watch::channel(true);
        drop(tx);
        Self { rx }
    }

    /// A handle that never becomes ready.
    pub fn never_ready() -> Self {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        Self { rx }
    }
}
