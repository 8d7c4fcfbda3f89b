//! Cancellation for long waits

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{CommerceError, CommerceResult};

/// Cloneable cancellation flag shared between a caller and a running operation
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Sleep for `delay` unless cancelled first
    pub async fn sleep(&self, delay: Duration) -> CommerceResult<()> {
        if self.is_cancelled() {
            return Err(CommerceError::Cancelled);
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = self.cancelled() => Err(CommerceError::Cancelled),
        }
    }
}
