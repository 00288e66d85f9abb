//! Cancellable quiet-period timer used to coalesce bursts of input into a
//! single lookup. Replaces ad hoc timer-id bookkeeping: scheduling always
//! cancels the previously pending action, so at most one timer is live.
//! Cancellation reaches only the timer; an action that has already started
//! runs to completion.

use std::{future::Future, time::Duration};

use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay`, dropping any action scheduled earlier
    /// that has not fired yet. Must be called from within a tokio runtime.
    pub fn schedule<F>(&mut self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached: aborting the timer cannot kill a started action.
            tokio::spawn(action);
        }));
    }

    /// Drop the pending action if its quiet period has not elapsed yet.
    /// Used by an explicit submit that bypasses the quiet period.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
