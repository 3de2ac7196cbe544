//! One-shot broadcast cancellation shared by the walk, the workers and the aggregator.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

struct Inner {
    cancelled: AtomicBool,
    /// Never sent on. Dropping it disconnects `done_rx`, which wakes every `select!` at once.
    done_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
}

/// Signal once, observe everywhere. Once raised it stays raised; create a fresh token per run.
///
/// Blocking pipeline operations race against [`CancelToken::done`] in a `select!`, so a unit
/// blocked on a channel wakes as soon as the token is raised.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (done_tx, done_rx) = bounded::<()>(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                done_tx: Mutex::new(Some(done_tx)),
                done_rx,
            }),
        }
    }

    /// Raise the token. Idempotent; returns true only for the call that raised it.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        // A poisoned lock still holds the sender; take it either way.
        let mut guard = self
            .inner
            .done_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.take();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready (disconnected) once the token is raised. Use as a
    /// `recv(token.done())` arm.
    pub fn done(&self) -> &Receiver<()> {
        &self.inner.done_rx
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
