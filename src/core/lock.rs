//! FIFO async mutual exclusion.
//!
//! `AsyncMutex` serializes async operations against a resource that must
//! never be used concurrently (the low-level seek call). Acquisition order
//! is strictly first-come-first-served: a release hands the lock to the
//! oldest queued waiter, so no holder can starve the queue.
//!
//! The token is an affine value: it cannot be cloned, releasing consumes it,
//! and dropping it (early return, `?`) still performs the handoff. Double
//! release is therefore unrepresentable rather than a runtime fault.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use log::trace;
use tokio::sync::oneshot;

struct LockState {
    held: bool,
    queue: VecDeque<oneshot::Sender<()>>,
}

struct Inner {
    state: Mutex<LockState>,
}

/// Single-holder async lock with FIFO handoff.
#[derive(Clone)]
pub struct AsyncMutex {
    inner: Arc<Inner>,
}

impl AsyncMutex {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(LockState {
                    held: false,
                    queue: VecDeque::new(),
                }),
            }),
        }
    }

    /// Acquire the lock. Resolves immediately when free; otherwise suspends
    /// until every earlier holder has released.
    pub async fn acquire(&self) -> MutexToken {
        let waiter = {
            let mut state = self.inner.state.lock().expect("lock");
            if !state.held {
                state.held = true;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.queue.push_back(tx);
                Some(rx)
            }
        };

        if let Some(rx) = waiter {
            trace!("AsyncMutex: queued behind current holder");
            // The sender side is only dropped if the releasing token skips
            // us as a cancelled waiter, which cannot happen while this
            // future is alive and polled.
            let _ = rx.await;
        }

        MutexToken {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of suspended acquirers (diagnostic).
    pub fn queue_len(&self) -> usize {
        self.inner.state.lock().expect("lock").queue.len()
    }
}

impl Default for AsyncMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AsyncMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock().expect("lock");
        f.debug_struct("AsyncMutex")
            .field("held", &state.held)
            .field("queued", &state.queue.len())
            .finish()
    }
}

/// Exclusive right to proceed, handed back via [`MutexToken::release`] or by
/// dropping the token.
pub struct MutexToken {
    inner: Arc<Inner>,
}

impl MutexToken {
    /// Release the lock, waking the oldest queued waiter if any.
    pub fn release(self) {
        // Handoff happens in Drop.
    }
}

impl Drop for MutexToken {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock().expect("lock");
        loop {
            match state.queue.pop_front() {
                Some(tx) => {
                    // A waiter whose acquire future was dropped leaves a dead
                    // receiver behind; skip it and wake the next one.
                    if tx.send(()).is_ok() {
                        return;
                    }
                }
                None => {
                    state.held = false;
                    return;
                }
            }
        }
    }
}

impl std::fmt::Debug for MutexToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutexToken").finish()
    }
}
