//! Named-event waiter table with timed one-shot waits and paired
//! cancellation.
//!
//! Event names are a closed enum ([`EventKind`]), so the table is total:
//! every kind a caller can name exists, and "unknown event type" cannot
//! occur at runtime. The registry holds, per kind, an ordered list of
//! waiters; dispatch fires them in registration order. One-shot waiters
//! registered under several kinds are removed from *all* of them when any
//! one fires, times out, or is cancelled.
//!
//! All table mutation happens while holding an [`AsyncMutex`] token;
//! callbacks and channel sends run after the token is released.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, trace};
use tokio::sync::oneshot;

use crate::clock::Clock;
use crate::core::lock::AsyncMutex;

/// Closed set of event names a registry instance is declared over.
pub trait EventKind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every kind, in a fixed order. The table is built from this.
    const ALL: &'static [Self];

    /// Stable name for logs.
    fn name(&self) -> &'static str;
}

/// Identifier of a registered waiter, monotonic per registry instance.
pub type WaiterId = u64;

/// What a fired waiter observes.
#[derive(Clone, Debug)]
pub struct Fired<P> {
    /// The dispatched payload.
    pub event: P,
    /// Registry time at registration, milliseconds.
    pub init_time: f64,
    /// Registry time at delivery, milliseconds.
    pub event_time: f64,
    /// `event_time - init_time`.
    pub duration: f64,
}

/// Failure of a timed wait. Exactly one of resolve / reject-by-event /
/// reject-by-timeout happens per [`WaitRegistry::begin_wait`] call.
#[derive(Debug, thiserror::Error)]
pub enum WaitError<K: EventKind, P: fmt::Debug> {
    #[error("wait for {waiting:?} timed out after {duration:.0}ms (timeout {timeout:?}, label {label:?})")]
    Timeout {
        waiting: K,
        timeout: Duration,
        label: Option<&'static str>,
        init_time: f64,
        event_time: f64,
        duration: f64,
    },
    #[error("wait rejected by {kind:?} after {:.0}ms", .fired.duration)]
    Rejected { kind: K, fired: Fired<P> },
}

type Callback<P> = Arc<dyn Fn(&Fired<P>) + Send + Sync>;
type SharedSender<K, P> = Arc<Mutex<Option<oneshot::Sender<(K, Fired<P>)>>>>;

enum Sink<K: EventKind, P> {
    Callback { f: Callback<P>, keep: bool },
    Channel(SharedSender<K, P>),
}

struct Waiter<K: EventKind, P> {
    id: WaiterId,
    init_time: f64,
    /// Kinds whose matching waiter (same id) is cancelled when this fires.
    cancels: Vec<K>,
    sink: Sink<K, P>,
}

struct Table<K: EventKind, P> {
    slots: HashMap<K, Vec<Waiter<K, P>>>,
    next_id: WaiterId,
}

enum Deliver<K: EventKind, P> {
    Callback(Callback<P>, f64),
    Channel(SharedSender<K, P>, f64),
}

/// Waiter table over a closed event-kind enum.
pub struct WaitRegistry<K: EventKind, P> {
    lock: AsyncMutex,
    clock: Arc<dyn Clock>,
    // Mutated only while holding a `lock` token.
    table: Mutex<Table<K, P>>,
}

impl<K: EventKind, P: Clone + Send + fmt::Debug + 'static> WaitRegistry<K, P> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let mut slots = HashMap::with_capacity(K::ALL.len());
        for &kind in K::ALL {
            slots.insert(kind, Vec::new());
        }
        Self {
            lock: AsyncMutex::new(),
            clock,
            table: Mutex::new(Table { slots, next_id: 0 }),
        }
    }

    /// Register a callback under each listed kind. A non-persistent
    /// subscription fires once in total: its first delivery removes it from
    /// every kind it was registered under.
    pub async fn subscribe<F>(&self, kinds: &[K], callback: F, persistent: bool) -> WaiterId
    where
        F: Fn(&Fired<P>) + Send + Sync + 'static,
    {
        let callback: Callback<P> = Arc::new(callback);
        let token = self.lock.acquire().await;
        let init_time = self.clock.now_ms();
        let id = {
            let mut table = self.table.lock().expect("lock");
            let id = table.next_id;
            table.next_id += 1;
            for &kind in kinds {
                let cancels = if persistent {
                    Vec::new()
                } else {
                    kinds.iter().copied().filter(|k| *k != kind).collect()
                };
                table.slots.get_mut(&kind).expect("declared kind").push(Waiter {
                    id,
                    init_time,
                    cancels,
                    sink: Sink::Callback {
                        f: Arc::clone(&callback),
                        keep: persistent,
                    },
                });
            }
            id
        };
        token.release();
        id
    }

    /// Fire every waiter registered under `kind`, in registration order.
    /// Persistent callbacks survive for the next round; everything else is
    /// removed, along with its cancel-partners under other kinds.
    pub async fn dispatch(&self, kind: K, payload: P) {
        let to_fire: Vec<Deliver<K, P>> = {
            let token = self.lock.acquire().await;
            let mut table = self.table.lock().expect("lock");
            let slot = table.slots.get_mut(&kind).expect("declared kind");
            let all = std::mem::take(slot);

            let mut retained = Vec::new();
            let mut fired = Vec::new();
            let mut partner_removals: Vec<(Vec<K>, WaiterId)> = Vec::new();
            for waiter in all {
                match waiter.sink {
                    Sink::Callback { f, keep } => {
                        fired.push(Deliver::Callback(Arc::clone(&f), waiter.init_time));
                        if keep {
                            retained.push(Waiter {
                                id: waiter.id,
                                init_time: waiter.init_time,
                                cancels: waiter.cancels,
                                sink: Sink::Callback { f, keep },
                            });
                        } else if !waiter.cancels.is_empty() {
                            partner_removals.push((waiter.cancels, waiter.id));
                        }
                    }
                    Sink::Channel(tx) => {
                        fired.push(Deliver::Channel(tx, waiter.init_time));
                        if !waiter.cancels.is_empty() {
                            partner_removals.push((waiter.cancels, waiter.id));
                        }
                    }
                }
            }
            *table.slots.get_mut(&kind).expect("declared kind") = retained;

            for (kinds, id) in partner_removals {
                for partner_kind in kinds {
                    if let Some(partner_slot) = table.slots.get_mut(&partner_kind) {
                        partner_slot.retain(|w| w.id != id);
                    }
                }
            }
            drop(table);
            token.release();
            fired
        };

        if to_fire.is_empty() {
            trace!("dispatch {}: no waiters", kind.name());
            return;
        }

        let event_time = self.clock.now_ms();
        for item in to_fire {
            match item {
                Deliver::Callback(f, init_time) => {
                    f(&Fired {
                        event: payload.clone(),
                        init_time,
                        event_time,
                        duration: event_time - init_time,
                    });
                }
                Deliver::Channel(tx, init_time) => {
                    let sender = tx.lock().expect("lock").take();
                    if let Some(sender) = sender {
                        let _ = sender.send((
                            kind,
                            Fired {
                                event: payload.clone(),
                                init_time,
                                event_time,
                                duration: event_time - init_time,
                            },
                        ));
                    }
                }
            }
        }
    }

    /// Remove the waiter with `id` from each listed kind. No-op when absent.
    pub async fn cancel(&self, kinds: &[K], id: WaiterId) {
        let token = self.lock.acquire().await;
        {
            let mut table = self.table.lock().expect("lock");
            for kind in kinds {
                if let Some(slot) = table.slots.get_mut(kind) {
                    slot.retain(|w| w.id != id);
                }
            }
        }
        token.release();
    }

    /// Register a one-shot timed wait for `resolving`, registered *before*
    /// this returns so a signal fired immediately afterwards cannot be
    /// missed. When `rejecting` is given, that kind firing first fails the
    /// wait; either side firing removes the other. Await the result with
    /// [`WaitHandle::outcome`].
    pub async fn begin_wait(
        &self,
        resolving: K,
        timeout: Duration,
        rejecting: Option<K>,
        label: Option<&'static str>,
    ) -> WaitHandle<'_, K, P> {
        let (tx, rx) = oneshot::channel();
        let shared: SharedSender<K, P> = Arc::new(Mutex::new(Some(tx)));

        let token = self.lock.acquire().await;
        let init_time = self.clock.now_ms();
        let id = {
            let mut table = self.table.lock().expect("lock");
            let id = table.next_id;
            table.next_id += 1;

            table.slots.get_mut(&resolving).expect("declared kind").push(Waiter {
                id,
                init_time,
                cancels: rejecting.into_iter().collect(),
                sink: Sink::Channel(Arc::clone(&shared)),
            });
            if let Some(reject_kind) = rejecting {
                table.slots.get_mut(&reject_kind).expect("declared kind").push(Waiter {
                    id,
                    init_time,
                    cancels: vec![resolving],
                    sink: Sink::Channel(Arc::clone(&shared)),
                });
            }
            id
        };
        token.release();

        trace!(
            "begin_wait: {} (reject {:?}, timeout {:?}, label {:?}) -> waiter {}",
            resolving.name(),
            rejecting.map(|k| k.name()),
            timeout,
            label,
            id
        );

        WaitHandle {
            registry: self,
            resolving,
            rejecting,
            id,
            init_time,
            timeout,
            label,
            rx,
        }
    }

    /// Number of waiters currently registered under `kind` (diagnostic).
    pub async fn waiter_count(&self, kind: K) -> usize {
        let token = self.lock.acquire().await;
        let count = self.table.lock().expect("lock").slots[&kind].len();
        token.release();
        count
    }
}

impl<K: EventKind, P> fmt::Debug for WaitRegistry<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.lock().expect("lock");
        let mut s = f.debug_struct("WaitRegistry");
        for (kind, slot) in &table.slots {
            s.field(&format!("{kind:?}"), &slot.len());
        }
        s.finish()
    }
}

/// A registered timed wait. Consume with [`outcome`](Self::outcome) or
/// [`cancel`](Self::cancel); merely dropping the handle leaves the
/// registration in place until the event fires.
#[must_use = "a wait does nothing until outcome() is awaited"]
pub struct WaitHandle<'a, K: EventKind, P> {
    registry: &'a WaitRegistry<K, P>,
    resolving: K,
    rejecting: Option<K>,
    id: WaiterId,
    init_time: f64,
    timeout: Duration,
    label: Option<&'static str>,
    rx: oneshot::Receiver<(K, Fired<P>)>,
}

impl<K: EventKind, P: Clone + Send + fmt::Debug + 'static> WaitHandle<'_, K, P> {
    fn kinds(&self) -> Vec<K> {
        let mut kinds = vec![self.resolving];
        kinds.extend(self.rejecting);
        kinds
    }

    /// Wait until the resolving kind fires, the rejecting kind fires, or the
    /// timeout elapses. Every path removes both registrations.
    pub async fn outcome(mut self) -> Result<Fired<P>, WaitError<K, P>> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let fired = tokio::select! {
            fired = &mut self.rx => Some(fired),
            _ = tokio::time::sleep_until(deadline) => None,
        };
        match fired {
            Some(Ok((kind, fired))) if kind == self.resolving => Ok(fired),
            Some(Ok((kind, fired))) => Err(WaitError::Rejected { kind, fired }),
            // Registration removed out of band (external cancel by id);
            // report it the way an elapsed wait would.
            Some(Err(_)) => {
                debug!(
                    "wait {} for {}: registration vanished",
                    self.id,
                    self.resolving.name()
                );
                Err(self.timeout_error())
            }
            None => {
                let kinds = self.kinds();
                self.registry.cancel(&kinds, self.id).await;
                Err(self.timeout_error())
            }
        }
    }

    /// Abandon the wait, removing both registrations.
    pub async fn cancel(self) {
        let kinds = self.kinds();
        self.registry.cancel(&kinds, self.id).await;
    }

    fn timeout_error(&self) -> WaitError<K, P> {
        let event_time = self.registry.clock.now_ms();
        WaitError::Timeout {
            waiting: self.resolving,
            timeout: self.timeout,
            label: self.label,
            init_time: self.init_time,
            event_time,
            duration: event_time - self.init_time,
        }
    }
}
