//! Shared-result de-duplication of concurrent calls to the same resource.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};

/// A pending call that any number of callers can await.
pub type SharedCall<T> = Shared<BoxFuture<'static, T>>;

/// Tracks at most one pending call per key.
///
/// Callers arriving while a call is pending receive a clone of the same
/// `Shared` future and observe the same outcome, success or failure. The
/// call itself is responsible for invoking [`InFlightRequests::complete`]
/// once it settles so the next caller starts a fresh one.
pub struct InFlightRequests<T: Clone> {
    pending: DashMap<String, SharedCall<T>>,
}

impl<T> Default for InFlightRequests<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InFlightRequests<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Returns the pending call for `key`, starting one with `start` if none exists.
    ///
    /// The flag is `true` when this caller started the call. `start` runs while
    /// the key's shard is locked; it may spawn work but must not poll the future
    /// or touch this tracker.
    pub fn join_or_start<F>(&self, key: &str, start: F) -> (SharedCall<T>, bool)
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        match self.pending.entry(key.to_string()) {
            Entry::Occupied(existing) => (existing.get().clone(), false),
            Entry::Vacant(slot) => {
                let call = start().shared();
                slot.insert(call.clone());
                (call, true)
            }
        }
    }

    /// Forgets the pending call for `key`.
    pub fn complete(&self, key: &str) {
        self.pending.remove(key);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
