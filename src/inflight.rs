//! In-flight request deduplication.
//!
//! A caller identity (the client IP as seen by the server) may only have one
//! generate operation outstanding at a time. This module tracks the busy
//! identities in a mutex-guarded set owned by the application state: an
//! explicit instance, not a process-wide singleton, so tests can construct
//! isolated sets.
//!
//! The set is intentionally not durable: it resets to empty on restart, so a
//! crash mid-request silently frees that slot.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Process-lifetime set of caller identities currently executing a generate
/// operation.
#[derive(Debug, Default)]
pub struct InFlight {
    inner: Mutex<HashSet<String>>,
}

impl InFlight {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark `identity` as busy.
    ///
    /// Returns a guard that releases the slot when dropped, or `None` (with
    /// no mutation) if the identity is already in flight. Tying the release
    /// to `Drop` guarantees it runs on every exit path of the guarded
    /// operation (success, failure, or panic), so an identity can never be
    /// permanently stuck.
    pub fn try_acquire(self: &Arc<Self>, identity: &str) -> Option<InFlightGuard> {
        let mut set = self.inner.lock().expect("inflight mutex poisoned");
        if !set.insert(identity.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            set: Arc::clone(self),
            identity: identity.to_string(),
        })
    }

    /// Unconditionally clear the busy mark for `identity`.
    fn release(&self, identity: &str) {
        let mut set = self.inner.lock().expect("inflight mutex poisoned");
        set.remove(identity);
    }
}

/// RAII handle for an acquired in-flight slot.
#[derive(Debug)]
pub struct InFlightGuard {
    set: Arc<InFlight>,
    identity: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.release(&self.identity);
    }
}
