//! Thread-owned transaction gate for the bundled stores

use crate::sync::MutexExt;
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

/// Exclusive, thread-owned access to a store.
///
/// The thread running a transaction holds the gate until the transaction
/// commits or rolls back. Every other thread waits at [`enter`](Self::enter)
/// for that, so foreign reads never see uncommitted writes and foreign writes
/// never land in someone else's journal. Calls made by the owning thread pass
/// straight through, which is what nests an inner transaction into the outer
/// one.
#[derive(Debug, Default)]
pub(crate) struct TransactionGate {
    owner: Mutex<Option<ThreadId>>,
    released: Condvar,
}

/// Releases the gate on drop, including during unwinding
#[derive(Debug)]
pub(crate) struct GateGuard<'a> {
    gate: &'a TransactionGate,
}

impl TransactionGate {
    /// Take the gate for the calling thread.
    ///
    /// Returns `None` if the calling thread already holds it. Otherwise blocks
    /// until no other thread does.
    pub(crate) fn enter(&self) -> Option<GateGuard<'_>> {
        let me = thread::current().id();
        let mut owner = self.owner.lock_recovered();
        if *owner == Some(me) {
            return None;
        }
        while owner.is_some() {
            owner = self
                .released
                .wait(owner)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *owner = Some(me);
        Some(GateGuard { gate: self })
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        *self.gate.owner.lock_recovered() = None;
        self.gate.released.notify_all();
    }
}
