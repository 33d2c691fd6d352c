//! Per-owner write serialization
//!
//! Cycle checks and edge inserts for one owner run under that owner's
//! mutex, so two inserts can never each pass a check against a graph the
//! other is about to change. Owners do not contend with each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::Duration;

use super::cancel::CancelToken;
use super::error::EngineResult;
use crate::domain::OwnerId;

const LOCK_POLL: Duration = Duration::from_millis(1);

/// Idle entries are pruned once the table grows past this size
const PRUNE_THRESHOLD: usize = 64;

#[derive(Debug, Default)]
pub(crate) struct OwnerLocks {
    locks: Mutex<HashMap<OwnerId, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex guarding `owner`'s edge set
    pub fn for_owner(&self, owner: &OwnerId) -> Arc<Mutex<()>> {
        // The table only maps owners to mutexes; a poisoned table is still valid
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());

        if locks.len() > PRUNE_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        locks
            .entry(owner.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Waits for `lock`, giving up when `cancel` fires or its deadline passes
    ///
    /// `Mutex::lock` cannot be interrupted, so the wait polls `try_lock` and
    /// checks the token between attempts.
    pub fn acquire<'a>(lock: &'a Mutex<()>, cancel: &CancelToken) -> EngineResult<MutexGuard<'a, ()>> {
        loop {
            match lock.try_lock() {
                Ok(guard) => return Ok(guard),
                // Guards no data, so a panicked holder leaves nothing inconsistent
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    cancel.check()?;
                    thread::sleep(LOCK_POLL);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;

    fn owner(name: &str) -> OwnerId {
        OwnerId::new(name).unwrap()
    }

    #[test]
    fn same_owner_shares_a_lock() {
        let locks = OwnerLocks::new();
        let a = locks.for_owner(&owner("alice"));
        let b = locks.for_owner(&owner("alice"));
        let c = locks.for_owner(&owner("bob"));

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn acquire_gives_up_on_cancel() {
        let locks = OwnerLocks::new();
        let lock = locks.for_owner(&owner("alice"));
        let _held = lock.lock().unwrap();

        let token = CancelToken::new();
        token.cancel();

        let result = OwnerLocks::acquire(&lock, &token);
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[test]
    fn acquire_gives_up_at_deadline() {
        let locks = OwnerLocks::new();
        let lock = locks.for_owner(&owner("alice"));
        let _held = lock.lock().unwrap();

        let token = CancelToken::with_timeout(Duration::from_millis(20));
        let result = OwnerLocks::acquire(&lock, &token);
        assert!(matches!(result, Err(EngineError::TimedOut(_))));
    }

    #[test]
    fn acquire_succeeds_when_free() {
        let locks = OwnerLocks::new();
        let lock = locks.for_owner(&owner("alice"));

        assert!(OwnerLocks::acquire(&lock, &CancelToken::new()).is_ok());
    }

    #[test]
    fn idle_entries_are_pruned() {
        let locks = OwnerLocks::new();
        for i in 0..=PRUNE_THRESHOLD + 1 {
            locks.for_owner(&owner(&format!("owner-{}", i)));
        }

        let held = locks.for_owner(&owner("keeper"));
        let size = locks.locks.lock().unwrap().len();
        assert!(size <= 2, "expected pruned table, got {} entries", size);
        drop(held);
    }
}
