//! Shared, lockable pool state
//!
//! A pool is entered for mutation through [`PoolCell::lock`]. The lock is
//! never waited on: a second entry while the first is still running (a
//! callback calling back into the same pool) fails with `Locked`, and the
//! guard releases the pool on every exit path.
//!
//! Readers never touch the lock. Each cell also holds the last committed
//! state behind an `Arc`, republished when a write guard drops, so quotes
//! keep running against a pool that is in the middle of an operation.

use parking_lot::{RwLock, RwLockWriteGuard};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::warn;
use types::{Address, DexError, DexResult};

#[derive(Debug)]
struct Shared<P> {
    live: RwLock<P>,
    committed: RwLock<Arc<P>>,
}

/// Handle to one pool's state, cheap to clone
#[derive(Debug)]
pub struct PoolCell<P> {
    address: Address,
    inner: Arc<Shared<P>>,
}

impl<P> Clone for PoolCell<P> {
    fn clone(&self) -> Self {
        Self {
            address: self.address,
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Exclusive entry into a pool; publishes the new state when dropped
pub struct PoolGuard<'a, P: Clone> {
    guard: RwLockWriteGuard<'a, P>,
    committed: &'a RwLock<Arc<P>>,
    dirty: bool,
}

impl<P: Clone> Deref for PoolGuard<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.guard
    }
}

impl<P: Clone> DerefMut for PoolGuard<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.dirty = true;
        &mut self.guard
    }
}

impl<P: Clone> Drop for PoolGuard<'_, P> {
    fn drop(&mut self) {
        if self.dirty {
            *self.committed.write() = Arc::new((*self.guard).clone());
        }
    }
}

impl<P> PoolCell<P> {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_locked(&self) -> bool {
        self.inner.live.is_locked_exclusive()
    }

    /// Last committed state, never blocked by an operation in flight
    pub fn read(&self) -> Arc<P> {
        Arc::clone(&self.inner.committed.read())
    }
}

impl<P: Clone> PoolCell<P> {
    pub fn new(address: Address, pool: P) -> Self {
        let committed = Arc::new(pool.clone());
        Self {
            address,
            inner: Arc::new(Shared {
                live: RwLock::new(pool),
                committed: RwLock::new(committed),
            }),
        }
    }

    /// Enter the pool for a state-mutating operation
    pub fn lock(&self) -> DexResult<PoolGuard<'_, P>> {
        let guard = self.inner.live.try_write().ok_or_else(|| {
            warn!(pool = ?self.address, "rejected reentrant entry");
            DexError::Locked
        })?;
        Ok(PoolGuard {
            guard,
            committed: &self.inner.committed,
            dirty: false,
        })
    }

    /// Copy of the committed state, used to undo multi-pool operations
    ///
    /// Fails with `Locked` while an operation is in flight.
    pub fn snapshot(&self) -> DexResult<P> {
        if self.is_locked() {
            return Err(DexError::Locked);
        }
        Ok((*self.read()).clone())
    }

    /// Put back a state previously taken with [`PoolCell::snapshot`]
    pub fn restore(&self, state: P) -> DexResult<()> {
        *self.lock()? = state;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_entry_is_locked() {
        let cell = PoolCell::new(Address::from_low_u64_be(1), 5u32);
        let alias = cell.clone();

        let mut guard = cell.lock().unwrap();
        *guard += 1;
        assert!(alias.is_locked());
        assert_eq!(alias.lock().err(), Some(DexError::Locked));
        assert_eq!(alias.snapshot().err(), Some(DexError::Locked));
        drop(guard);

        assert_eq!(*alias.read(), 6);
        assert!(!alias.is_locked());
    }

    #[test]
    fn test_readers_see_committed_state_during_an_operation() {
        let cell = PoolCell::new(Address::from_low_u64_be(1), 5u32);
        let reader = cell.clone();

        let mut guard = cell.lock().unwrap();
        *guard = 9;
        assert_eq!(*reader.read(), 5);

        let handle = std::thread::spawn(move || *reader.read());
        assert_eq!(handle.join().unwrap(), 5);

        drop(guard);
        assert_eq!(*cell.read(), 9);
    }

    #[test]
    fn test_guard_released_on_error_path() {
        let cell = PoolCell::new(Address::from_low_u64_be(1), 0u32);
        let failing = |cell: &PoolCell<u32>| -> DexResult<()> {
            let _guard = cell.lock()?;
            Err(DexError::InsufficientLiquidity)
        };
        assert!(failing(&cell).is_err());
        assert!(cell.lock().is_ok());
        assert_eq!(*cell.read(), 0);
    }

    #[test]
    fn test_snapshot_and_restore() {
        let cell = PoolCell::new(Address::from_low_u64_be(1), vec![1u8, 2]);
        let saved = cell.snapshot().unwrap();
        cell.lock().unwrap().push(3);
        assert_eq!(*cell.read(), vec![1, 2, 3]);
        cell.restore(saved).unwrap();
        assert_eq!(*cell.read(), vec![1, 2]);
    }
}
