use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::sync::Arc;

use crate::error::LockError;
use crate::lock::AccessLock;
use crate::mode::{LockMode, LockResult, ReadLocked, WriteLocked};
use crate::timeout::Timeout;
use crate::weak::{WeakFlag, WeakLock};

/// A hold on an [`AccessLock`] whose access level is encoded in `M`.
///
/// - `AccessGuard<'a, ReadLocked>`: shared access, can `.upgrade()`
/// - `AccessGuard<'a, WriteLocked>`: exclusive access, can `.downgrade()`
///
/// A guard obtained re-entrantly (the thread already held the write lock)
/// releases nothing on drop, so nested guards never end the outer hold.
pub struct AccessGuard<'a, M> {
    lock: &'a AccessLock,
    result: LockResult,
    _mode: PhantomData<M>,
}

impl<'a, M: LockMode> AccessGuard<'a, M> {
    /// Acquires the lock in `M::TYPE` mode.
    pub fn acquire(lock: &'a AccessLock, timeout: Timeout) -> Result<Self, LockError> {
        match lock.lock(M::TYPE, timeout) {
            LockResult::Fail => Err(LockError::Timeout {
                lock_type: M::TYPE,
                timeout,
            }),
            result => Ok(Self::from_result(lock, result)),
        }
    }
}

impl<'a, M> AccessGuard<'a, M> {
    fn from_result(lock: &'a AccessLock, result: LockResult) -> Self {
        debug_assert!(result.is_acquired());
        Self {
            lock,
            result,
            _mode: PhantomData,
        }
    }

    /// Either [`LockResult::Ok`] or [`LockResult::Reentrant`].
    pub fn result(&self) -> LockResult {
        self.result
    }

    pub fn is_reentrant(&self) -> bool {
        self.result == LockResult::Reentrant
    }

    pub fn lock(&self) -> &'a AccessLock {
        self.lock
    }

    /// Disarms the guard. The caller becomes responsible for passing the
    /// returned result to [`AccessLock::unlock`].
    pub fn into_result(self) -> LockResult {
        let this = ManuallyDrop::new(self);
        this.result
    }
}

// --- Upgrade: ReadLocked -> WriteLocked (waits for other readers to leave) ---
impl<'a> AccessGuard<'a, ReadLocked> {
    /// Upgrades to exclusive access, waiting at most `timeout` for this guard
    /// to become the only reader. Hands the read guard back on failure.
    ///
    /// A re-entrant read guard upgrades to a re-entrant write guard.
    pub fn upgrade(self, timeout: Timeout) -> Result<AccessGuard<'a, WriteLocked>, Self> {
        let lock = self.lock;
        match lock.upgrade_to_write(timeout) {
            LockResult::Fail => Err(self),
            result => {
                let _ = self.into_result();
                Ok(AccessGuard::from_result(lock, result))
            }
        }
    }

    /// Like [`upgrade`](Self::upgrade) but reports the timeout as an error,
    /// releasing the read hold.
    pub fn try_upgrade(self, timeout: Timeout) -> Result<AccessGuard<'a, WriteLocked>, LockError> {
        self.upgrade(timeout)
            .map_err(|_| LockError::UpgradeTimeout { timeout })
    }
}

// --- Downgrade: WriteLocked -> ReadLocked (never waits) ---
impl<'a> AccessGuard<'a, WriteLocked> {
    /// Trades exclusive access for shared access without releasing the lock
    /// in between.
    pub fn downgrade(self) -> AccessGuard<'a, ReadLocked> {
        let lock = self.lock;
        let result = self.into_result();
        lock.downgrade_to_read(result);
        AccessGuard::from_result(lock, result)
    }

    /// Claims this write hold for the calling thread, e.g. after moving the
    /// guard to a worker thread.
    pub fn adopt(&self) {
        self.lock.update_writer_thread();
    }
}

impl<M: LockMode> fmt::Debug for AccessGuard<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGuard")
            .field("mode", &M::TYPE)
            .field("result", &self.result)
            .finish()
    }
}

impl<M> Drop for AccessGuard<'_, M> {
    fn drop(&mut self) {
        self.lock.unlock(self.result);
    }
}

/// A registered weak lock. Releases itself on drop.
///
/// Holders should check [`unlock_requested`](Self::unlock_requested) between
/// units of work and drop the guard promptly once it returns `true`, since a
/// writer is waiting.
pub struct WeakGuard<'a> {
    lock: &'a AccessLock,
    flag: Arc<WeakFlag>,
}

impl<'a> WeakGuard<'a> {
    pub fn unlock_requested(&self) -> bool {
        self.flag.unlock_requested()
    }

    pub fn state(&self) -> WeakLock {
        self.flag.get()
    }

    pub fn flag(&self) -> &Arc<WeakFlag> {
        &self.flag
    }
}

impl fmt::Debug for WeakGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakGuard")
            .field("state", &self.flag.get())
            .finish()
    }
}

impl Drop for WeakGuard<'_> {
    fn drop(&mut self) {
        if self.flag.get() != WeakLock::Unlocked {
            self.lock.weak_unlock();
        }
    }
}

impl AccessLock {
    /// Shared access as an RAII guard.
    pub fn read(&self, timeout: Timeout) -> Result<AccessGuard<'_, ReadLocked>, LockError> {
        AccessGuard::acquire(self, timeout)
    }

    /// Exclusive access as an RAII guard.
    pub fn write(&self, timeout: Timeout) -> Result<AccessGuard<'_, WriteLocked>, LockError> {
        AccessGuard::acquire(self, timeout)
    }

    /// Registers a fresh weak lock. Fails with [`LockError::WeakLockBusy`]
    /// when another weak lock is registered or a writer holds the lock.
    pub fn try_weak(&self) -> Result<WeakGuard<'_>, LockError> {
        let flag = Arc::new(WeakFlag::new());
        if !self.weak_lock(&flag) {
            return Err(LockError::WeakLockBusy);
        }
        Ok(WeakGuard { lock: self, flag })
    }
}
