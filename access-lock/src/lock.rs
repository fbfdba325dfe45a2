use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use crate::error::protocol_violation;
use crate::mode::{LockResult, LockType};
use crate::timeout::Timeout;
use crate::weak::{WeakFlag, WeakLock};

#[derive(Default)]
struct State {
    read_locks: usize,
    writer: Option<ThreadId>,
    weak: Option<Arc<WeakFlag>>,
}

impl State {
    fn written_by(&self, thread: ThreadId) -> bool {
        self.writer == Some(thread)
    }

    /// Asks a registered weak holder to let go. `true` while it still holds on.
    fn weak_lock_pending(&self) -> bool {
        let Some(flag) = &self.weak else {
            return false;
        };
        flag.request_unlock();
        flag.get() != WeakLock::Unlocked
    }
}

/// Reentrant reader/writer lock with timed acquisition and cooperative weak locks.
///
/// `AccessLock` guards nothing by itself: callers take it before touching a
/// shared resource and release it afterwards. Holds are tracked per call
/// through [`LockResult`], so every successful [`lock`](Self::lock) must be
/// paired with [`unlock`](Self::unlock) (or use the guard API in
/// [`AccessLock::read`] / [`AccessLock::write`]).
///
/// Waiting is a bounded poll: the internal mutex is only held to inspect and
/// update bookkeeping, and waiters sleep up to
/// [`POLL_INTERVAL`](crate::POLL_INTERVAL) between attempts. A thread that holds
/// the write lock may lock again in either mode and receives
/// [`LockResult::Reentrant`].
pub struct AccessLock {
    state: Mutex<State>,
}

impl AccessLock {
    /// Creates an unlocked lock with no weak lock registered.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// Acquires `lock_type` access, waiting at most `timeout`.
    ///
    /// Returns [`LockResult::Reentrant`] without waiting or touching any
    /// counter when the calling thread already holds the write lock. A write
    /// request first asks any registered weak holder to release and waits
    /// until it does.
    pub fn lock(&self, lock_type: LockType, timeout: Timeout) -> LockResult {
        let current = thread::current().id();
        if self.is_reentrant(current) {
            tracing::trace!(%lock_type, thread = ?current, "lock: reentrant");
            return LockResult::Reentrant;
        }

        self.poll("lock", lock_type, timeout, |state| match lock_type {
            LockType::Read => {
                if state.writer.is_some() {
                    return false;
                }
                state.read_locks += 1;
                true
            }
            LockType::Write => {
                if state.weak_lock_pending() {
                    return false;
                }
                if state.read_locks != 0 || state.writer.is_some() {
                    return false;
                }
                state.writer = Some(current);
                true
            }
        })
    }

    /// Releases a hold taken by [`lock`](Self::lock) or
    /// [`upgrade_to_write`](Self::upgrade_to_write).
    ///
    /// `Fail` and `Reentrant` results are ignored since those calls took nothing.
    pub fn unlock(&self, result: LockResult) {
        if result != LockResult::Ok {
            return;
        }

        let released = {
            let mut state = self.state.lock();
            if state.writer.take().is_some() {
                Some((LockType::Write, state.read_locks))
            } else if state.read_locks > 0 {
                state.read_locks -= 1;
                Some((LockType::Read, state.read_locks))
            } else {
                None
            }
        };

        match released {
            Some((lock_type, read_locks)) => tracing::trace!(
                %lock_type,
                read_locks,
                thread = ?thread::current().id(),
                "unlock: released"
            ),
            None => protocol_violation!("unlock called without a held lock"),
        }
    }

    /// `true` if an upgrade from the caller's read hold could go through now:
    /// the caller already writes, or it is the only reader and nobody writes.
    pub fn can_write_lock_from_read(&self) -> bool {
        let current = thread::current().id();
        let state = self.state.lock();
        if state.written_by(current) {
            return true;
        }
        state.read_locks == 1 && state.writer.is_none()
    }

    /// Turns the caller's read hold into a write hold.
    ///
    /// Only possible while the caller is the single reader. The read hold is
    /// consumed on [`LockResult::Ok`]; release the write hold with
    /// [`unlock`](Self::unlock) or go back with
    /// [`downgrade_to_read`](Self::downgrade_to_read). On `Fail` the read hold
    /// is untouched.
    pub fn upgrade_to_write(&self, timeout: Timeout) -> LockResult {
        let current = thread::current().id();
        if self.is_reentrant(current) {
            tracing::trace!(thread = ?current, "upgrade_to_write: reentrant");
            return LockResult::Reentrant;
        }

        self.poll("upgrade_to_write", LockType::Write, timeout, |state| {
            if state.weak_lock_pending() {
                return false;
            }
            if state.read_locks != 1 {
                return false;
            }
            debug_assert!(state.writer.is_none());
            state.read_locks = 0;
            state.writer = Some(current);
            true
        })
    }

    /// Swaps a write hold taken with `result` for a single read hold, with no
    /// window in which the lock is free.
    pub fn downgrade_to_read(&self, result: LockResult) {
        if result != LockResult::Ok {
            return;
        }

        let outcome = {
            let mut state = self.state.lock();
            if state.writer.is_none() {
                None
            } else if state.read_locks != 0 {
                Some(Err(state.read_locks))
            } else {
                state.writer = None;
                state.read_locks = 1;
                Some(Ok(()))
            }
        };

        match outcome {
            Some(Ok(())) => tracing::trace!(
                thread = ?thread::current().id(),
                "downgrade_to_read: write lock downgraded"
            ),
            Some(Err(read_locks)) => protocol_violation!(
                "downgrade_to_read found {} read locks under a write lock",
                read_locks
            ),
            None => protocol_violation!("downgrade_to_read called without a write lock"),
        }
    }

    /// Registers `flag` as the weak lock and sets it to [`WeakLock::Locked`].
    ///
    /// Fails without side effects when another weak lock is registered, the
    /// lock is held for writing, or `flag` is not [`WeakLock::Unlocked`]
    /// (it is still registered here or with another lock). Requests are not
    /// queued.
    pub fn weak_lock(&self, flag: &Arc<WeakFlag>) -> bool {
        let refused = {
            let mut state = self.state.lock();
            let weak_registered = state.weak.is_some();
            let write_locked = state.writer.is_some();
            if weak_registered || write_locked || !flag.try_register() {
                Some((weak_registered, write_locked))
            } else {
                state.weak = Some(Arc::clone(flag));
                None
            }
        };

        let current = thread::current().id();
        match refused {
            Some((weak_registered, write_locked)) => {
                tracing::trace!(
                    weak_registered,
                    write_locked,
                    flag = ?flag.get(),
                    thread = ?current,
                    "weak_lock: refused"
                );
                false
            }
            None => {
                tracing::trace!(thread = ?current, "weak_lock: registered");
                true
            }
        }
    }

    /// Releases the registered weak lock, marking its flag
    /// [`WeakLock::Unlocked`] so a waiting writer can proceed.
    pub fn weak_unlock(&self) {
        let released = {
            let mut state = self.state.lock();
            let write_locked = state.writer.is_some();
            state.weak.take().map(|flag| {
                let previous = flag.get();
                flag.set(WeakLock::Unlocked);
                (previous, write_locked)
            })
        };

        let Some((previous, write_locked)) = released else {
            protocol_violation!("weak_unlock called without a registered weak lock");
            return;
        };
        if previous == WeakLock::Unlocked {
            protocol_violation!("weak_unlock called on an already unlocked weak lock");
        }
        if write_locked {
            protocol_violation!("weak_unlock called while the lock is held for writing");
        }
        tracing::trace!(thread = ?thread::current().id(), "weak_unlock: released");
    }

    /// Re-stamps the write hold with the calling thread, for write holds that
    /// move between threads without being released. No effect unless write-held.
    pub fn update_writer_thread(&self) {
        let current = thread::current().id();
        let updated = match self.state.lock().writer.as_mut() {
            Some(writer) => {
                *writer = current;
                true
            }
            None => false,
        };
        if updated {
            tracing::trace!(thread = ?current, "update_writer_thread: new writer thread");
        }
    }

    /// Number of read holds outstanding.
    pub fn read_locks(&self) -> usize {
        self.state.lock().read_locks
    }

    /// `true` while some thread holds the write lock.
    pub fn is_write_locked(&self) -> bool {
        self.state.lock().writer.is_some()
    }

    /// Thread currently recorded as the writer.
    pub fn writer_thread(&self) -> Option<ThreadId> {
        self.state.lock().writer
    }

    /// `true` while a weak lock is registered.
    pub fn has_weak_lock(&self) -> bool {
        self.state.lock().weak.is_some()
    }

    fn is_reentrant(&self, current: ThreadId) -> bool {
        self.state.lock().written_by(current)
    }

    fn poll(
        &self,
        op: &'static str,
        lock_type: LockType,
        mut timeout: Timeout,
        mut attempt: impl FnMut(&mut State) -> bool,
    ) -> LockResult {
        let requested = timeout;
        let current = thread::current().id();
        loop {
            let (acquired, read_locks, write_locked) = {
                let mut state = self.state.lock();
                let acquired = attempt(&mut *state);
                (acquired, state.read_locks, state.writer.is_some())
            };

            if acquired {
                tracing::trace!(
                    op,
                    %lock_type,
                    read_locks,
                    write_locked,
                    thread = ?current,
                    "acquired"
                );
                return LockResult::Ok;
            }

            match timeout.take_delay() {
                Some(delay) => {
                    tracing::trace!(op, %lock_type, ?delay, thread = ?current, "waiting");
                    thread::sleep(delay);
                }
                None => {
                    tracing::trace!(
                        op,
                        %lock_type,
                        timeout = %requested,
                        read_locks,
                        write_locked,
                        thread = ?current,
                        "cannot lock"
                    );
                    return LockResult::Fail;
                }
            }
        }
    }
}

impl Default for AccessLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AccessLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AccessLock")
            .field("read_locks", &state.read_locks)
            .field("writer", &state.writer)
            .field("weak", &state.weak.as_ref().map(|flag| flag.get()))
            .finish()
    }
}

impl Drop for AccessLock {
    fn drop(&mut self) {
        if thread::panicking() {
            return;
        }
        let state = self.state.get_mut();
        if state.writer.is_some() {
            protocol_violation!("AccessLock dropped while held for writing");
        }
        if state.read_locks != 0 {
            protocol_violation!("AccessLock dropped with {} read locks", state.read_locks);
        }
        if state.weak.is_some() {
            protocol_violation!("AccessLock dropped with a registered weak lock");
        }
    }
}
