use std::fmt;

/// Access requested from an [`AccessLock`](crate::AccessLock).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockType {
    /// Shared access. Any number of readers may hold the lock at once.
    Read,
    /// Exclusive access. Held by at most one thread.
    Write,
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockType::Read => f.write_str("read"),
            LockType::Write => f.write_str("write"),
        }
    }
}

/// Outcome of an acquisition or an upgrade.
///
/// The value must be handed back to [`AccessLock::unlock`](crate::AccessLock::unlock)
/// (or [`downgrade_to_read`](crate::AccessLock::downgrade_to_read)) so the lock
/// knows whether this call actually took a hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use = "pass the result back to `unlock` to release the hold"]
pub enum LockResult {
    /// The hold was acquired (or the transition happened).
    Ok,
    /// The calling thread already holds the write lock. Nothing changed.
    Reentrant,
    /// The timeout elapsed before the hold could be acquired.
    Fail,
}

impl LockResult {
    /// `true` for [`Ok`](Self::Ok) and [`Reentrant`](Self::Reentrant): the
    /// caller may touch the protected resource.
    pub fn is_acquired(self) -> bool {
        !matches!(self, Self::Fail)
    }

    /// `true` only when this call took a hold that must be released.
    pub fn needs_unlock(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Marker: guard holds shared access and can be upgraded to [`WriteLocked`].
pub struct ReadLocked;

/// Marker: guard holds exclusive access and can be downgraded to [`ReadLocked`].
pub struct WriteLocked;

pub trait LockMode {
    const TYPE: LockType;
}

impl LockMode for ReadLocked {
    const TYPE: LockType = LockType::Read;
}

impl LockMode for WriteLocked {
    const TYPE: LockType = LockType::Write;
}
