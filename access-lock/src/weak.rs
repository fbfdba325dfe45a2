use std::sync::atomic::{AtomicU8, Ordering};

/// State of a weak lock as seen by its holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WeakLock {
    /// Not registered with any lock.
    Unlocked = 0,
    /// A writer is waiting; the holder should call
    /// [`weak_unlock`](crate::AccessLock::weak_unlock) at its next convenient point.
    Unlocking = 1,
    /// Registered and not contested.
    Locked = 2,
}

impl WeakLock {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => WeakLock::Unlocking,
            2 => WeakLock::Locked,
            _ => WeakLock::Unlocked,
        }
    }
}

/// Tri-state flag shared between a weak holder and an [`AccessLock`](crate::AccessLock).
///
/// The holder creates the flag (usually behind an `Arc`) and polls it; the
/// lock only transitions it while the flag is registered.
#[derive(Debug)]
pub struct WeakFlag {
    state: AtomicU8,
}

impl WeakFlag {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(WeakLock::Unlocked as u8),
        }
    }

    pub fn get(&self) -> WeakLock {
        WeakLock::from_u8(self.state.load(Ordering::Acquire))
    }

    /// `true` once a writer has asked the holder to let go.
    pub fn unlock_requested(&self) -> bool {
        self.get() == WeakLock::Unlocking
    }

    pub(crate) fn set(&self, state: WeakLock) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// `Unlocked -> Locked`. `false` if the flag is already in use.
    pub(crate) fn try_register(&self) -> bool {
        self.state
            .compare_exchange(
                WeakLock::Unlocked as u8,
                WeakLock::Locked as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// `Locked -> Unlocking`. Any other state is left alone.
    pub(crate) fn request_unlock(&self) {
        let _ = self.state.compare_exchange(
            WeakLock::Locked as u8,
            WeakLock::Unlocking as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

impl Default for WeakFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_only_moves_locked_flags() {
        let flag = WeakFlag::new();
        flag.request_unlock();
        assert_eq!(flag.get(), WeakLock::Unlocked);

        flag.set(WeakLock::Locked);
        flag.request_unlock();
        assert_eq!(flag.get(), WeakLock::Unlocking);
        assert!(flag.unlock_requested());

        flag.request_unlock();
        assert_eq!(flag.get(), WeakLock::Unlocking);
    }

    #[test]
    fn register_only_takes_unlocked_flags() {
        let flag = WeakFlag::new();
        assert!(flag.try_register());
        assert_eq!(flag.get(), WeakLock::Locked);
        assert!(!flag.try_register());

        flag.request_unlock();
        assert!(!flag.try_register());
        assert_eq!(flag.get(), WeakLock::Unlocking);

        flag.set(WeakLock::Unlocked);
        assert!(flag.try_register());
    }
}
