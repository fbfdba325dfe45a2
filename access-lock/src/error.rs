use thiserror::Error;

use crate::mode::LockType;
use crate::timeout::Timeout;

/// Why a guard could not be obtained.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    #[error("could not acquire {lock_type} access within {timeout}")]
    Timeout { lock_type: LockType, timeout: Timeout },

    #[error("could not upgrade to write access within {timeout}")]
    UpgradeTimeout { timeout: Timeout },

    #[error("a weak lock is already registered or the lock is held for writing")]
    WeakLockBusy,
}

/// Reports a broken lock/unlock pairing.
///
/// Panics in debug builds and with the `strict` feature. Otherwise the
/// violation is logged and the caller turns the operation into a no-op.
macro_rules! protocol_violation {
    ($($arg:tt)+) => {{
        if cfg!(any(debug_assertions, feature = "strict")) {
            panic!("access lock protocol violation: {}", format_args!($($arg)+));
        } else {
            tracing::error!("access lock protocol violation: {}", format_args!($($arg)+));
        }
    }};
}

pub(crate) use protocol_violation;
