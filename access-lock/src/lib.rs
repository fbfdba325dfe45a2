//! Reentrant reader/writer lock with **timed acquisition** and **cooperative weak locks**.
//!
//! [`AccessLock`] arbitrates access to a resource it does not own: callers
//! take it before touching the resource and release it afterwards. It allows
//! many readers or one writer, lets the writing thread lock again without
//! deadlocking itself, and supports a *weak lock*: a low-priority hold that a
//! pending writer asks to step aside instead of waiting behind it forever.
//!
//! Acquisition polls the lock state every [`POLL_INTERVAL`] until it
//! succeeds or the [`Timeout`] runs out. A release is therefore observed by
//! waiters within one poll interval.
//!
//! # Quick Start
//!
//! ```rust
//! use access_lock::{AccessLock, LockResult, LockType, Timeout};
//!
//! let lock = AccessLock::new();
//!
//! let result = lock.lock(LockType::Write, Timeout::Millis(500));
//! assert_eq!(result, LockResult::Ok);
//!
//! // The writing thread may lock again; nothing new is taken.
//! let nested = lock.lock(LockType::Read, Timeout::IMMEDIATE);
//! assert_eq!(nested, LockResult::Reentrant);
//! lock.unlock(nested);
//!
//! lock.unlock(result);
//! assert!(!lock.is_write_locked());
//! ```
//!
//! # Guards
//!
//! ```rust
//! # use access_lock::{AccessLock, Timeout};
//! let lock = AccessLock::new();
//!
//! let reader = lock.read(Timeout::IMMEDIATE).unwrap();
//! assert!(lock.can_write_lock_from_read());
//!
//! // Upgrade while we are the only reader, then hand write access back
//! // without an unlocked window.
//! let writer = reader.upgrade(Timeout::IMMEDIATE).unwrap();
//! let reader = writer.downgrade();
//! assert_eq!(lock.read_locks(), 1);
//! drop(reader);
//! ```
//!
//! # Weak locks
//!
//! ```rust
//! # use access_lock::{AccessLock, LockType, Timeout};
//! let lock = AccessLock::new();
//! let weak = lock.try_weak().unwrap();
//!
//! // A writer with no budget signals the weak holder and gives up.
//! let result = lock.lock(LockType::Write, Timeout::IMMEDIATE);
//! assert_eq!(result, access_lock::LockResult::Fail);
//! assert!(weak.unlock_requested());
//!
//! // The holder yields at its next convenient point.
//! drop(weak);
//! let result = lock.lock(LockType::Write, Timeout::IMMEDIATE);
//! assert_eq!(result, access_lock::LockResult::Ok);
//! lock.unlock(result);
//! ```
//!
//! Guards encode their mode in the type, so only write guards downgrade:
//!
//! ```compile_fail
//! # use access_lock::{AccessLock, Timeout};
//! let lock = AccessLock::new();
//! let reader = lock.read(Timeout::IMMEDIATE).unwrap();
//! let _ = reader.downgrade();
//! ```
//!
//! # Protocol violations
//!
//! Unlocking without a hold, releasing a weak lock that is not registered,
//! or dropping a lock that is still held are caller bugs. They panic in
//! debug builds (and with the `strict` feature); release builds log them
//! through `tracing` and skip the operation.

mod error;
mod guard;
mod lock;
mod mode;
mod timeout;
mod weak;

pub use error::LockError;
pub use guard::{AccessGuard, WeakGuard};
pub use lock::AccessLock;
pub use mode::{LockMode, LockResult, LockType, ReadLocked, WriteLocked};
pub use timeout::{Timeout, POLL_INTERVAL};
pub use weak::{WeakFlag, WeakLock};
