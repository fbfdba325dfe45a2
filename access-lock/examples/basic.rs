//! Minimal access-lock example.
//!
//! Run with: `cargo run --example basic`

use access_lock::{AccessLock, LockResult, LockType, Timeout};

fn main() {
    let lock = AccessLock::new();

    // Raw API: every `Ok` result goes back to `unlock`.
    let result = lock.lock(LockType::Write, Timeout::Millis(500));
    assert_eq!(result, LockResult::Ok);

    // Nested calls on the writing thread are re-entrant.
    let nested = lock.lock(LockType::Read, Timeout::IMMEDIATE);
    println!("nested lock: {nested:?}");
    lock.unlock(nested);
    lock.unlock(result);

    // Guard API: released on drop.
    let reader = lock.read(Timeout::IMMEDIATE).expect("no writer is active");
    println!("readers: {}", lock.read_locks());
    drop(reader);

    println!("final: {lock:?}");
}
