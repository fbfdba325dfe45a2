mod common;

use access_lock::{AccessLock, LockResult, LockType, Timeout, WeakFlag, WeakLock, POLL_INTERVAL};
use common::{init_test_logging, SLACK};
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn concurrent_readers_all_succeed() {
    init_test_logging();
    let lock = AccessLock::new();
    let threads = 8;
    let held = Barrier::new(threads + 1);
    let release = Barrier::new(threads + 1);

    thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                let result = lock.lock(LockType::Read, Timeout::IMMEDIATE);
                assert_eq!(result, LockResult::Ok);
                held.wait();
                release.wait();
                lock.unlock(result);
            });
        }

        held.wait();
        assert_eq!(lock.read_locks(), threads);
        assert!(!lock.is_write_locked());
        release.wait();
    });

    assert_eq!(lock.read_locks(), 0);
}

#[test]
fn reentrancy_is_per_thread() {
    let lock = AccessLock::new();
    let write = lock.lock(LockType::Write, Timeout::IMMEDIATE);
    assert_eq!(write, LockResult::Ok);

    thread::scope(|s| {
        s.spawn(|| {
            assert_eq!(lock.lock(LockType::Read, Timeout::IMMEDIATE), LockResult::Fail);
            assert_eq!(lock.lock(LockType::Write, Timeout::IMMEDIATE), LockResult::Fail);
            assert!(!lock.can_write_lock_from_read());
        });
    });

    lock.unlock(write);
}

#[test]
fn writer_waits_for_reader_to_leave() {
    let lock = AccessLock::new();
    let read = lock.lock(LockType::Read, Timeout::IMMEDIATE);
    let hold = Duration::from_millis(150);

    let start = Instant::now();
    thread::scope(|s| {
        let writer = s.spawn(|| {
            let result = lock.lock(LockType::Write, Timeout::Unbounded);
            (result, start.elapsed())
        });

        thread::sleep(hold);
        lock.unlock(read);

        let (result, waited) = writer.join().unwrap();
        assert_eq!(result, LockResult::Ok);
        // Polling means the release is seen at most one interval late.
        assert!(waited >= hold, "{waited:?}");
        assert!(waited < hold + POLL_INTERVAL + SLACK, "{waited:?}");
        lock.unlock(result);
    });
}

#[test]
fn upgrade_with_two_readers_never_succeeds() {
    let lock = AccessLock::new();
    let both_reading = Barrier::new(2);
    let done = Barrier::new(2);

    thread::scope(|s| {
        s.spawn(|| {
            let read = lock.lock(LockType::Read, Timeout::IMMEDIATE);
            both_reading.wait();
            done.wait();
            lock.unlock(read);
        });

        let read = lock.lock(LockType::Read, Timeout::IMMEDIATE);
        both_reading.wait();

        let start = Instant::now();
        assert_eq!(lock.upgrade_to_write(Timeout::Millis(300)), LockResult::Fail);
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert_eq!(lock.read_locks(), 2);

        done.wait();
        lock.unlock(read);
    });
}

#[test]
fn upgrade_succeeds_once_other_reader_leaves() {
    let lock = AccessLock::new();
    let both_reading = Barrier::new(2);

    thread::scope(|s| {
        s.spawn(|| {
            let read = lock.lock(LockType::Read, Timeout::IMMEDIATE);
            both_reading.wait();
            thread::sleep(Duration::from_millis(120));
            lock.unlock(read);
        });

        assert_eq!(lock.lock(LockType::Read, Timeout::IMMEDIATE), LockResult::Ok);
        both_reading.wait();

        let write = lock.upgrade_to_write(Timeout::Millis(1_000));
        assert_eq!(write, LockResult::Ok);
        assert_eq!(lock.read_locks(), 0);
        lock.unlock(write);
    });
}

#[test]
fn downgrade_leaves_no_unlocked_window() {
    let lock = AccessLock::new();
    let downgraded = AtomicBool::new(false);
    let released = AtomicBool::new(false);
    let stolen = AtomicUsize::new(0);
    let reads_seen = AtomicUsize::new(0);

    let write = lock.lock(LockType::Write, Timeout::IMMEDIATE);
    assert_eq!(write, LockResult::Ok);

    thread::scope(|s| {
        s.spawn(|| {
            while !released.load(Ordering::Acquire) {
                let result = lock.lock(LockType::Write, Timeout::IMMEDIATE);
                if result == LockResult::Ok {
                    if !released.load(Ordering::Acquire) {
                        stolen.fetch_add(1, Ordering::Relaxed);
                    }
                    lock.unlock(result);
                }
                if downgraded.load(Ordering::Acquire) {
                    let read = lock.lock(LockType::Read, Timeout::IMMEDIATE);
                    if read == LockResult::Ok {
                        reads_seen.fetch_add(1, Ordering::Relaxed);
                    }
                    lock.unlock(read);
                }
            }
        });

        thread::sleep(Duration::from_millis(20));
        lock.downgrade_to_read(write);
        downgraded.store(true, Ordering::Release);
        assert!(lock.read_locks() >= 1);
        assert!(!lock.is_write_locked());

        thread::sleep(Duration::from_millis(50));
        released.store(true, Ordering::Release);
        lock.unlock(write);
    });

    assert_eq!(stolen.load(Ordering::Relaxed), 0);
    assert!(reads_seen.load(Ordering::Relaxed) > 0);
}

#[test]
fn writer_preempts_weak_holder() {
    init_test_logging();
    let lock = AccessLock::new();
    let flag = Arc::new(WeakFlag::new());
    assert!(lock.weak_lock(&flag));
    assert_eq!(flag.get(), WeakLock::Locked);

    thread::scope(|s| {
        let writer = s.spawn(|| {
            let result = lock.lock(LockType::Write, Timeout::Millis(500));
            let acquired_at = Instant::now();
            (result, acquired_at)
        });

        // The weak holder notices the request at its own pace.
        let deadline = Instant::now() + Duration::from_millis(400);
        while !flag.unlock_requested() {
            assert!(Instant::now() < deadline, "writer never signalled the weak holder");
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!lock.is_write_locked());

        let released_at = Instant::now();
        lock.weak_unlock();

        let (result, acquired_at) = writer.join().unwrap();
        assert_eq!(result, LockResult::Ok);
        assert!(acquired_at.duration_since(released_at) < POLL_INTERVAL + SLACK);
        assert_eq!(flag.get(), WeakLock::Unlocked);
        assert!(!lock.has_weak_lock());
        lock.unlock(result);
    });
}

#[test]
fn unanswered_weak_lock_times_out_writer() {
    let lock = AccessLock::new();
    let flag = Arc::new(WeakFlag::new());
    assert!(lock.weak_lock(&flag));

    thread::scope(|s| {
        let result = s
            .spawn(|| lock.lock(LockType::Write, Timeout::Millis(200)))
            .join()
            .unwrap();
        assert_eq!(result, LockResult::Fail);
    });

    assert_eq!(flag.get(), WeakLock::Unlocking);
    assert!(!lock.is_write_locked());
    lock.weak_unlock();
}

#[test]
fn write_ownership_moves_between_threads() {
    let lock = AccessLock::new();
    let write = lock.lock(LockType::Write, Timeout::IMMEDIATE);
    let main_id = thread::current().id();
    assert_eq!(lock.writer_thread(), Some(main_id));

    let worker_id = thread::scope(|s| {
        s.spawn(|| {
            lock.update_writer_thread();
            assert_eq!(lock.lock(LockType::Read, Timeout::IMMEDIATE), LockResult::Reentrant);
            thread::current().id()
        })
        .join()
        .unwrap()
    });

    assert_eq!(lock.writer_thread(), Some(worker_id));
    // The original thread is no longer the recorded writer.
    assert_eq!(lock.lock(LockType::Read, Timeout::IMMEDIATE), LockResult::Fail);

    lock.update_writer_thread();
    assert_eq!(lock.writer_thread(), Some(main_id));
    lock.unlock(write);
}

#[test]
fn randomized_load_keeps_mutual_exclusion() {
    init_test_logging();
    let lock = AccessLock::new();
    let readers = AtomicUsize::new(0);
    let writers = AtomicUsize::new(0);
    let violations = AtomicUsize::new(0);

    let check_writer = || {
        if writers.load(Ordering::SeqCst) != 1 || readers.load(Ordering::SeqCst) != 0 {
            violations.fetch_add(1, Ordering::SeqCst);
        }
    };
    let check_reader = || {
        if writers.load(Ordering::SeqCst) != 0 {
            violations.fetch_add(1, Ordering::SeqCst);
        }
    };

    thread::scope(|s| {
        for _ in 0..6 {
            s.spawn(|| {
                let mut rng = rand::thread_rng();
                for _ in 0..150 {
                    let timeout = Timeout::Millis(rng.gen_range(0..=10));
                    match rng.gen_range(0..4) {
                        0 => {
                            let result = lock.lock(LockType::Write, timeout);
                            if result == LockResult::Ok {
                                writers.fetch_add(1, Ordering::SeqCst);
                                check_writer();
                                thread::yield_now();
                                check_writer();
                                writers.fetch_sub(1, Ordering::SeqCst);
                            }
                            lock.unlock(result);
                        }
                        1 => {
                            let read = lock.lock(LockType::Read, timeout);
                            if read != LockResult::Ok {
                                continue;
                            }
                            readers.fetch_add(1, Ordering::SeqCst);
                            check_reader();
                            readers.fetch_sub(1, Ordering::SeqCst);
                            let write = lock.upgrade_to_write(timeout);
                            if write == LockResult::Ok {
                                writers.fetch_add(1, Ordering::SeqCst);
                                check_writer();
                                writers.fetch_sub(1, Ordering::SeqCst);
                                lock.downgrade_to_read(write);
                            }
                            readers.fetch_add(1, Ordering::SeqCst);
                            check_reader();
                            readers.fetch_sub(1, Ordering::SeqCst);
                            lock.unlock(read);
                        }
                        _ => {
                            let read = lock.lock(LockType::Read, timeout);
                            if read == LockResult::Ok {
                                readers.fetch_add(1, Ordering::SeqCst);
                                check_reader();
                                thread::yield_now();
                                check_reader();
                                readers.fetch_sub(1, Ordering::SeqCst);
                            }
                            lock.unlock(read);
                        }
                    }
                }
            });
        }
    });

    assert_eq!(violations.load(Ordering::SeqCst), 0);
    assert_eq!(lock.read_locks(), 0);
    assert!(!lock.is_write_locked());
}
