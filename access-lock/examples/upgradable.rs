//! Demonstrates upgrading a read hold only when a write turns out to be needed.
//!
//! Run with: `cargo run --example upgradable`

use access_lock::{AccessLock, Timeout};
use std::sync::Mutex;

struct Inventory {
    lock: AccessLock,
    items: Mutex<Vec<String>>,
}

fn main() {
    let inventory = Inventory {
        lock: AccessLock::new(),
        items: Mutex::new(vec!["apple".into(), "banana".into()]),
    };
    let item = "cherry";

    // Start with shared access: other readers are not blocked while we look.
    let reader = inventory
        .lock
        .read(Timeout::Millis(500))
        .expect("inventory is busy");

    let present = inventory.items.lock().unwrap().iter().any(|i| i == item);
    if present {
        println!("'{item}' already exists, no write needed");
        return;
    }

    println!("'{item}' not found, upgrading to write...");
    if !inventory.lock.can_write_lock_from_read() {
        println!("other readers are active, the upgrade will wait for them");
    }

    let writer = match reader.upgrade(Timeout::Millis(500)) {
        Ok(writer) => writer,
        Err(_reader) => {
            println!("could not upgrade, giving up");
            return;
        }
    };
    inventory.items.lock().unwrap().push(item.into());

    // Back to shared access without letting another writer in between.
    let _reader = writer.downgrade();
    println!("items: {:?}", inventory.items.lock().unwrap());
}
