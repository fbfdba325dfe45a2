//! A background worker renders under a weak lock and steps aside when the
//! editing thread needs to write.
//!
//! Run with: `cargo run --example background_render`

use access_lock::{AccessLock, Timeout};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

struct Document {
    lock: AccessLock,
    revision: AtomicU64,
}

fn render(doc: &Document) -> u64 {
    let Ok(weak) = doc.lock.try_weak() else {
        tracing::info!("document busy, skipping render");
        return 0;
    };

    let mut tiles = 0;
    while !weak.unlock_requested() && tiles < 100 {
        tiles += 1;
        thread::sleep(Duration::from_millis(10));
    }
    tracing::info!(tiles, revision = doc.revision.load(Ordering::Relaxed), "render stopped");
    tiles
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let doc = Document {
        lock: AccessLock::new(),
        revision: AtomicU64::new(0),
    };

    thread::scope(|s| {
        let renderer = s.spawn(|| render(&doc));

        thread::sleep(Duration::from_millis(50));
        match doc.lock.write(Timeout::Millis(1_000)) {
            Ok(_writer) => {
                doc.revision.fetch_add(1, Ordering::Relaxed);
                tracing::info!("edit applied");
            }
            Err(err) => tracing::warn!(%err, "edit dropped"),
        }

        let tiles = renderer.join().unwrap();
        println!("rendered {tiles} tiles before yielding");
    });
}
