#![allow(dead_code)]

use std::time::Duration;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Slack added to timing assertions: one poll interval plus scheduler noise.
pub const SLACK: Duration = Duration::from_millis(150);
