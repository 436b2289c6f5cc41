#![allow(dead_code)]

use std::thread;
use std::time::{Duration, Instant};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Polls until `cond` holds, failing the test after a generous timeout.
pub fn eventually(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(1));
    }
}
