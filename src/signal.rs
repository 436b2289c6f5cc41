use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A wakeup channel without lost notifications.
///
/// Every notification bumps an epoch. A waiter reads the epoch *before*
/// checking its condition and then sleeps only while the epoch is unchanged,
/// so a notification that lands between the check and the sleep is seen.
pub(crate) struct Signal {
    epoch: Mutex<u64>,
    cond: Condvar,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Self {
            epoch: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn epoch(&self) -> u64 {
        *self.lock()
    }

    pub(crate) fn notify_one(&self) {
        *self.lock() += 1;
        self.cond.notify_one();
    }

    pub(crate) fn notify_all(&self) {
        *self.lock() += 1;
        self.cond.notify_all();
    }

    /// Blocks until the epoch moves past `seen`.
    pub(crate) fn wait(&self, seen: u64) {
        let mut epoch = self.lock();
        while *epoch == seen {
            epoch = self
                .cond
                .wait(epoch)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until the epoch moves past `seen` or `timeout` elapses.
    ///
    /// Returns `true` if the epoch moved.
    pub(crate) fn wait_timeout(&self, seen: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut epoch = self.lock();
        while *epoch == seen {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            epoch = self
                .cond
                .wait_timeout(epoch, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn moved_epoch_does_not_block() {
        let signal = Signal::new();
        let seen = signal.epoch();
        signal.notify_one();
        // Would hang if the earlier notification were lost.
        signal.wait(seen);
        assert_eq!(signal.epoch(), seen + 1);
    }

    #[test]
    fn wait_timeout_expires_without_notification() {
        let signal = Signal::new();
        let seen = signal.epoch();
        assert!(!signal.wait_timeout(seen, Duration::from_millis(20)));
    }

    #[test]
    fn notify_wakes_other_thread() {
        let signal = Arc::new(Signal::new());
        let seen = signal.epoch();

        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait_timeout(seen, Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        signal.notify_all();

        assert!(waiter.join().unwrap());
    }
}
