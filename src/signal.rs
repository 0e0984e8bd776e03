//! One-shot broadcast stop signal.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

struct Inner {
    closed: Mutex<bool>,
    cond: Condvar,
}

/// One-shot broadcast cancellation primitive.
///
/// Created when a unit starts and closed exactly once when it stops. Any
/// number of concurrent listeners may [`wait`](StopSignal::wait) on the same
/// signal; all of them observe the close. Closing an already-closed signal
/// is a no-op.
#[derive(Clone)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

impl StopSignal {
    /// Create a new, open signal.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                closed: Mutex::new(false),
                cond: Condvar::new(),
            }),
        }
    }

    /// Close the signal, waking all current and future waiters.
    ///
    /// Returns true if this call performed the close, false if the signal
    /// was already closed.
    pub fn close(&self) -> bool {
        let mut closed = self.inner.closed.lock();
        if *closed {
            return false;
        }
        *closed = true;
        self.inner.cond.notify_all();
        true
    }

    /// Check whether the signal has been closed.
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.lock()
    }

    /// Block until the signal is closed.
    ///
    /// Returns immediately if it already is. Timeout policy belongs to the
    /// listener; see [`wait_timeout`](StopSignal::wait_timeout).
    pub fn wait(&self) {
        let mut closed = self.inner.closed.lock();
        while !*closed {
            self.inner.cond.wait(&mut closed);
        }
    }

    /// Block until the signal is closed or the timeout elapses.
    ///
    /// Returns true if the signal was closed, false on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut closed = self.inner.closed.lock();
        if *closed {
            return true;
        }
        self.inner.cond.wait_for(&mut closed, timeout);
        *closed
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopSignal")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_close_is_idempotent() {
        let signal = StopSignal::new();
        assert!(!signal.is_closed());

        assert!(signal.close());
        assert!(signal.is_closed());

        // Second close must not panic or re-fire.
        assert!(!signal.close());
        assert!(signal.is_closed());
    }

    #[test]
    fn test_wait_after_close_returns_immediately() {
        let signal = StopSignal::new();
        signal.close();
        signal.wait();
    }

    #[test]
    fn test_broadcast_to_many_waiters() {
        let signal = StopSignal::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = signal.clone();
                thread::spawn(move || {
                    s.wait();
                    assert!(s.is_closed());
                })
            })
            .collect();

        signal.close();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_wait_timeout() {
        let signal = StopSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(10)));

        signal.close();
        assert!(signal.wait_timeout(Duration::from_millis(10)));
    }
}
