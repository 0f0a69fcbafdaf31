//! One-shot flag for observing side effects of asynchronous handlers.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

struct Inner {
    state: Mutex<bool>,
    wake: Condvar,
}

/// A flag that can be waited on, backed by `Mutex<bool>` + `Condvar`.
///
/// Cheap to clone; clones share the flag. Event handlers `set` it, tests
/// `wait_timeout` for it instead of sleeping a fixed amount of time.
///
/// ```
/// use std::time::Duration;
/// use brokered_rust::Signal;
///
/// let signal = Signal::new();
/// let remote = signal.clone();
/// std::thread::spawn(move || remote.set());
/// assert!(signal.wait_timeout(Duration::from_secs(1)));
/// ```
#[derive(Clone)]
pub struct Signal {
    inner: Arc<Inner>,
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal {
    pub fn new() -> Self {
        Signal {
            inner: Arc::new(Inner {
                state: Mutex::new(false),
                wake: Condvar::new(),
            }),
        }
    }

    /// Raise the flag and wake every waiter.
    pub fn set(&self) {
        let mut set = self.inner.state.lock();
        *set = true;
        self.inner.wake.notify_all();
    }

    pub fn reset(&self) {
        *self.inner.state.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.inner.state.lock()
    }

    /// Wait until the flag is raised. Returns `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut set = self.inner.state.lock();
        while !*set {
            if self.inner.wake.wait_until(&mut set, deadline).timed_out() {
                return *set;
            }
        }
        true
    }
}

/// Poll `predicate` until it holds or `timeout` passes. Returns the last result.
pub fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if predicate() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
}
