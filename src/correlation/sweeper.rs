use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use super::registry::CorrelationRegistry;

/// Background thread that expires overdue requests.
///
/// Waiters evict their own entry on deadline; the sweeper catches requests
/// nobody waits on any more. Drop or call `stop()` to shut down.
pub struct Sweeper {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<usize>>,
}

impl Sweeper {
    /// Run `registry.expire()` every `interval`.
    pub fn spawn(registry: CorrelationRegistry, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            let mut expired = 0;
            loop {
                match stop_rx.recv_timeout(interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => expired += registry.expire(),
                }
            }
            debug!(expired, "sweeper stopped");
            expired
        });

        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Stop the sweeper and wait for it. Returns how many requests it expired.
    pub fn stop(mut self) -> usize {
        let _ = self.stop_tx.send(());
        self.handle
            .take()
            .map(|h| h.join().unwrap_or_default())
            .unwrap_or_default()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
