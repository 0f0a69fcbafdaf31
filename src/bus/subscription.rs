//! Handle to a background consumer thread.

use std::sync::mpsc::Sender;
use std::thread::JoinHandle;

/// Statistics from a consumer thread.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Number of records handed to the callback.
    pub delivered: usize,
    /// Number of failed polls.
    pub errors: usize,
    /// Number of poll cycles completed.
    pub polls: usize,
}

/// Handle to a background consumer thread. Drop or call `stop()` to shut down.
pub struct Subscription {
    topics: Vec<String>,
    group: String,
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<ConsumerStats>>,
}

impl Subscription {
    pub(crate) fn new(
        topics: Vec<String>,
        group: String,
        stop_tx: Sender<()>,
        handle: JoinHandle<ConsumerStats>,
    ) -> Self {
        Self {
            topics,
            group,
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Stop the consumer and wait for it to finish. Returns stats.
    pub fn stop(mut self) -> ConsumerStats {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap_or_default()
        } else {
            ConsumerStats::default()
        }
    }

    /// Signal stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }

    /// Whether the consumer thread has exited (stopped or gave up).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
