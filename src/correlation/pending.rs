use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use tracing::debug;

use super::registry::{CorrelationRegistry, ReplyResult};
use crate::error::{ErrorEnvelope, ErrorKind};

/// Result slot of a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No reply yet.
    Empty,
    Fulfilled,
    Failed,
    /// Deadline passed or the request was cancelled.
    TimedOut,
}

/// Snapshot of one in-flight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub correlation_id: String,
    pub pattern: String,
    pub created_at: Instant,
    pub deadline: Instant,
    pub state: SlotState,
}

/// The caller's side of a pending request.
///
/// `wait` blocks the calling thread until the reply arrives or the deadline
/// passes. Dropping an unsettled handle removes its entry from the registry.
pub struct PendingHandle {
    registry: CorrelationRegistry,
    correlation_id: String,
    pattern: String,
    deadline: Instant,
    timeout: Duration,
    rx: Receiver<ReplyResult>,
    outcome: Option<ReplyResult>,
    settled: bool,
}

impl PendingHandle {
    pub(super) fn new(
        registry: CorrelationRegistry,
        correlation_id: String,
        pattern: String,
        deadline: Instant,
        timeout: Duration,
        rx: Receiver<ReplyResult>,
    ) -> Self {
        Self {
            registry,
            correlation_id,
            pattern,
            deadline,
            timeout,
            rx,
            outcome: None,
            settled: false,
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Current slot state, without blocking.
    pub fn state(&mut self) -> SlotState {
        if self.outcome.is_none() {
            match self.rx.try_recv() {
                Ok(result) => self.outcome = Some(result),
                Err(TryRecvError::Disconnected) => self.outcome = Some(Err(self.gone())),
                Err(TryRecvError::Empty) => {}
            }
        }
        match &self.outcome {
            None if Instant::now() >= self.deadline => SlotState::TimedOut,
            None => SlotState::Empty,
            Some(Ok(_)) => SlotState::Fulfilled,
            Some(Err(e)) if e.kind == ErrorKind::Timeout => SlotState::TimedOut,
            Some(Err(_)) => SlotState::Failed,
        }
    }

    /// Block until the request settles or its deadline passes.
    ///
    /// On deadline the handle evicts its own entry, so a reply arriving later
    /// finds nothing to resolve.
    pub fn wait(mut self) -> ReplyResult {
        self.settled = true;
        if let Some(result) = self.outcome.take() {
            return result;
        }

        let remaining = self.deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(remaining) {
            Ok(result) => result,
            Err(RecvTimeoutError::Disconnected) => Err(self.gone()),
            Err(RecvTimeoutError::Timeout) => {
                if self.registry.discard(&self.correlation_id) {
                    debug!(correlation_id = %self.correlation_id, pattern = %self.pattern, "request timed out while waiting");
                    Err(ErrorEnvelope::timeout(&self.pattern, self.timeout))
                } else {
                    // Settled between the timeout and the eviction; the result
                    // is already in flight.
                    self.rx.recv().unwrap_or_else(|_| Err(self.gone()))
                }
            }
        }
    }

    /// Outcome when the sender went away without a result: cancelled, or
    /// swept after its deadline by someone else.
    fn gone(&self) -> ErrorEnvelope {
        ErrorEnvelope::timeout(&self.pattern, self.timeout)
    }
}

impl Drop for PendingHandle {
    fn drop(&mut self) {
        if !self.settled && self.outcome.is_none() && self.registry.discard(&self.correlation_id) {
            debug!(correlation_id = %self.correlation_id, "pending request dropped");
        }
    }
}
