use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::pending::{PendingHandle, PendingRequest, SlotState};
use crate::error::ErrorEnvelope;

/// What a pending request ends with.
pub type ReplyResult = Result<Value, ErrorEnvelope>;

/// Error registering a pending request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    #[error("correlation id already pending: {0}")]
    Duplicate(String),
}

struct Slot {
    pattern: String,
    created_at: Instant,
    deadline: Instant,
    timeout: Duration,
    tx: SyncSender<ReplyResult>,
}

/// In-flight requests keyed by correlation id.
///
/// Cheap to clone; clones share the same map. Every mutation happens under
/// one lock and removes the slot before its result is delivered, so a
/// correlation id settles at most once: a second reply, or a reply after the
/// deadline, finds nothing and is dropped.
#[derive(Clone, Default)]
pub struct CorrelationRegistry {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending request that times out after `timeout`.
    pub fn register(
        &self,
        correlation_id: impl Into<String>,
        pattern: impl Into<String>,
        timeout: Duration,
    ) -> Result<PendingHandle, CorrelationError> {
        let correlation_id = correlation_id.into();
        let pattern = pattern.into();
        let now = Instant::now();
        let deadline = now + timeout;
        let (tx, rx) = sync_channel(1);

        {
            let mut slots = self.slots.lock();
            if slots.contains_key(&correlation_id) {
                return Err(CorrelationError::Duplicate(correlation_id));
            }
            slots.insert(
                correlation_id.clone(),
                Slot {
                    pattern: pattern.clone(),
                    created_at: now,
                    deadline,
                    timeout,
                    tx,
                },
            );
        }

        debug!(correlation_id = %correlation_id, pattern = %pattern, ?timeout, "request pending");
        Ok(PendingHandle::new(
            self.clone(),
            correlation_id,
            pattern,
            deadline,
            timeout,
            rx,
        ))
    }

    /// Fulfil a pending request. Returns `false` for unknown ids.
    pub fn resolve(&self, correlation_id: &str, value: Value) -> bool {
        self.settle(correlation_id, Ok(value))
    }

    /// Fail a pending request. Returns `false` for unknown ids.
    pub fn fail(&self, correlation_id: &str, error: ErrorEnvelope) -> bool {
        self.settle(correlation_id, Err(error))
    }

    /// Abandon a pending request. Its waiter wakes up with a timeout.
    pub fn cancel(&self, correlation_id: &str) -> bool {
        match self.take(correlation_id) {
            Some(slot) => {
                debug!(correlation_id, pattern = %slot.pattern, "request cancelled");
                true
            }
            None => {
                warn!(correlation_id, "cancel for unknown correlation id");
                false
            }
        }
    }

    /// Fail every request past its deadline. Returns how many were expired.
    pub fn expire(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<(String, Slot)> = {
            let mut slots = self.slots.lock();
            let ids: Vec<String> = slots
                .iter()
                .filter(|(_, slot)| slot.deadline <= now)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| slots.remove(&id).map(|slot| (id, slot)))
                .collect()
        };

        let count = expired.len();
        for (id, slot) in expired {
            warn!(correlation_id = %id, pattern = %slot.pattern, "request timed out");
            let envelope = ErrorEnvelope::timeout(&slot.pattern, slot.timeout);
            let _ = slot.tx.try_send(Err(envelope));
        }
        count
    }

    pub fn contains(&self, correlation_id: &str) -> bool {
        self.slots.lock().contains_key(correlation_id)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Snapshot of the pending requests, oldest first.
    pub fn pending(&self) -> Vec<PendingRequest> {
        let now = Instant::now();
        let mut pending: Vec<PendingRequest> = self
            .slots
            .lock()
            .iter()
            .map(|(id, slot)| PendingRequest {
                correlation_id: id.clone(),
                pattern: slot.pattern.clone(),
                created_at: slot.created_at,
                deadline: slot.deadline,
                state: if slot.deadline <= now {
                    SlotState::TimedOut
                } else {
                    SlotState::Empty
                },
            })
            .collect();
        pending.sort_by_key(|p| p.created_at);
        pending
    }

    fn settle(&self, correlation_id: &str, result: ReplyResult) -> bool {
        let Some(slot) = self.take(correlation_id) else {
            warn!(correlation_id, "reply for unknown correlation id, dropping");
            return false;
        };
        debug!(
            correlation_id,
            pattern = %slot.pattern,
            ok = result.is_ok(),
            elapsed = ?slot.created_at.elapsed(),
            "request settled"
        );
        // The waiter may already be gone; nothing else to do then.
        let _ = slot.tx.try_send(result);
        true
    }

    fn take(&self, correlation_id: &str) -> Option<Slot> {
        self.slots.lock().remove(correlation_id)
    }

    /// Remove without logging. Used by handles that give up.
    pub(super) fn discard(&self, correlation_id: &str) -> bool {
        self.take(correlation_id).is_some()
    }
}
