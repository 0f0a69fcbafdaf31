//! In-memory broker for testing and single-process scenarios.
//!
//! This module provides a thread-safe in-memory broker that implements
//! `Publisher`, `Subscriber` and `Broker`, useful for:
//! - Unit and integration testing without an external cluster
//! - Single-process applications
//! - Development and prototyping
//!
//! It models the parts of a Kafka-style broker the dispatcher relies on:
//! partitioned topics, per-partition ordering, consumer-group offsets and
//! outages.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use super::{
    Broker, ConnectionError, Envelope, PublishError, Publisher, Record, RecordMetadata, Subscriber,
};

#[derive(Default)]
struct TopicLog {
    partitions: Vec<Vec<Envelope>>,
    round_robin: usize,
}

impl TopicLog {
    fn with_partitions(count: u32) -> Self {
        Self {
            partitions: (0..count.max(1)).map(|_| Vec::new()).collect(),
            round_robin: 0,
        }
    }
}

type OffsetKey = (String, String, u32);

#[derive(Default)]
struct State {
    topics: HashMap<String, TopicLog>,
    /// Next offset to deliver per (group, topic, partition)
    offsets: HashMap<OffsetKey, u64>,
    /// Partitions whose last delivered record is not acked yet
    in_flight: HashSet<OffsetKey>,
    /// Per-group rotation so one busy partition cannot starve the others
    cursors: HashMap<String, usize>,
    /// Last acked offset per (group, topic, partition)
    committed: HashMap<OffsetKey, u64>,
}

impl State {
    fn topic_mut(&mut self, topic: &str, partitions: u32) -> &mut TopicLog {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| TopicLog::with_partitions(partitions))
    }

    fn take_next(&mut self, topics: &[String], group: &str, partitions: u32) -> Option<Record> {
        let mut candidates = Vec::new();
        for topic in topics {
            let count = self.topic_mut(topic, partitions).partitions.len() as u32;
            candidates.extend((0..count).map(|p| (topic.clone(), p)));
        }
        if candidates.is_empty() {
            return None;
        }

        let start = *self.cursors.get(group).unwrap_or(&0) % candidates.len();
        for i in 0..candidates.len() {
            let (topic, partition) = &candidates[(start + i) % candidates.len()];
            let key = (group.to_string(), topic.clone(), *partition);
            if self.in_flight.contains(&key) {
                continue;
            }
            let offset = *self.offsets.get(&key).unwrap_or(&0);

            let envelope = self
                .topics
                .get(topic)
                .and_then(|log| log.partitions.get(*partition as usize))
                .and_then(|log| log.get(offset as usize))
                .cloned();

            if let Some(envelope) = envelope {
                self.offsets.insert(key.clone(), offset + 1);
                self.in_flight.insert(key);
                self.cursors.insert(group.to_string(), start + i + 1);
                return Some(Record {
                    topic: topic.clone(),
                    partition: *partition,
                    offset,
                    envelope,
                });
            }
        }
        None
    }
}

/// In-memory broker for testing and single-process scenarios.
///
/// Features:
/// - Thread-safe (can be shared across threads via `Clone`)
/// - Topics are auto-created on first use with a fixed partition count
/// - Partition chosen by explicit partition, then key hash, then round-robin
/// - Consumer groups track their own offsets: competing consumers inside a
///   group, fan-out across groups
/// - A partition is held by one group member at a time: its next record is
///   handed out only after the previous one is acked, so per-partition order
///   holds with competing consumers
/// - Outages and transient publish failures can be injected
///
/// ## Example
///
/// ```
/// use brokered_rust::bus::{Envelope, InMemoryBroker, Publisher, Subscriber};
///
/// let broker = InMemoryBroker::new();
/// broker.publish(Envelope::event("notify", br#"{"notify":true}"#.to_vec())).unwrap();
///
/// let topics = vec!["notify".to_string()];
/// let record = broker.poll(&topics, "group-a", 100).unwrap().unwrap();
/// assert_eq!(record.envelope.payload_str(), Some(r#"{"notify":true}"#));
///
/// // Another group sees the same record; the first group is drained.
/// assert!(broker.poll(&topics, "group-b", 10).unwrap().is_some());
/// assert!(broker.poll(&topics, "group-a", 10).unwrap().is_none());
/// ```
#[derive(Clone)]
pub struct InMemoryBroker {
    state: Arc<Mutex<State>>,
    arrived: Arc<Condvar>,
    reachable: Arc<AtomicBool>,
    failing_publishes: Arc<AtomicU32>,
    partitions: u32,
    brokers: Vec<String>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    /// Create a broker whose topics have a single partition.
    pub fn new() -> Self {
        Self::with_partitions(1)
    }

    /// Create a broker whose auto-created topics have `partitions` partitions.
    pub fn with_partitions(partitions: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            arrived: Arc::new(Condvar::new()),
            reachable: Arc::new(AtomicBool::new(true)),
            failing_publishes: Arc::new(AtomicU32::new(0)),
            partitions: partitions.max(1),
            brokers: vec!["in-memory:9092".to_string()],
        }
    }

    /// Simulate the broker going down (`false`) or coming back (`true`).
    ///
    /// Blocked pollers are woken so they observe the outage.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
        self.arrived.notify_all();
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    /// Make the next `count` publishes fail with a transient error.
    pub fn fail_next_publishes(&self, count: u32) {
        self.failing_publishes.store(count, Ordering::SeqCst);
    }

    /// Number of partitions of auto-created topics.
    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    /// All records of a topic, partition by partition.
    pub fn records(&self, topic: &str) -> Vec<Record> {
        let state = self.state.lock();
        let Some(log) = state.topics.get(topic) else {
            return Vec::new();
        };
        log.partitions
            .iter()
            .enumerate()
            .flat_map(|(partition, entries)| {
                entries.iter().enumerate().map(move |(offset, envelope)| Record {
                    topic: topic.to_string(),
                    partition: partition as u32,
                    offset: offset as u64,
                    envelope: envelope.clone(),
                })
            })
            .collect()
    }

    /// Names of all known topics, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.state.lock().topics.keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Total number of records across all topics.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .topics
            .values()
            .flat_map(|log| log.partitions.iter())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last acked offset of a group on one partition.
    pub fn committed(&self, group: &str, topic: &str, partition: u32) -> Option<u64> {
        let key = (group.to_string(), topic.to_string(), partition);
        self.state.lock().committed.get(&key).copied()
    }

    /// Committed offsets as (group, topic, partition, offset), sorted.
    pub fn acknowledged(&self) -> Vec<(String, String, u32, u64)> {
        let mut acked: Vec<(String, String, u32, u64)> = self
            .state
            .lock()
            .committed
            .iter()
            .map(|((group, topic, partition), offset)| {
                (group.clone(), topic.clone(), *partition, *offset)
            })
            .collect();
        acked.sort();
        acked
    }

    fn choose_partition(log: &mut TopicLog, envelope: &Envelope) -> Result<u32, PublishError> {
        let count = log.partitions.len() as u32;
        if let Some(partition) = envelope.partition {
            if partition >= count {
                return Err(PublishError::Rejected(format!(
                    "partition {} out of range for {} ({} partitions)",
                    partition, envelope.topic, count
                )));
            }
            return Ok(partition);
        }
        if let Some(key) = &envelope.key {
            let mut hasher = DefaultHasher::new();
            key.hash(&mut hasher);
            return Ok((hasher.finish() % u64::from(count)) as u32);
        }
        let partition = (log.round_robin % count as usize) as u32;
        log.round_robin += 1;
        Ok(partition)
    }
}

impl Publisher for InMemoryBroker {
    fn publish(&self, envelope: Envelope) -> Result<RecordMetadata, PublishError> {
        if !self.is_reachable() {
            return Err(PublishError::Unavailable(self.brokers.join(",")));
        }
        let injected = self
            .failing_publishes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(PublishError::Transient("injected failure".into()));
        }

        let mut state = self.state.lock();
        let log = state.topic_mut(&envelope.topic, self.partitions);
        let partition = Self::choose_partition(log, &envelope)?;
        let entries = &mut log.partitions[partition as usize];
        let metadata = RecordMetadata {
            topic: envelope.topic.clone(),
            partition,
            offset: entries.len() as u64,
        };
        entries.push(envelope);
        drop(state);

        trace!(topic = %metadata.topic, partition, offset = metadata.offset, "record appended");
        self.arrived.notify_all();
        Ok(metadata)
    }
}

impl Subscriber for InMemoryBroker {
    fn poll(
        &self,
        topics: &[String],
        group: &str,
        timeout_ms: u64,
    ) -> Result<Option<Record>, PublishError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let mut state = self.state.lock();

        loop {
            if !self.is_reachable() {
                return Err(PublishError::Unavailable(self.brokers.join(",")));
            }
            if let Some(record) = state.take_next(topics, group, self.partitions) {
                return Ok(Some(record));
            }
            if self.arrived.wait_until(&mut state, deadline).timed_out() {
                return Ok(state.take_next(topics, group, self.partitions));
            }
        }
    }

    fn ack(&self, group: &str, record: &Record) -> Result<(), PublishError> {
        let key = (group.to_string(), record.topic.clone(), record.partition);
        {
            let mut state = self.state.lock();
            state.in_flight.remove(&key);
            let committed = state.committed.entry(key).or_insert(record.offset);
            *committed = (*committed).max(record.offset);
        }
        // The partition is free again for the other members of the group.
        self.arrived.notify_all();
        Ok(())
    }
}

impl Broker for InMemoryBroker {
    fn connect(&self, _client_id: &str) -> Result<(), ConnectionError> {
        if self.is_reachable() {
            Ok(())
        } else {
            Err(ConnectionError::Unreachable {
                brokers: self.brokers.join(","),
                attempts: 1,
            })
        }
    }

    fn brokers(&self) -> Vec<String> {
        self.brokers.clone()
    }
}
