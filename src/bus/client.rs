//! Broker client: connection lifecycle, publish retry and consumer threads.

use std::sync::mpsc::{channel, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;

use super::{
    Broker, ConnectionError, ConsumerStats, Envelope, PublishError, Record, RecordMetadata,
    Subscription,
};
use crate::config::ClientConfig;

/// Lifecycle event fired after the first successful connect.
pub const CONNECTION_ESTABLISHED: &str = "connection.established";
/// Lifecycle event fired when the reconnect policy gives up.
pub const CONNECTION_LOST: &str = "connection.lost";
/// Lifecycle event fired when a reconnect succeeds.
pub const CONNECTION_RESTORED: &str = "connection.restored";

/// Connection state of a `BrokerClient`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Reconnecting,
    /// The reconnect policy gave up. Only an explicit `connect` leaves this
    /// state; consumer threads stay parked until then.
    Lost,
}

struct ClientInner<B> {
    broker: B,
    config: ClientConfig,
    state: Mutex<ConnectionState>,
    /// Serializes reconnect attempts
    reconnecting: Mutex<()>,
    #[cfg(feature = "emitter")]
    emitter: Mutex<EventEmitter>,
}

/// Owns the connection to a broker.
///
/// Cheap to clone; clones share the connection, its state and its lifecycle
/// listeners. Publishing is rejected until `connect` succeeds.
///
/// ## Example
///
/// ```
/// use std::time::Duration;
/// use brokered_rust::bus::{BrokerClient, Envelope, InMemoryBroker};
/// use brokered_rust::ClientConfig;
///
/// let client = BrokerClient::new(InMemoryBroker::new(), ClientConfig::default());
/// assert!(client.publish(Envelope::event("notify", b"{}".to_vec())).is_err());
///
/// client.connect().unwrap();
/// let meta = client.publish(Envelope::event("notify", b"{}".to_vec())).unwrap();
/// assert_eq!(meta.offset, 0);
/// ```
pub struct BrokerClient<B> {
    inner: Arc<ClientInner<B>>,
}

impl<B> Clone for BrokerClient<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Broker + 'static> BrokerClient<B> {
    /// Create a disconnected client.
    pub fn new(broker: B, config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                broker,
                config,
                state: Mutex::new(ConnectionState::Disconnected),
                reconnecting: Mutex::new(()),
                #[cfg(feature = "emitter")]
                emitter: Mutex::new(EventEmitter::new()),
            }),
        }
    }

    /// Create a client and connect it.
    pub fn connected(broker: B, config: ClientConfig) -> Result<Self, ConnectionError> {
        let client = Self::new(broker, config);
        client.connect()?;
        Ok(client)
    }

    /// Connect, retrying with the configured backoff.
    ///
    /// Connecting a `Lost` client resumes its parked consumers and fires
    /// `connection.restored`.
    pub fn connect(&self) -> Result<(), ConnectionError> {
        let client_id = &self.inner.config.client_id;
        let was_lost = self.state() == ConnectionState::Lost;
        let result = self.inner.config.retry.run(|attempt| {
            debug!(client_id = %client_id, attempt, "connecting to broker");
            self.inner.broker.connect(client_id)
        });

        match result {
            Ok(()) => {
                *self.inner.state.lock() = ConnectionState::Connected;
                info!(client_id = %client_id, brokers = ?self.inner.broker.brokers(), "connected to broker");
                if was_lost {
                    self.emit_lifecycle(CONNECTION_RESTORED, client_id);
                } else {
                    self.emit_lifecycle(CONNECTION_ESTABLISHED, client_id);
                }
                Ok(())
            }
            Err((err, attempts)) => {
                *self.inner.state.lock() = ConnectionState::Disconnected;
                error!(client_id = %client_id, attempts, error = %err, "could not connect to broker");
                Err(ConnectionError::Unreachable {
                    brokers: self.inner.broker.brokers().join(","),
                    attempts,
                })
            }
        }
    }

    /// Drop the connection. Consumer threads exit on their next poll.
    pub fn disconnect(&self) {
        *self.inner.state.lock() = ConnectionState::Disconnected;
        debug!(client_id = %self.inner.config.client_id, "disconnected from broker");
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Get a reference to the underlying broker.
    pub fn broker(&self) -> &B {
        &self.inner.broker
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Publish an envelope.
    ///
    /// Transient failures are retried once, then surfaced. An unavailable
    /// broker triggers the reconnect policy; if that gives up the client is
    /// `Lost` and the original error is returned.
    pub fn publish(&self, envelope: Envelope) -> Result<RecordMetadata, PublishError> {
        envelope.validate().map_err(PublishError::Rejected)?;
        if matches!(
            self.state(),
            ConnectionState::Disconnected | ConnectionState::Lost
        ) {
            return Err(PublishError::NotConnected);
        }

        let err = match self.inner.broker.publish(envelope.clone()) {
            Ok(meta) => return Ok(meta),
            Err(err) => err,
        };

        if err.is_transient() {
            warn!(topic = %envelope.topic, error = %err, "transient publish failure, retrying once");
            return self.inner.broker.publish(envelope);
        }
        if err.is_connection_failure() {
            self.reconnect().map_err(|_| err)?;
            return self.inner.broker.publish(envelope);
        }
        Err(err)
    }

    /// Consume `topics` as a member of `group` on a background thread.
    ///
    /// `on_record` runs on the consumer thread for every record, in the order
    /// the broker delivers them per partition. The thread exits when the
    /// subscription is stopped or dropped, or when the client disconnects.
    /// While the connection is `Lost` it stays parked and resumes after a
    /// successful `connect`.
    pub fn subscribe<F>(
        &self,
        topics: Vec<String>,
        group: &str,
        poll_interval: Duration,
        mut on_record: F,
    ) -> Result<Subscription, PublishError>
    where
        F: FnMut(&Record) + Send + 'static,
    {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }

        let client = self.clone();
        let thread_topics = topics.clone();
        let thread_group = group.to_string();
        let poll_ms = u64::try_from(poll_interval.as_millis()).unwrap_or(u64::MAX);
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            let mut stats = ConsumerStats::default();
            let broker = &client.inner.broker;

            loop {
                match stop_rx.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => break,
                    Err(TryRecvError::Empty) => {}
                }
                match client.state() {
                    ConnectionState::Disconnected => break,
                    ConnectionState::Lost => {
                        match stop_rx.recv_timeout(poll_interval) {
                            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                            Err(RecvTimeoutError::Timeout) => continue,
                        }
                    }
                    ConnectionState::Connected | ConnectionState::Reconnecting => {}
                }

                stats.polls += 1;

                match broker.poll(&thread_topics, &thread_group, poll_ms) {
                    Ok(Some(record)) => {
                        stats.delivered += 1;
                        on_record(&record);
                        if let Err(err) = broker.ack(&thread_group, &record) {
                            warn!(topic = %record.topic, offset = record.offset, error = %err, "ack failed");
                        }
                    }
                    Ok(None) => {}
                    Err(err) if err.is_connection_failure() => {
                        stats.errors += 1;
                        if client.reconnect().is_err() {
                            warn!(group = %thread_group, "consumer parked until the client reconnects");
                        }
                    }
                    Err(err) => {
                        stats.errors += 1;
                        warn!(group = %thread_group, error = %err, "poll failed");
                        thread::sleep(poll_interval);
                    }
                }
            }

            debug!(group = %thread_group, topics = ?thread_topics, ?stats, "consumer stopped");
            stats
        });

        debug!(group = %group, topics = ?topics, "consumer started");
        Ok(Subscription::new(topics, group.to_string(), stop_tx, handle))
    }

    /// Register a listener for a lifecycle event (`connection.lost`, ...).
    ///
    /// Listeners run asynchronously and receive a short description.
    #[cfg(feature = "emitter")]
    pub fn on_connection_event<F>(&self, event: &str, listener: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.inner.emitter.lock().on(event, listener);
    }

    fn reconnect(&self) -> Result<(), ConnectionError> {
        let _guard = self.inner.reconnecting.lock();
        {
            let mut state = self.inner.state.lock();
            match *state {
                ConnectionState::Lost | ConnectionState::Disconnected => {
                    return Err(ConnectionError::Lost)
                }
                _ => *state = ConnectionState::Reconnecting,
            }
        }

        let client_id = &self.inner.config.client_id;
        warn!(client_id = %client_id, "broker connection interrupted, reconnecting");

        match self.inner.config.retry.run(|attempt| {
            debug!(client_id = %client_id, attempt, "reconnecting to broker");
            self.inner.broker.connect(client_id)
        }) {
            Ok(()) => {
                *self.inner.state.lock() = ConnectionState::Connected;
                info!(client_id = %client_id, "broker connection restored");
                self.emit_lifecycle(CONNECTION_RESTORED, client_id);
                Ok(())
            }
            Err((err, attempts)) => {
                *self.inner.state.lock() = ConnectionState::Lost;
                error!(client_id = %client_id, attempts, error = %err, "broker connection lost");
                self.emit_lifecycle(CONNECTION_LOST, &err.to_string());
                Err(ConnectionError::Lost)
            }
        }
    }

    #[cfg(feature = "emitter")]
    fn emit_lifecycle(&self, event: &str, detail: &str) {
        self.inner.emitter.lock().emit(event, detail.to_string());
    }

    #[cfg(not(feature = "emitter"))]
    fn emit_lifecycle(&self, _event: &str, _detail: &str) {}
}
