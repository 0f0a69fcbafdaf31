use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::DispatchError;
use super::reply::settle_reply;
use crate::bus::{
    Broker, BrokerClient, Envelope, Record, Subscription, CORRELATION_ID, ERROR, IS_DISPOSED,
    REPLY_PARTITION, REPLY_TOPIC,
};
use crate::codec::{Codec, CodecError, JsonCodec, OutgoingMessage};
use crate::config::{ConsumerConfig, DispatcherConfig};
use crate::correlation::{CorrelationRegistry, Sweeper};
use crate::error::ErrorKind;

const TRANSPORT_HEADERS: [&str; 5] = [CORRELATION_ID, REPLY_TOPIC, REPLY_PARTITION, ERROR, IS_DISPOSED];

/// Configures and connects a `Dispatcher`.
///
/// Reply topics have to be known before connecting: the reply consumer
/// subscribes to all of them at once.
pub struct DispatcherBuilder<B> {
    client: BrokerClient<B>,
    codec: Arc<dyn Codec>,
    config: DispatcherConfig,
    consumer: ConsumerConfig,
    patterns: BTreeSet<String>,
}

impl<B: Broker + 'static> DispatcherBuilder<B> {
    fn new(client: BrokerClient<B>) -> Self {
        Self {
            client,
            codec: Arc::new(JsonCodec),
            config: DispatcherConfig::default(),
            consumer: ConsumerConfig::default(),
            patterns: BTreeSet::new(),
        }
    }

    /// Consume replies for `pattern`. Required before `send(pattern, ..)`.
    pub fn response_of(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.insert(pattern.into());
        self
    }

    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn consumer(mut self, consumer: ConsumerConfig) -> Self {
        self.consumer = consumer;
        self
    }

    /// Connect the client if needed, start the reply consumer and the sweeper.
    pub fn connect(self) -> Result<Dispatcher<B>, DispatchError> {
        if !self.client.is_connected() {
            self.client.connect()?;
        }

        let registry = CorrelationRegistry::new();
        let reply_group = self.consumer.reply_group(&Uuid::new_v4().simple().to_string());
        let reply_topics: BTreeSet<String> = self
            .patterns
            .iter()
            .map(|p| self.config.reply_topic(p))
            .collect();

        let subscription = if reply_topics.is_empty() {
            None
        } else {
            let registry = registry.clone();
            let codec = Arc::clone(&self.codec);
            let suffix = self.config.reply_suffix.clone();
            let subscription = self.client.subscribe(
                reply_topics.iter().cloned().collect(),
                &reply_group,
                self.consumer.poll_interval(),
                move |record: &Record| {
                    settle_reply(&registry, codec.as_ref(), &suffix, record);
                },
            )?;
            Some(subscription)
        };

        let sweeper = Sweeper::spawn(registry.clone(), self.config.sweep_interval());
        info!(reply_topics = ?reply_topics, group = %reply_group, "dispatcher connected");

        Ok(Dispatcher {
            inner: Arc::new(DispatcherInner {
                client: self.client,
                codec: self.codec,
                config: self.config,
                registry,
                reply_topics,
                reply_group,
                running: Mutex::new(Some(Running {
                    subscription,
                    sweeper,
                })),
            }),
        })
    }
}

struct Running {
    subscription: Option<Subscription>,
    sweeper: Sweeper,
}

struct DispatcherInner<B> {
    client: BrokerClient<B>,
    codec: Arc<dyn Codec>,
    config: DispatcherConfig,
    registry: CorrelationRegistry,
    reply_topics: BTreeSet<String>,
    reply_group: String,
    running: Mutex<Option<Running>>,
}

/// Caller side of the transport: `send` (request/reply) and `emit`
/// (fire-and-forget).
///
/// Cheap to clone and safe to share between threads; every `send` blocks only
/// its own thread.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use brokered_rust::bus::{BrokerClient, InMemoryBroker};
/// use brokered_rust::codec::JsonCodec;
/// use brokered_rust::dispatcher::Dispatcher;
/// use brokered_rust::handlers::{HandlerRegistry, Server};
/// use brokered_rust::{ClientConfig, ConsumerConfig};
/// use serde_json::json;
///
/// let client = BrokerClient::connected(InMemoryBroker::new(), ClientConfig::default()).unwrap();
/// let registry = HandlerRegistry::new(())
///     .message("math.sum", |ctx| Ok(json!(ctx.input::<Vec<i64>>()?.iter().sum::<i64>())))
///     .unwrap();
/// let server = Server::start(Arc::new(registry), client.clone(), &ConsumerConfig::default(), Arc::new(JsonCodec)).unwrap();
///
/// let dispatcher = Dispatcher::builder(client).response_of("math.sum").connect().unwrap();
/// assert_eq!(dispatcher.send("math.sum", [1, 2, 3, 4, 5]).unwrap(), json!(15));
///
/// dispatcher.close();
/// server.stop();
/// ```
pub struct Dispatcher<B> {
    inner: Arc<DispatcherInner<B>>,
}

impl<B> Clone for Dispatcher<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Broker + 'static> Dispatcher<B> {
    pub fn builder(client: BrokerClient<B>) -> DispatcherBuilder<B> {
        DispatcherBuilder::new(client)
    }

    /// Send a request and wait for its reply with the default deadline.
    pub fn send<P: Serialize>(&self, pattern: &str, payload: P) -> Result<Value, DispatchError> {
        self.send_with_timeout(pattern, payload, self.inner.config.request_timeout())
    }

    /// Send a request and deserialize the reply.
    pub fn send_as<T, P>(&self, pattern: &str, payload: P) -> Result<T, DispatchError>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        let value = self.send(pattern, payload)?;
        serde_json::from_value(value).map_err(|e| CodecError::Decode(e.to_string()).into())
    }

    /// Send a request and wait at most `timeout` for its reply.
    pub fn send_with_timeout<P: Serialize>(
        &self,
        pattern: &str,
        payload: P,
        timeout: Duration,
    ) -> Result<Value, DispatchError> {
        self.ensure_open()?;
        let reply_topic = self.inner.config.reply_topic(pattern);
        if !self.inner.reply_topics.contains(&reply_topic) {
            return Err(DispatchError::NoReplySubscription(pattern.to_string()));
        }

        let message = self.outgoing(payload)?;
        let bytes = self.inner.codec.encode(&message.value)?;
        let correlation_id = Uuid::new_v4().to_string();
        let handle = self
            .inner
            .registry
            .register(correlation_id.as_str(), pattern, timeout)?;

        let envelope = with_message_parts(
            Envelope::request(pattern, bytes, correlation_id.as_str(), reply_topic),
            message,
        );
        debug!(pattern, correlation_id = %correlation_id, "sending request");
        // On failure the handle is dropped here, which removes the pending entry.
        self.inner.client.publish(envelope)?;

        handle.wait().map_err(|envelope| {
            if envelope.kind == ErrorKind::Timeout {
                DispatchError::Timeout {
                    pattern: pattern.to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }
            } else {
                DispatchError::Handler(envelope)
            }
        })
    }

    /// Publish an event. Returns once the broker accepted it.
    pub fn emit<P: Serialize>(&self, pattern: &str, payload: P) -> Result<(), DispatchError> {
        self.ensure_open()?;
        let message = self.outgoing(payload)?;
        let bytes = self.inner.codec.encode(&message.value)?;
        let envelope = with_message_parts(Envelope::event(pattern, bytes), message);

        let meta = self.inner.client.publish(envelope)?;
        debug!(pattern, partition = meta.partition, offset = meta.offset, "event emitted");
        Ok(())
    }

    /// Abandon a pending request. Its `send` returns a timeout.
    pub fn cancel(&self, correlation_id: &str) -> bool {
        self.inner.registry.cancel(correlation_id)
    }

    /// The pending requests of this dispatcher.
    pub fn registry(&self) -> &CorrelationRegistry {
        &self.inner.registry
    }

    pub fn client(&self) -> &BrokerClient<B> {
        &self.inner.client
    }

    /// Reply topics consumed by this dispatcher, sorted.
    pub fn reply_topics(&self) -> Vec<String> {
        self.inner.reply_topics.iter().cloned().collect()
    }

    /// Consumer group of this dispatcher's reply consumer. Unique per instance.
    pub fn reply_group(&self) -> &str {
        &self.inner.reply_group
    }

    /// Stop the reply consumer and the sweeper. Idempotent.
    ///
    /// Requests still pending fail with a timeout at their deadline.
    pub fn close(&self) {
        let Some(running) = self.inner.running.lock().take() else {
            return;
        };
        if let Some(subscription) = running.subscription {
            let stats = subscription.stop();
            debug!(?stats, "reply consumer stopped");
        }
        let expired = running.sweeper.stop();
        info!(expired, pending = self.inner.registry.len(), "dispatcher closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.running.lock().is_none()
    }

    fn ensure_open(&self) -> Result<(), DispatchError> {
        if self.is_closed() {
            Err(DispatchError::Closed)
        } else {
            Ok(())
        }
    }

    fn outgoing<P: Serialize>(&self, payload: P) -> Result<OutgoingMessage, DispatchError> {
        let value = serde_json::to_value(payload).map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(OutgoingMessage::from_value(value))
    }
}

/// Apply the key, headers and partition of a caller message to an envelope.
///
/// Caller headers cannot override transport headers.
fn with_message_parts(mut envelope: Envelope, message: OutgoingMessage) -> Envelope {
    if let Some(key) = message.key {
        envelope = envelope.with_key(key);
    }
    if let Some(partition) = message.partition {
        envelope = envelope.with_partition(partition);
    }
    for (name, value) in message.headers {
        if TRANSPORT_HEADERS.contains(&name.as_str()) {
            warn!(header = %name, "ignoring caller header that shadows a transport header");
            continue;
        }
        envelope = envelope.with_header(name, value);
    }
    envelope
}
