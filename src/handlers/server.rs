//! Server side of the transport: consume pattern topics, run handlers, reply.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::registry::{Dispatched, HandlerRegistry};
use crate::bus::{Broker, BrokerClient, Envelope, PublishError, Record, Subscription};
use crate::codec::Codec;
use crate::config::ConsumerConfig;
use crate::error::{ErrorEnvelope, ErrorKind, INTERNAL_MESSAGE};

/// Counters kept by a running server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Messages whose handler completed.
    pub handled: u64,
    /// Messages that ended in an error (replied or suppressed).
    pub failed: u64,
    /// Replies published.
    pub replies: u64,
}

#[derive(Default)]
struct Counters {
    handled: AtomicU64,
    failed: AtomicU64,
    replies: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ServerStats {
        ServerStats {
            handled: self.handled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            replies: self.replies.load(Ordering::Relaxed),
        }
    }
}

/// Consumes every registered pattern and dispatches to the registry.
///
/// Runs `consumers` competing threads in the server group, so each message is
/// handled once no matter how many threads (or processes) share the group.
/// Drop or call `stop()` to shut down.
pub struct Server {
    patterns: Vec<String>,
    subscriptions: Vec<Subscription>,
    counters: Arc<Counters>,
}

impl Server {
    /// Subscribe to all patterns of `registry` and start dispatching.
    pub fn start<S, B>(
        registry: Arc<HandlerRegistry<S>>,
        client: BrokerClient<B>,
        consumer: &ConsumerConfig,
        codec: Arc<dyn Codec>,
    ) -> Result<Self, PublishError>
    where
        S: Send + Sync + 'static,
        B: Broker + 'static,
    {
        let patterns: Vec<String> = registry.patterns().into_iter().map(String::from).collect();
        let counters = Arc::new(Counters::default());
        let mut subscriptions = Vec::new();

        if patterns.is_empty() {
            warn!("server started without handlers");
        } else {
            let group = consumer.server_group();
            for _ in 0..consumer.consumers.max(1) {
                let registry = Arc::clone(&registry);
                let reply_client = client.clone();
                let codec = Arc::clone(&codec);
                let counters = Arc::clone(&counters);

                let subscription = client.subscribe(
                    patterns.clone(),
                    &group,
                    consumer.poll_interval(),
                    move |record: &Record| {
                        let outcome = registry.dispatch_envelope(&record.envelope, codec.as_ref());
                        answer(&reply_client, codec.as_ref(), &record.envelope, outcome, &counters);
                    },
                )?;
                subscriptions.push(subscription);
            }
            info!(group = %group, patterns = ?patterns, consumers = subscriptions.len(), "server listening");
        }

        Ok(Self {
            patterns,
            subscriptions,
            counters,
        })
    }

    /// Patterns this server consumes.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn stats(&self) -> ServerStats {
        self.counters.snapshot()
    }

    /// Stop all consumer threads and wait for them.
    pub fn stop(self) -> ServerStats {
        for subscription in self.subscriptions {
            let consumer = subscription.stop();
            debug!(?consumer, "server consumer stopped");
        }
        self.counters.snapshot()
    }
}

/// Publish the outcome of one dispatch to the caller's reply topic.
fn answer<B: Broker + 'static>(
    client: &BrokerClient<B>,
    codec: &dyn Codec,
    request: &Envelope,
    outcome: Dispatched,
    counters: &Counters,
) {
    let pattern = request.topic.as_str();
    let (payload, is_error) = match outcome {
        Dispatched::Done => {
            counters.handled.fetch_add(1, Ordering::Relaxed);
            return;
        }
        Dispatched::Suppressed => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
        Dispatched::Reply(value) => {
            counters.handled.fetch_add(1, Ordering::Relaxed);
            match codec.encode(&value) {
                Ok(bytes) => (bytes, false),
                Err(err) => {
                    warn!(pattern, error = %err, "could not encode reply");
                    let envelope = ErrorEnvelope::new(ErrorKind::Internal, INTERNAL_MESSAGE, pattern);
                    (error_payload(&envelope), true)
                }
            }
        }
        Dispatched::Failed(envelope) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            (error_payload(&envelope), true)
        }
    };

    let Some(reply) = Envelope::reply(request, payload) else {
        debug!(pattern, "no reply expected, dropping result");
        return;
    };
    let reply = if is_error { reply.as_error() } else { reply };

    match client.publish(reply) {
        Ok(_) => {
            counters.replies.fetch_add(1, Ordering::Relaxed);
        }
        Err(err) => {
            warn!(pattern, correlation_id = ?request.correlation_id(), error = %err, "reply not published");
        }
    }
}

fn error_payload(envelope: &ErrorEnvelope) -> Vec<u8> {
    serde_json::to_vec(envelope).unwrap_or_default()
}
