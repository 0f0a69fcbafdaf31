//! Composition root: wires broker client, handler server and dispatcher.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::bus::{Broker, BrokerClient, ConnectionError, PublishError};
use crate::codec::{Codec, JsonCodec};
use crate::config::{ConfigError, KafkaOptions};
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::handlers::{HandlerMode, HandlerRegistry, RegistryError, Server, ServerStats};

/// Error starting an `App`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("could not start server: {0}")]
    Server(#[from] PublishError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// A service about to start: broker, options, handlers.
///
/// ## Example
///
/// ```
/// use brokered_rust::bus::InMemoryBroker;
/// use brokered_rust::handlers::HandlerRegistry;
/// use brokered_rust::{App, KafkaOptions};
/// use serde_json::json;
///
/// let registry = HandlerRegistry::new(())
///     .message("user.create", |ctx| Ok(ctx.raw_input().clone()))
///     .unwrap();
///
/// let app = App::new(InMemoryBroker::new(), KafkaOptions::default(), registry)
///     .start()
///     .unwrap();
///
/// let user = app.dispatcher().send("user.create", json!({ "name": "Ada" })).unwrap();
/// assert_eq!(user, json!({ "name": "Ada" }));
/// app.close();
/// ```
pub struct App<S, B> {
    broker: B,
    options: KafkaOptions,
    registry: HandlerRegistry<S>,
    responses: Vec<String>,
    codec: Arc<dyn Codec>,
}

impl<S, B> App<S, B>
where
    S: Send + Sync + 'static,
    B: Broker + 'static,
{
    pub fn new(broker: B, options: KafkaOptions, registry: HandlerRegistry<S>) -> Self {
        Self {
            broker,
            options,
            registry,
            responses: Vec::new(),
            codec: Arc::new(JsonCodec),
        }
    }

    /// Also consume replies for a pattern served elsewhere.
    ///
    /// Request/reply patterns of the local registry are consumed anyway.
    pub fn response_of(mut self, pattern: impl Into<String>) -> Self {
        self.responses.push(pattern.into());
        self
    }

    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Connect, start the server and the dispatcher.
    pub fn start(self) -> Result<RunningApp<B>, AppError> {
        let client = BrokerClient::connected(self.broker, self.options.client.clone())?;

        let mut responses = self.responses;
        responses.extend(
            self.registry
                .patterns()
                .into_iter()
                .filter(|p| self.registry.mode(p) == Some(HandlerMode::RequestReply))
                .map(String::from),
        );

        let server = Server::start(
            Arc::new(self.registry),
            client.clone(),
            &self.options.consumer,
            Arc::clone(&self.codec),
        )?;

        let dispatcher = responses
            .into_iter()
            .fold(Dispatcher::builder(client.clone()), |builder, pattern| {
                builder.response_of(pattern)
            })
            .codec(self.codec)
            .config(self.options.dispatcher.clone())
            .consumer(self.options.consumer.clone())
            .connect()?;

        info!(
            client_id = %self.options.client.client_id,
            patterns = ?server.patterns(),
            "app started"
        );
        Ok(RunningApp {
            client,
            server,
            dispatcher,
        })
    }
}

/// A started `App`.
pub struct RunningApp<B> {
    client: BrokerClient<B>,
    server: Server,
    dispatcher: Dispatcher<B>,
}

impl<B: Broker + 'static> RunningApp<B> {
    pub fn dispatcher(&self) -> &Dispatcher<B> {
        &self.dispatcher
    }

    pub fn client(&self) -> &BrokerClient<B> {
        &self.client
    }

    pub fn server_stats(&self) -> ServerStats {
        self.server.stats()
    }

    /// Stop the dispatcher and the server, then disconnect.
    pub fn close(self) -> ServerStats {
        self.dispatcher.close();
        let stats = self.server.stop();
        self.client.disconnect();
        info!(?stats, "app closed");
        stats
    }
}
