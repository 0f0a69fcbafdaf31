//! Combined trait for a broker connection.

use super::error::ConnectionError;
use super::publisher::Publisher;
use super::subscriber::Subscriber;

/// A broker the client can connect to, publish on and consume from.
pub trait Broker: Publisher + Subscriber {
    /// Handshake with the broker. Fails when it cannot be reached.
    fn connect(&self, client_id: &str) -> Result<(), ConnectionError>;

    /// Addresses of the bootstrap brokers, for diagnostics.
    fn brokers(&self) -> Vec<String>;
}
