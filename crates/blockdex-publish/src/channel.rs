//! Broker-facing delivery abstraction.
//!
//! The pipeline talks to brokers only through [`BrokerConnector`] and
//! [`DeliveryChannel`]; a concrete client (or [`crate::memory::MemoryBroker`]
//! in tests) plugs in behind them.

use async_trait::async_trait;
use blockdex_types::{Compression, MessageFamily, ProducerConfig, RequiredAcks};
use thiserror::Error;

/// One keyed record bound for a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
    /// `None` lets the broker pick a partition at random.
    pub partition: Option<i32>,
}

impl OutboundRecord {
    #[must_use]
    pub fn new(topic: impl Into<String>, key: String, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            key,
            payload,
            partition: None,
        }
    }
}

/// Delivery key: `{height}_{timestamp}_{family}`.
#[must_use]
pub fn record_key(height: i64, timestamp: i64, family: MessageFamily) -> String {
    format!("{height}_{timestamp}_{family}")
}

/// Where an acknowledged record landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub partition: i32,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("no broker reachable")]
    OutOfBrokers,

    #[error("circuit breaker open")]
    CircuitOpen,

    #[error("message too large: {size}B exceeds limit of {limit}B")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("broker rejected record: {0}")]
    Rejected(String),

    #[error("channel closed")]
    Closed,
}

impl DeliveryError {
    /// Only broker unavailability is worth waiting out. Everything else
    /// would fail the same way on every attempt.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::OutOfBrokers | Self::CircuitOpen)
    }
}

/// Producer settings handed to the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerSettings {
    pub client_id: String,
    pub max_message_bytes: usize,
    pub required_acks: RequiredAcks,
    pub compression: Compression,
    /// Connector-internal retries per send, before the pipeline's own.
    pub max_retries: u32,
    /// One in-flight request per connection keeps records ordered.
    pub max_in_flight: u32,
    pub random_partitioning: bool,
}

impl From<&ProducerConfig> for ProducerSettings {
    fn from(config: &ProducerConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            max_message_bytes: config.max_message_bytes,
            required_acks: config.required_acks,
            compression: config.compression,
            max_retries: config.max_retries,
            max_in_flight: 1,
            random_partitioning: true,
        }
    }
}

/// A connected, synchronous-acknowledgement producer.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Send one record and wait for the broker acknowledgement.
    async fn send(&self, record: &OutboundRecord) -> Result<DeliveryReceipt, DeliveryError>;

    /// Flush and release the connection.
    async fn close(&self);
}

/// Opens channels to a broker cluster.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(
        &self,
        endpoints: &[String],
        settings: &ProducerSettings,
    ) -> Result<Box<dyn DeliveryChannel>, DeliveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout() {
        assert_eq!(
            record_key(12, 1_700, MessageFamily::ExecutionResults),
            "12_1700_ExecutionResults"
        );
    }

    #[test]
    fn only_unavailability_is_retriable() {
        assert!(DeliveryError::OutOfBrokers.is_retriable());
        assert!(DeliveryError::CircuitOpen.is_retriable());
        assert!(!DeliveryError::MessageTooLarge { size: 2, limit: 1 }.is_retriable());
        assert!(!DeliveryError::Rejected("bad".into()).is_retriable());
        assert!(!DeliveryError::Closed.is_retriable());
    }

    #[test]
    fn settings_pin_ordering() {
        let settings = ProducerSettings::from(&ProducerConfig::default());
        assert_eq!(settings.max_in_flight, 1);
        assert!(settings.random_partitioning);
        assert_eq!(settings.required_acks, RequiredAcks::AllInSync);
    }
}
