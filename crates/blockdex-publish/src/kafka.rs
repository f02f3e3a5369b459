//! Kafka delivery over librdkafka.
//!
//! [`KafkaConnector`] turns [`ProducerSettings`] into a `FutureProducer`
//! configuration and checks the cluster is reachable before handing out a
//! channel. Each [`KafkaChannel::send`] waits for the broker acknowledgement
//! at the configured ack level.
//!
//! ```text
//! ProducerSettings ──► ClientConfig ──► FutureProducer ──► fetch_metadata
//!                                              │
//!                    send(record) ──► (partition, offset) | KafkaError
//!                                                               │
//!                                            classify ──► DeliveryError
//! ```

use std::time::Duration;

use async_trait::async_trait;
use blockdex_types::{Compression, RequiredAcks};
use rdkafka::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;

use crate::channel::{
    BrokerConnector, DeliveryChannel, DeliveryError, DeliveryReceipt, OutboundRecord,
    ProducerSettings,
};

/// Opens [`KafkaChannel`]s.
#[derive(Debug, Clone)]
pub struct KafkaConnector {
    /// Upper bound on one send, including librdkafka's internal retries.
    pub delivery_timeout: Duration,
    /// How long `connect` waits for cluster metadata.
    pub metadata_timeout: Duration,
    /// How long `close` waits for queued records.
    pub flush_timeout: Duration,
}

impl Default for KafkaConnector {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(30),
            metadata_timeout: Duration::from_secs(10),
            flush_timeout: Duration::from_secs(10),
        }
    }
}

impl KafkaConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// librdkafka configuration for `settings`.
    #[must_use]
    pub fn client_config(&self, endpoints: &[String], settings: &ProducerSettings) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", endpoints.join(","))
            .set("client.id", &settings.client_id)
            .set("acks", acks(settings.required_acks))
            .set("compression.type", compression(settings.compression))
            .set("message.max.bytes", settings.max_message_bytes.to_string())
            .set("retries", settings.max_retries.to_string())
            .set(
                "max.in.flight.requests.per.connection",
                settings.max_in_flight.to_string(),
            )
            .set(
                "partitioner",
                if settings.random_partitioning {
                    "random"
                } else {
                    "consistent_random"
                },
            )
            .set(
                "message.timeout.ms",
                self.delivery_timeout.as_millis().to_string(),
            );
        config
    }
}

fn acks(level: RequiredAcks) -> &'static str {
    match level {
        RequiredAcks::NoResponse => "0",
        RequiredAcks::Leader => "1",
        RequiredAcks::AllInSync => "all",
    }
}

fn compression(codec: Compression) -> &'static str {
    match codec {
        Compression::None => "none",
        Compression::Gzip => "gzip",
        Compression::Snappy => "snappy",
        Compression::Lz4 => "lz4",
        Compression::Zstd => "zstd",
    }
}

/// Map a librdkafka error onto the pipeline's retry classes.
fn classify(err: &KafkaError, size: usize, limit: usize) -> DeliveryError {
    match err.rdkafka_error_code() {
        Some(
            RDKafkaErrorCode::AllBrokersDown
            | RDKafkaErrorCode::BrokerTransportFailure
            | RDKafkaErrorCode::NetworkException
            | RDKafkaErrorCode::MessageTimedOut
            | RDKafkaErrorCode::RequestTimedOut
            | RDKafkaErrorCode::LeaderNotAvailable
            | RDKafkaErrorCode::NotEnoughReplicas
            | RDKafkaErrorCode::NotEnoughReplicasAfterAppend,
        ) => DeliveryError::OutOfBrokers,
        // Local queue saturated: the client is shedding load.
        Some(RDKafkaErrorCode::QueueFull) => DeliveryError::CircuitOpen,
        Some(RDKafkaErrorCode::MessageSizeTooLarge) => DeliveryError::MessageTooLarge { size, limit },
        _ => DeliveryError::Rejected(err.to_string()),
    }
}

#[async_trait]
impl BrokerConnector for KafkaConnector {
    async fn connect(
        &self,
        endpoints: &[String],
        settings: &ProducerSettings,
    ) -> Result<Box<dyn DeliveryChannel>, DeliveryError> {
        let producer: FutureProducer = self
            .client_config(endpoints, settings)
            .create()
            .map_err(|e| DeliveryError::Rejected(e.to_string()))?;

        let handle = producer.clone();
        let timeout = self.metadata_timeout;
        let metadata = tokio::task::spawn_blocking(move || {
            handle.client().fetch_metadata(None, Timeout::After(timeout))
        })
        .await
        .map_err(|e| DeliveryError::Rejected(format!("metadata task failed: {e}")))?;
        match metadata {
            Ok(metadata) => tracing::info!(
                brokers = metadata.brokers().len(),
                topics = metadata.topics().len(),
                client_id = %settings.client_id,
                "Connected to Kafka"
            ),
            Err(e) => {
                tracing::warn!(endpoints = %endpoints.join(","), error = %e, "Kafka metadata unavailable");
                return Err(classify(&e, 0, settings.max_message_bytes));
            }
        }

        Ok(Box::new(KafkaChannel {
            producer,
            max_message_bytes: settings.max_message_bytes,
            queue_timeout: self.delivery_timeout,
            flush_timeout: self.flush_timeout,
        }))
    }
}

/// A connected Kafka producer.
pub struct KafkaChannel {
    producer: FutureProducer,
    max_message_bytes: usize,
    queue_timeout: Duration,
    flush_timeout: Duration,
}

#[async_trait]
impl DeliveryChannel for KafkaChannel {
    async fn send(&self, record: &OutboundRecord) -> Result<DeliveryReceipt, DeliveryError> {
        let mut future_record = FutureRecord::to(&record.topic)
            .key(&record.key)
            .payload(&record.payload);
        if let Some(partition) = record.partition {
            future_record = future_record.partition(partition);
        }
        match self
            .producer
            .send(future_record, Timeout::After(self.queue_timeout))
            .await
        {
            Ok((partition, offset)) => Ok(DeliveryReceipt { partition, offset }),
            Err((e, _)) => Err(classify(&e, record.payload.len(), self.max_message_bytes)),
        }
    }

    async fn close(&self) {
        let producer = self.producer.clone();
        let timeout = self.flush_timeout;
        match tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout))).await {
            Ok(Ok(())) => tracing::debug!("Kafka producer flushed"),
            Ok(Err(e)) => tracing::error!(error = %e, "Kafka producer flush failed"),
            Err(e) => tracing::error!(error = %e, "Kafka flush task failed"),
        }
    }
}
