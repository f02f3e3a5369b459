//! Reliable event publication.
//!
//! ```text
//! MarketEvent ──► EventCodec ──► OutboundRecord{topic, key}
//!                                     │
//!                       channel mutex (one in-flight per topic)
//!                                     │
//!        send ──ok──► Delivered
//!          │
//!          ├─ retriable ──► backoff 1,2,4.. ──► send   (until abandoned)
//!          │
//!          └─ permanent / abandoned ──► placeholder + essential log + alert
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use blockdex_types::{DexError, MessageFamily, PublicationConfig, Result};
use futures::future::join_all;
use tokio::sync::{Mutex, watch};

use crate::alert::{Alert, AlertKind, AlertSink};
use crate::backoff::BackoffPolicy;
use crate::channel::{
    BrokerConnector, DeliveryChannel, DeliveryError, DeliveryReceipt, OutboundRecord,
    ProducerSettings, record_key,
};
use crate::codec::EventCodec;
use crate::essential_log::EssentialLog;
use crate::events::MarketEvent;
use crate::schemas::SchemaRegistry;

// ---------------------------------------------------------------------------
// Outcome and stats
// ---------------------------------------------------------------------------

/// What happened to one `publish` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Delivered(DeliveryReceipt),
    /// Publication for the family is turned off.
    Disabled,
    /// The event did not fit its schema; nothing was sent.
    SerializationFailed,
    /// The real event was given up on.
    FellBack {
        placeholder: bool,
        essential_log: Option<PathBuf>,
    },
}

impl PublishOutcome {
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

/// Snapshot of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublicationStats {
    pub delivered: u64,
    pub retries: u64,
    pub fallbacks: u64,
    pub serialization_failures: u64,
    /// Calls currently inside a backoff loop. Non-zero for long means a
    /// broker outage.
    pub retrying: u64,
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    retries: AtomicU64,
    fallbacks: AtomicU64,
    serialization_failures: AtomicU64,
    retrying: AtomicU64,
}

/// Decrements `retrying` when a retry loop exits on any path.
struct RetryingGuard<'a>(&'a AtomicU64);

impl<'a> RetryingGuard<'a> {
    fn enter(counter: &'a AtomicU64) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for RetryingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// PublicationPipeline
// ---------------------------------------------------------------------------

type SharedChannel = Arc<Mutex<Box<dyn DeliveryChannel>>>;

struct Route {
    topic: String,
    channel: SharedChannel,
}

/// Owns one delivery channel per topic and publishes events to them.
///
/// Publication errors never escape: every call ends delivered, disabled,
/// dropped as a serialization defect, or fallen back.
pub struct PublicationPipeline {
    routes: HashMap<MessageFamily, Route>,
    channels: Vec<(String, SharedChannel)>,
    codec: EventCodec,
    backoff: BackoffPolicy,
    stall_alert_after: u32,
    max_message_bytes: usize,
    essential: EssentialLog,
    alerts: Arc<dyn AlertSink>,
    /// Bumped by every abandonment; calls started before a bump give up.
    abandon: watch::Sender<u64>,
    counters: Counters,
}

impl PublicationPipeline {
    /// Validate `config`, parse the built-in schemas, and open one channel
    /// per distinct `(brokers, topic)` of the enabled families.
    ///
    /// Connecting retries broker unavailability with the configured backoff.
    pub async fn connect(
        config: PublicationConfig,
        connector: &dyn BrokerConnector,
        alerts: Arc<dyn AlertSink>,
    ) -> Result<Self> {
        Self::connect_with_registry(config, SchemaRegistry::standard()?, connector, alerts).await
    }

    /// [`Self::connect`] with caller-provided schemas.
    pub async fn connect_with_registry(
        config: PublicationConfig,
        registry: SchemaRegistry,
        connector: &dyn BrokerConnector,
        alerts: Arc<dyn AlertSink>,
    ) -> Result<Self> {
        config.validate()?;
        let codec = EventCodec::new(registry);
        let essential = EssentialLog::new(config.essential_log_dir.clone());
        essential.ensure_dir()?;

        let backoff = BackoffPolicy::from(&config.backoff);
        let settings = ProducerSettings::from(&config.producer);

        let mut opened: HashMap<(String, String), SharedChannel> = HashMap::new();
        let mut channels = Vec::new();
        let mut routes = HashMap::new();
        for family in config.enabled_families() {
            let family_config = config.family(family);
            let topic = family_config.topic.clone();
            let key = (family_config.brokers.clone(), topic.clone());
            let channel = if let Some(channel) = opened.get(&key) {
                Arc::clone(channel)
            } else {
                let endpoints = family_config.endpoints();
                let channel = open_channel(connector, &endpoints, &settings, &backoff, &topic).await?;
                let channel: SharedChannel = Arc::new(Mutex::new(channel));
                opened.insert(key, Arc::clone(&channel));
                channels.push((topic.clone(), Arc::clone(&channel)));
                channel
            };
            tracing::info!(family = %family, topic = %topic, "Publication route ready");
            routes.insert(family, Route { topic, channel });
        }

        let (abandon, _) = watch::channel(0);
        Ok(Self {
            routes,
            channels,
            codec,
            backoff,
            stall_alert_after: config.backoff.stall_alert_after,
            max_message_bytes: config.producer.max_message_bytes,
            essential,
            alerts,
            abandon,
            counters: Counters::default(),
        })
    }

    #[must_use]
    pub fn is_enabled(&self, family: MessageFamily) -> bool {
        self.routes.contains_key(&family)
    }

    #[must_use]
    pub fn topic(&self, family: MessageFamily) -> Option<&str> {
        self.routes.get(&family).map(|r| r.topic.as_str())
    }

    /// Publish one event keyed by `(height, timestamp, family)`.
    pub async fn publish(&self, event: &MarketEvent, height: i64, timestamp: i64) -> PublishOutcome {
        let family = event.family();
        let Some(route) = self.routes.get(&family) else {
            tracing::debug!(family = %family, height, "Publication disabled for family");
            return PublishOutcome::Disabled;
        };

        let payload = match self.codec.encode(event) {
            Ok(payload) => payload,
            Err(e) => {
                self.counters
                    .serialization_failures
                    .fetch_add(1, Ordering::Relaxed);
                tracing::error!(family = %family, height, error = %e, "Failed to serialize event");
                return PublishOutcome::SerializationFailed;
            }
        };
        let record = OutboundRecord::new(
            route.topic.as_str(),
            record_key(height, timestamp, family),
            payload,
        );

        let generation = *self.abandon.borrow();
        let channel = route.channel.lock().await;
        match self.deliver_with_retry(&**channel, &record, family, generation).await {
            Ok(receipt) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    family = %family,
                    topic = %record.topic,
                    key = %record.key,
                    partition = receipt.partition,
                    offset = receipt.offset,
                    bytes = record.payload.len(),
                    "Delivered event"
                );
                PublishOutcome::Delivered(receipt)
            }
            Err(cause) => {
                self.fall_back(&**channel, &route.topic, event, height, timestamp, &cause)
                    .await
            }
        }
    }

    /// Publish every event of a block concurrently. Families on different
    /// topics do not wait for each other.
    pub async fn publish_block(
        &self,
        events: &[MarketEvent],
        height: i64,
        timestamp: i64,
    ) -> Vec<PublishOutcome> {
        join_all(events.iter().map(|e| self.publish(e, height, timestamp))).await
    }

    /// Stop the retry loops of every publish already in progress, including
    /// those queued behind a stalled topic; they fall back instead. Later
    /// publishes retry normally.
    pub fn abandon_retries(&self) {
        self.abandon.send_modify(|generation| *generation += 1);
        tracing::warn!(generation = *self.abandon.borrow(), "Operator abandoned delivery retries");
    }

    #[must_use]
    pub fn stats(&self) -> PublicationStats {
        PublicationStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
            fallbacks: self.counters.fallbacks.load(Ordering::Relaxed),
            serialization_failures: self.counters.serialization_failures.load(Ordering::Relaxed),
            retrying: self.counters.retrying.load(Ordering::Relaxed),
        }
    }

    /// Close every channel. Waits for in-flight publishes on each.
    pub async fn close(&self) {
        for (topic, channel) in &self.channels {
            channel.lock().await.close().await;
            tracing::info!(topic = %topic, "Closed delivery channel");
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn deliver_with_retry(
        &self,
        channel: &dyn DeliveryChannel,
        record: &OutboundRecord,
        family: MessageFamily,
        generation: u64,
    ) -> std::result::Result<DeliveryReceipt, DeliveryError> {
        if record.payload.len() > self.max_message_bytes {
            return Err(DeliveryError::MessageTooLarge {
                size: record.payload.len(),
                limit: self.max_message_bytes,
            });
        }

        let mut abandon = self.abandon.subscribe();
        let mut retrying: Option<RetryingGuard<'_>> = None;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let err = match channel.send(record).await {
                Ok(receipt) => return Ok(receipt),
                Err(e) if !e.is_retriable() => {
                    tracing::error!(family = %family, topic = %record.topic, error = %e, "Permanent delivery failure");
                    return Err(e);
                }
                Err(e) => e,
            };
            if retrying.is_none() {
                retrying = Some(RetryingGuard::enter(&self.counters.retrying));
            }

            if attempts == self.stall_alert_after {
                self.alerts.raise(Alert::now(AlertKind::DeliveryStalled {
                    family,
                    topic: record.topic.clone(),
                    attempts,
                }));
            }
            if self.backoff.exhausted(attempts) {
                tracing::error!(family = %family, topic = %record.topic, attempts, error = %err, "Delivery attempts exhausted");
                return Err(err);
            }
            if *abandon.borrow_and_update() > generation {
                tracing::error!(family = %family, topic = %record.topic, attempts, "Delivery retries abandoned");
                return Err(err);
            }

            let delay = self.backoff.delay_after(attempts);
            self.counters.retries.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                family = %family,
                topic = %record.topic,
                attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "Broker unavailable; retrying"
            );
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = abandon.wait_for(|current| *current > generation) => {
                    tracing::error!(family = %family, topic = %record.topic, attempts, "Delivery retries abandoned");
                    return Err(err);
                }
            }
        }
    }

    async fn fall_back(
        &self,
        channel: &dyn DeliveryChannel,
        topic: &str,
        event: &MarketEvent,
        height: i64,
        timestamp: i64,
        cause: &DeliveryError,
    ) -> PublishOutcome {
        let family = event.family();
        self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::error!(family = %family, height, error = %cause, "Falling back to placeholder and essential log");

        let placeholder = match self.codec.encode(&event.empty_copy()) {
            Ok(payload) => {
                let record = OutboundRecord::new(topic, record_key(height, timestamp, family), payload);
                match channel.send(&record).await {
                    Ok(receipt) => {
                        tracing::error!(
                            family = %family,
                            height,
                            partition = receipt.partition,
                            offset = receipt.offset,
                            "Published empty placeholder in place of event"
                        );
                        true
                    }
                    Err(e) => {
                        tracing::error!(family = %family, height, error = %e, "Placeholder delivery failed");
                        false
                    }
                }
            }
            Err(e) => {
                tracing::error!(family = %family, height, error = %e, "Failed to serialize placeholder");
                false
            }
        };

        let essential_log = self
            .essential
            .write(height, family, &event.essential_msg())
            .await;

        self.alerts.raise(Alert::now(AlertKind::FallbackActivated {
            family,
            height,
            placeholder_delivered: placeholder,
            essential_log: essential_log.clone(),
        }));

        PublishOutcome::FellBack {
            placeholder,
            essential_log,
        }
    }
}

impl std::fmt::Debug for PublicationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut families: Vec<_> = self.routes.keys().copied().collect();
        families.sort();
        f.debug_struct("PublicationPipeline")
            .field("families", &families)
            .field("channels", &self.channels.len())
            .field("backoff", &self.backoff)
            .field("essential_dir", &self.essential.dir())
            .finish_non_exhaustive()
    }
}

async fn open_channel(
    connector: &dyn BrokerConnector,
    endpoints: &[String],
    settings: &ProducerSettings,
    backoff: &BackoffPolicy,
    topic: &str,
) -> Result<Box<dyn DeliveryChannel>> {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match connector.connect(endpoints, settings).await {
            Ok(channel) => {
                tracing::info!(topic, brokers = endpoints.len(), attempts, "Connected delivery channel");
                return Ok(channel);
            }
            Err(e) if e.is_retriable() && !backoff.exhausted(attempts) => {
                let delay = backoff.delay_after(attempts);
                tracing::warn!(topic, attempts, error = %e, "Broker connection failed; retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(DexError::BrokerConnection {
                    topic: topic.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
}
