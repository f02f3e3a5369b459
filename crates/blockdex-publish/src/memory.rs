//! In-process broker for tests and local runs.
//!
//! [`MemoryBroker`] implements [`BrokerConnector`] and can be switched into
//! outage or rejection modes per topic while a pipeline is running. Every
//! send attempt is recorded with its tokio timestamp, so paused-clock tests
//! can assert the exact backoff schedule.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::alert::{Alert, AlertSink};
use crate::channel::{
    BrokerConnector, DeliveryChannel, DeliveryError, DeliveryReceipt, OutboundRecord,
    ProducerSettings,
};

/// One recorded `send` call, successful or not.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
    pub at: Instant,
}

#[derive(Debug, Default)]
struct BrokerState {
    down_topics: HashSet<String>,
    rejections: HashMap<String, DeliveryError>,
    connect_down: bool,
    connects: u32,
    attempts: Vec<Attempt>,
    delivered: Vec<OutboundRecord>,
    next_offset: i64,
}

/// Shared handle; clones observe and control the same broker.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every send to `topic` fail with [`DeliveryError::OutOfBrokers`].
    pub fn set_topic_down(&self, topic: &str, down: bool) {
        let mut state = self.state();
        if down {
            state.down_topics.insert(topic.to_string());
        } else {
            state.down_topics.remove(topic);
        }
    }

    /// Make every send to `topic` fail with `error` until cleared.
    pub fn reject_topic(&self, topic: &str, error: DeliveryError) {
        self.state().rejections.insert(topic.to_string(), error);
    }

    pub fn clear_rejection(&self, topic: &str) {
        self.state().rejections.remove(topic);
    }

    /// Make `connect` fail with [`DeliveryError::OutOfBrokers`].
    pub fn set_connect_down(&self, down: bool) {
        self.state().connect_down = down;
    }

    #[must_use]
    pub fn connects(&self) -> u32 {
        self.state().connects
    }

    #[must_use]
    pub fn attempts(&self) -> Vec<Attempt> {
        self.state().attempts.clone()
    }

    #[must_use]
    pub fn attempts_for(&self, topic: &str) -> Vec<Attempt> {
        self.state()
            .attempts
            .iter()
            .filter(|a| a.topic == topic)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn delivered(&self) -> Vec<OutboundRecord> {
        self.state().delivered.clone()
    }

    #[must_use]
    pub fn delivered_for(&self, topic: &str) -> Vec<OutboundRecord> {
        self.state()
            .delivered
            .iter()
            .filter(|r| r.topic == topic)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BrokerConnector for MemoryBroker {
    async fn connect(
        &self,
        endpoints: &[String],
        settings: &ProducerSettings,
    ) -> Result<Box<dyn DeliveryChannel>, DeliveryError> {
        let mut state = self.state();
        state.connects += 1;
        if state.connect_down || endpoints.is_empty() {
            return Err(DeliveryError::OutOfBrokers);
        }
        Ok(Box::new(MemoryChannel {
            broker: self.clone(),
            max_message_bytes: settings.max_message_bytes,
            closed: AtomicBool::new(false),
        }))
    }
}

struct MemoryChannel {
    broker: MemoryBroker,
    max_message_bytes: usize,
    closed: AtomicBool,
}

#[async_trait]
impl DeliveryChannel for MemoryChannel {
    async fn send(&self, record: &OutboundRecord) -> Result<DeliveryReceipt, DeliveryError> {
        let mut state = self.broker.state();
        state.attempts.push(Attempt {
            topic: record.topic.clone(),
            key: record.key.clone(),
            payload: record.payload.clone(),
            at: Instant::now(),
        });
        if self.closed.load(Ordering::Acquire) {
            return Err(DeliveryError::Closed);
        }
        if record.payload.len() > self.max_message_bytes {
            return Err(DeliveryError::MessageTooLarge {
                size: record.payload.len(),
                limit: self.max_message_bytes,
            });
        }
        if let Some(err) = state.rejections.get(&record.topic) {
            return Err(err.clone());
        }
        if state.down_topics.contains(&record.topic) {
            return Err(DeliveryError::OutOfBrokers);
        }
        let offset = state.next_offset;
        state.next_offset += 1;
        state.delivered.push(record.clone());
        Ok(DeliveryReceipt {
            partition: record.partition.unwrap_or(0),
            offset,
        })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Alert sink that keeps every alert for inspection.
#[derive(Debug, Clone, Default)]
pub struct CollectingAlertSink {
    alerts: Arc<Mutex<Vec<Alert>>>,
}

impl CollectingAlertSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AlertSink for CollectingAlertSink {
    fn raise(&self, alert: Alert) {
        tracing::error!(family = %alert.family(), "ALERT: {alert}");
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(alert);
    }
}
