//! # blockdex-publish
//!
//! Market-data publication for the blockdex chain: every committed block
//! becomes one message per family, delivered to a broker with unbounded
//! backoff and a durable local fallback.
//!
//! ## Architecture
//!
//! - **[`depth_delta`]**: order lifecycle → price-level quantity change
//! - **[`DepthTracker`]** / **[`BlockEventAssembler`]**: block → [`MarketEvent`]s
//! - **[`EventCodec`]** / **[`SchemaRegistry`]**: Avro binary encoding per family
//! - **[`DeliveryChannel`]** / **[`BrokerConnector`]**: broker seam, with a
//!   librdkafka implementation behind the `kafka` feature
//! - **[`PublicationPipeline`]**: routing, retry, placeholder fallback,
//!   [`EssentialLog`], [`Alert`]s
//!
//! ## Flow
//!
//! ```text
//! BlockOutput
//!   → BlockEventAssembler::assemble       (one MarketEvent per family)
//!   → PublicationPipeline::publish_block  (concurrent across topics)
//!       → Delivered | Disabled | SerializationFailed | FellBack
//! ```

pub mod alert;
pub mod assemble;
pub mod backoff;
pub mod books;
pub mod channel;
pub mod codec;
pub mod essential_log;
pub mod events;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod lifecycle;
pub mod memory;
pub mod pipeline;
pub mod schemas;

pub use alert::{Alert, AlertKind, AlertSink, TracingAlertSink};
pub use assemble::BlockEventAssembler;
pub use backoff::BackoffPolicy;
pub use books::{DepthTracker, OrderBookDelta, PriceLevel};
pub use channel::{
    BrokerConnector, DeliveryChannel, DeliveryError, DeliveryReceipt, OutboundRecord,
    ProducerSettings, record_key,
};
pub use codec::{CodecError, EventCodec};
pub use essential_log::EssentialLog;
pub use events::{Accounts, Books, ExecutionResults, MarketEvent, Transfers};
#[cfg(feature = "kafka")]
pub use kafka::{KafkaChannel, KafkaConnector};
pub use lifecycle::{change_delta, depth_delta};
pub use pipeline::{PublicationPipeline, PublicationStats, PublishOutcome};
pub use schemas::SchemaRegistry;
