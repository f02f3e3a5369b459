//! Configuration for admission and market-data publication.
//!
//! Loaded from TOML. Every field has a production default, so an empty
//! document yields a valid (publication-disabled) configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{DexError, MessageFamily, Result, constants};

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

/// Chain-level admission settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Bound into every signature; transactions signed for another chain fail.
    pub chain_id: String,
    pub max_memo_chars: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            chain_id: "blockdex-chain".to_string(),
            max_memo_chars: constants::MAX_MEMO_CHARACTERS,
        }
    }
}

// ---------------------------------------------------------------------------
// Publication
// ---------------------------------------------------------------------------

/// Per-family publication settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyConfig {
    pub enabled: bool,
    pub topic: String,
    /// Broker endpoints separated by `;`.
    pub brokers: String,
}

impl FamilyConfig {
    #[must_use]
    pub fn endpoints(&self) -> Vec<String> {
        self.brokers
            .split(constants::BROKER_LIST_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Acknowledgment level requested from the broker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredAcks {
    NoResponse,
    Leader,
    /// Every in-sync replica.
    #[default]
    AllInSync,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    None,
    #[default]
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

/// Settings handed to the broker client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub client_id: String,
    pub max_message_bytes: usize,
    pub required_acks: RequiredAcks,
    pub compression: Compression,
    /// Retries performed inside the broker client before an error surfaces.
    pub max_retries: u32,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            client_id: constants::DEFAULT_CLIENT_ID.to_string(),
            max_message_bytes: constants::DEFAULT_MAX_MESSAGE_BYTES,
            required_acks: RequiredAcks::AllInSync,
            compression: Compression::Gzip,
            max_retries: constants::DEFAULT_PRODUCER_MAX_RETRIES,
        }
    }
}

/// Retry pacing for retriable broker errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub unit_ms: u64,
    pub max_interval_ms: u64,
    /// `None` retries until the operator abandons.
    pub max_attempts: Option<u32>,
    pub stall_alert_after: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            unit_ms: constants::DEFAULT_BACKOFF_UNIT_MS,
            max_interval_ms: constants::DEFAULT_BACKOFF_MAX_INTERVAL_MS,
            max_attempts: None,
            stall_alert_after: constants::DEFAULT_STALL_ALERT_AFTER,
        }
    }
}

/// Market-data publication settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationConfig {
    pub accounts: FamilyConfig,
    pub books: FamilyConfig,
    pub execution_results: FamilyConfig,
    pub block_fee: FamilyConfig,
    pub transfers: FamilyConfig,
    pub producer: ProducerConfig,
    pub backoff: BackoffConfig,
    pub essential_log_dir: PathBuf,
}

impl Default for PublicationConfig {
    fn default() -> Self {
        Self {
            accounts: FamilyConfig::default(),
            books: FamilyConfig::default(),
            execution_results: FamilyConfig::default(),
            block_fee: FamilyConfig::default(),
            transfers: FamilyConfig::default(),
            producer: ProducerConfig::default(),
            backoff: BackoffConfig::default(),
            essential_log_dir: PathBuf::from(constants::DEFAULT_ESSENTIAL_LOG_DIR),
        }
    }
}

impl PublicationConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DexError::Configuration(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    #[must_use]
    pub fn family(&self, family: MessageFamily) -> &FamilyConfig {
        match family {
            MessageFamily::Accounts => &self.accounts,
            MessageFamily::Books => &self.books,
            MessageFamily::ExecutionResults => &self.execution_results,
            MessageFamily::BlockFee => &self.block_fee,
            MessageFamily::Transfers => &self.transfers,
        }
    }

    pub fn family_mut(&mut self, family: MessageFamily) -> &mut FamilyConfig {
        match family {
            MessageFamily::Accounts => &mut self.accounts,
            MessageFamily::Books => &mut self.books,
            MessageFamily::ExecutionResults => &mut self.execution_results,
            MessageFamily::BlockFee => &mut self.block_fee,
            MessageFamily::Transfers => &mut self.transfers,
        }
    }

    /// Families switched on, in declaration order.
    #[must_use]
    pub fn enabled_families(&self) -> Vec<MessageFamily> {
        MessageFamily::ALL
            .into_iter()
            .filter(|f| self.family(*f).enabled)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        for family in self.enabled_families() {
            let cfg = self.family(family);
            if cfg.topic.trim().is_empty() {
                return Err(DexError::Configuration(format!(
                    "{family} is enabled but has no topic"
                )));
            }
            if cfg.endpoints().is_empty() {
                return Err(DexError::Configuration(format!(
                    "{family} is enabled but has no brokers"
                )));
            }
        }
        if self.backoff.unit_ms == 0 {
            return Err(DexError::Configuration(
                "backoff.unit_ms must be positive".to_string(),
            ));
        }
        if self.producer.max_message_bytes == 0 {
            return Err(DexError::Configuration(
                "producer.max_message_bytes must be positive".to_string(),
            ));
        }
        if self.producer.required_acks != RequiredAcks::AllInSync {
            tracing::warn!(
                acks = ?self.producer.required_acks,
                "Producer acknowledgment weaker than all in-sync replicas; acknowledged messages may be lost"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
essential_log_dir = "/var/lib/blockdex/essential"

[execution_results]
enabled = true
topic = "orders"
brokers = "k1:9092; k2:9092;"

[books]
enabled = true
topic = "books"
brokers = "k1:9092"

[backoff]
unit_ms = 500
max_attempts = 8
"#;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = PublicationConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, PublicationConfig::default());
        assert!(cfg.enabled_families().is_empty());
        assert_eq!(cfg.producer.max_message_bytes, 100 * 1024 * 1024);
        assert_eq!(cfg.producer.required_acks, RequiredAcks::AllInSync);
        assert_eq!(cfg.backoff.max_attempts, None);
        cfg.validate().unwrap();
    }

    #[test]
    fn parses_families_and_brokers() {
        let cfg = PublicationConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(
            cfg.enabled_families(),
            vec![MessageFamily::Books, MessageFamily::ExecutionResults]
        );
        assert_eq!(cfg.execution_results.endpoints(), vec!["k1:9092", "k2:9092"]);
        assert_eq!(cfg.backoff.unit_ms, 500);
        assert_eq!(cfg.backoff.max_attempts, Some(8));
        assert_eq!(cfg.backoff.stall_alert_after, constants::DEFAULT_STALL_ALERT_AFTER);
        cfg.validate().unwrap();
    }

    #[test]
    fn enabled_family_without_topic_is_rejected() {
        let mut cfg = PublicationConfig::default();
        cfg.accounts.enabled = true;
        cfg.accounts.brokers = "k1:9092".into();
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err}").contains("BDX_ERR_902"), "Got: {err}");
    }

    #[test]
    fn enabled_family_without_brokers_is_rejected() {
        let mut cfg = PublicationConfig::default();
        cfg.transfers.enabled = true;
        cfg.transfers.topic = "transfers".into();
        cfg.transfers.brokers = " ; ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_configuration_error() {
        let err = PublicationConfig::from_toml_str("[books\nenabled = 1").unwrap_err();
        assert!(matches!(err, DexError::Configuration(_)), "Got: {err}");
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("publish.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let cfg = PublicationConfig::from_file(&path).unwrap();
        assert!(cfg.books.enabled);
        assert!(PublicationConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
