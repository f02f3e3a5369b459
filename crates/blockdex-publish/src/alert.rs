//! Operator alerts raised by the publication pipeline.

use std::fmt;
use std::path::PathBuf;

use blockdex_types::MessageFamily;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertKind {
    /// Delivery to `topic` has failed `attempts` times in a row and is
    /// still retrying.
    DeliveryStalled {
        family: MessageFamily,
        topic: String,
        attempts: u32,
    },
    /// The real event for `height` was given up on.
    FallbackActivated {
        family: MessageFamily,
        height: i64,
        placeholder_delivered: bool,
        essential_log: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub raised_at: DateTime<Utc>,
    pub kind: AlertKind,
}

impl Alert {
    #[must_use]
    pub fn now(kind: AlertKind) -> Self {
        Self {
            raised_at: Utc::now(),
            kind,
        }
    }

    #[must_use]
    pub fn family(&self) -> MessageFamily {
        match &self.kind {
            AlertKind::DeliveryStalled { family, .. } | AlertKind::FallbackActivated { family, .. } => {
                *family
            }
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AlertKind::DeliveryStalled {
                family,
                topic,
                attempts,
            } => write!(
                f,
                "{family} delivery to {topic} stalled after {attempts} attempts"
            ),
            AlertKind::FallbackActivated {
                family,
                height,
                placeholder_delivered,
                essential_log,
            } => {
                write!(f, "{family} at height {height} fell back (placeholder ")?;
                f.write_str(if *placeholder_delivered { "delivered" } else { "lost" })?;
                match essential_log {
                    Some(path) => write!(f, ", essential log {})", path.display()),
                    None => f.write_str(", no essential log)"),
                }
            }
        }
    }
}

/// Receives alerts. Must not block.
pub trait AlertSink: Send + Sync {
    fn raise(&self, alert: Alert);
}

/// Logs every alert at `error`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn raise(&self, alert: Alert) {
        tracing::error!(
            family = %alert.family(),
            raised_at = %alert.raised_at.to_rfc3339(),
            "ALERT: {alert}"
        );
    }
}
