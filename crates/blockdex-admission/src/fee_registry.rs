//! Fee calculators keyed by message type.
//!
//! The registry is built once at startup and handed to the admission gate by
//! reference; there is no process-wide table. A message type without a
//! calculator is a configuration defect and surfaces as the fatal
//! [`DexError::MissingFeeCalculator`].

use std::collections::HashMap;
use std::fmt;

use blockdex_types::{Coins, DexError, Fee, FeeMode, Msg, Result};

/// Computes the fee for one message.
pub type FeeCalculator = Box<dyn Fn(&Msg) -> Fee + Send + Sync>;

/// Explicit table from message type tag to its fee calculator.
#[derive(Default)]
pub struct FeeCalculatorRegistry {
    calculators: HashMap<&'static str, FeeCalculator>,
}

impl FeeCalculatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the calculator for `msg_type`.
    pub fn register(&mut self, msg_type: &'static str, calculator: FeeCalculator) {
        self.calculators.insert(msg_type, calculator);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, msg_type: &'static str, calculator: FeeCalculator) -> Self {
        self.register(msg_type, calculator);
        self
    }

    #[must_use]
    pub fn contains(&self, msg_type: &str) -> bool {
        self.calculators.contains_key(msg_type)
    }

    /// Fee for `msg`.
    pub fn calculate(&self, msg: &Msg) -> Result<Fee> {
        let calculator =
            self.calculators
                .get(msg.msg_type())
                .ok_or_else(|| DexError::MissingFeeCalculator {
                    msg_type: msg.msg_type().to_string(),
                })?;
        Ok(calculator(msg))
    }
}

impl fmt::Debug for FeeCalculatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&&str> = self.calculators.keys().collect();
        types.sort();
        f.debug_struct("FeeCalculatorRegistry")
            .field("msg_types", &types)
            .finish()
    }
}

/// Calculator charging a constant fee.
#[must_use]
pub fn fixed(tokens: Coins, mode: FeeMode) -> FeeCalculator {
    let fee = Fee::new(tokens, mode);
    Box::new(move |_| fee.clone())
}

/// Calculator for messages that cost nothing.
#[must_use]
pub fn free() -> FeeCalculator {
    Box::new(|_| Fee::free())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockdex_types::{Address, CancelOrderMsg, SendMsg};

    fn send() -> Msg {
        Msg::Send(SendMsg {
            from: Address([1; 20]),
            outputs: Vec::new(),
        })
    }

    fn cancel() -> Msg {
        Msg::CancelOrder(CancelOrderMsg {
            sender: Address([1; 20]),
            symbol: "BTC_BNB".into(),
            ref_id: "x".into(),
        })
    }

    #[test]
    fn lookup_by_message_type() {
        let registry = FeeCalculatorRegistry::new()
            .with("send", fixed(Coins::of("BNB", 5), FeeMode::SenderPays))
            .with("orderCancel", free());
        assert_eq!(
            registry.calculate(&send()).unwrap(),
            Fee::new(Coins::of("BNB", 5), FeeMode::SenderPays)
        );
        assert_eq!(registry.calculate(&cancel()).unwrap(), Fee::free());
    }

    #[test]
    fn missing_calculator_is_fatal_error() {
        let registry = FeeCalculatorRegistry::new().with("send", free());
        let err = registry.calculate(&cancel()).unwrap_err();
        assert!(
            matches!(err, DexError::MissingFeeCalculator { ref msg_type } if msg_type == "orderCancel"),
            "Got: {err}"
        );
    }

    #[test]
    fn calculator_can_inspect_message() {
        let registry = FeeCalculatorRegistry::new().with(
            "send",
            Box::new(|msg| match msg {
                Msg::Send(m) => Fee::new(
                    Coins::of("BNB", i64::try_from(m.outputs.len()).unwrap_or(i64::MAX) * 10),
                    FeeMode::SharedByValidators,
                ),
                _ => Fee::free(),
            }),
        );
        assert!(registry.contains("send"));
        assert!(registry.calculate(&send()).unwrap().tokens.is_zero());
        assert!(format!("{registry:?}").contains("send"));
    }
}
