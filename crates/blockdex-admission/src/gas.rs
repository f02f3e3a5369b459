//! Gas metering for admission work.

/// Gas budget exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutOfGas {
    pub descriptor: &'static str,
    pub limit: u64,
    pub consumed: u64,
}

/// Counts gas against a limit. A limit of `0` meters without enforcing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    consumed: u64,
}

impl GasMeter {
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self { limit, consumed: 0 }
    }

    #[must_use]
    pub fn unmetered() -> Self {
        Self::new(0)
    }

    /// Charge `amount`. On failure the meter stays at the attempted total so
    /// callers can report how far over the limit the work went.
    pub fn consume(&mut self, amount: u64, descriptor: &'static str) -> Result<(), OutOfGas> {
        self.consumed = self.consumed.saturating_add(amount);
        if self.limit != 0 && self.consumed > self.limit {
            return Err(OutOfGas {
                descriptor,
                limit: self.limit,
                consumed: self.consumed,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }
}
