//! The cycle-scoped error accumulator (spec.md §4.8).
//!
//! Reset to empty at the start of every loop iteration; its contents at cycle end are
//! copied verbatim into `csp-config.errors`, overwriting the previous list.

/// Accumulates human-readable error strings for a single control-loop cycle.
#[derive(Debug, Default, Clone)]
pub struct ErrorLedger {
    entries: Vec<String>,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error. Callers are expected to also log it; `heart` does so at the
    /// point of the call rather than here, keeping this type a plain accumulator.
    pub fn push(&mut self, message: impl Into<String>) {
        self.entries.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// The ledger's contents, to be copied verbatim into `csp-config.errors`.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_prior_cycle_entries() {
        let mut ledger = ErrorLedger::new();
        ledger.push("usage data retrieval failed: timeout");
        assert!(!ledger.is_empty());

        ledger.reset();
        assert!(ledger.is_empty());
        assert!(ledger.entries().is_empty());
    }
}
