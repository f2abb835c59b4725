//! Trust ledger (C12): progressive-trust bookkeeping, consulted
//! read-only and lower-only by the risk classifier, and updated by the
//! governed proxy after each execution.

use cplane_core::{Capability, RiskTier, Scope};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct LedgerEntry {
    successes: u64,
    failures: u64,
}

/// In-process trust ledger keyed by `(capability, scope)`.
///
/// Graduation is counter-based: once `successes` reaches
/// `graduation_threshold`, the ledger offers one tier below the
/// capability's registered default, floored at T0. A recorded failure
/// resets `successes` to zero — any failure forfeits accumulated trust
/// for that key; this is a conservative choice the source left
/// unspecified.
pub struct TrustLedger {
    entries: Mutex<HashMap<(String, String), LedgerEntry>>,
    defaults: Mutex<HashMap<String, RiskTier>>,
    graduation_threshold: u64,
    enabled: bool,
}

impl TrustLedger {
    pub fn new(graduation_threshold: u64, enabled: bool) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            defaults: Mutex::new(HashMap::new()),
            graduation_threshold,
            enabled,
        }
    }

    fn key(capability: &Capability, scope: Scope) -> (String, String) {
        (capability.as_str().to_string(), scope.to_string())
    }

    /// Record the capability's default tier, so graduation can offer
    /// "one below default" rather than a flat floor.
    pub fn register_default_tier(&self, capability: &str, tier: RiskTier) {
        self.defaults
            .lock()
            .unwrap()
            .insert(capability.to_string(), tier);
    }

    pub fn record_success(&self, capability: &Capability, scope: Scope) {
        if !self.enabled {
            return;
        }
        let mut entries = self.entries.lock().unwrap();
        entries
            .entry(Self::key(capability, scope))
            .or_default()
            .successes += 1;
    }

    pub fn record_failure(&self, capability: &Capability, scope: Scope) {
        if !self.enabled {
            return;
        }
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(Self::key(capability, scope)).or_default();
        entry.failures += 1;
        entry.successes = 0;
    }

    /// A rollback is framed as a failure for trust-accounting purposes.
    pub fn handle_rollback(&self, capability: &Capability, scope: Scope) {
        self.record_failure(capability, scope);
    }

    /// Effective tier offered by accumulated trust. `None` if the
    /// ledger is disabled or the key hasn't graduated yet — callers
    /// must not lower the tier in that case.
    pub fn get_effective_tier(&self, capability: &Capability, scope: Scope) -> Option<RiskTier> {
        if !self.enabled {
            return None;
        }
        let graduated = {
            let entries = self.entries.lock().unwrap();
            let entry = entries.get(&Self::key(capability, scope))?;
            entry.successes >= self.graduation_threshold
        };
        if !graduated {
            return None;
        }
        let default_tier = self
            .defaults
            .lock()
            .unwrap()
            .get(capability.as_str())
            .copied()
            .unwrap_or(RiskTier::T3Irreversible);
        Some(default_tier.lowered())
    }

    pub fn successes(&self, capability: &Capability, scope: Scope) -> u64 {
        self.entries
            .lock()
            .unwrap()
            .get(&Self::key(capability, scope))
            .map(|e| e.successes)
            .unwrap_or(0)
    }

    pub fn failures(&self, capability: &Capability, scope: Scope) -> u64 {
        self.entries
            .lock()
            .unwrap()
            .get(&Self::key(capability, scope))
            .map(|e| e.failures)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap() -> Capability {
        Capability::from("connector.slack.post_message")
    }

    #[test]
    fn no_relaxation_before_graduation() {
        let ledger = TrustLedger::new(3, true);
        ledger.register_default_tier(cap().as_str(), RiskTier::T2Controlled);
        ledger.record_success(&cap(), Scope::External);
        ledger.record_success(&cap(), Scope::External);
        assert_eq!(ledger.get_effective_tier(&cap(), Scope::External), None);
    }

    #[test]
    fn graduates_to_one_below_default_after_threshold() {
        let ledger = TrustLedger::new(3, true);
        ledger.register_default_tier(cap().as_str(), RiskTier::T2Controlled);
        for _ in 0..3 {
            ledger.record_success(&cap(), Scope::External);
        }
        assert_eq!(
            ledger.get_effective_tier(&cap(), Scope::External),
            Some(RiskTier::T1Reversible)
        );
    }

    #[test]
    fn graduation_floors_at_t0() {
        let ledger = TrustLedger::new(1, true);
        ledger.register_default_tier(cap().as_str(), RiskTier::T0Inert);
        ledger.record_success(&cap(), Scope::External);
        assert_eq!(
            ledger.get_effective_tier(&cap(), Scope::External),
            Some(RiskTier::T0Inert)
        );
    }

    #[test]
    fn failure_resets_success_counter() {
        let ledger = TrustLedger::new(3, true);
        ledger.record_success(&cap(), Scope::External);
        ledger.record_success(&cap(), Scope::External);
        ledger.record_failure(&cap(), Scope::External);
        assert_eq!(ledger.successes(&cap(), Scope::External), 0);
        assert_eq!(ledger.failures(&cap(), Scope::External), 1);
    }

    #[test]
    fn disabled_ledger_never_relaxes() {
        let ledger = TrustLedger::new(1, false);
        ledger.register_default_tier(cap().as_str(), RiskTier::T2Controlled);
        ledger.record_success(&cap(), Scope::External);
        assert_eq!(ledger.get_effective_tier(&cap(), Scope::External), None);
    }

    #[test]
    fn rollback_counts_as_failure() {
        let ledger = TrustLedger::new(3, true);
        ledger.record_success(&cap(), Scope::External);
        ledger.handle_rollback(&cap(), Scope::External);
        assert_eq!(ledger.successes(&cap(), Scope::External), 0);
        assert_eq!(ledger.failures(&cap(), Scope::External), 1);
    }

    #[test]
    fn scopes_are_tracked_independently() {
        let ledger = TrustLedger::new(2, true);
        ledger.record_success(&cap(), Scope::External);
        ledger.record_success(&cap(), Scope::External);
        assert_eq!(ledger.successes(&cap(), Scope::Workspace), 0);
    }
}
