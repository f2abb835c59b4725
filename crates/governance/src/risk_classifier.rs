//! Risk classifier (C8): deterministic, side-effect-free tier resolution.

use crate::trust_ledger::TrustLedger;
use cplane_config::GovernanceConfig;
use cplane_core::{Capability, RiskTier, Scope};
use globset::Glob;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A single escalation rule carried by a Soul document's
/// `governance.escalations` list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SoulEscalation {
    pub capability: String,
    pub scope: Option<String>,
    pub pattern: Option<String>,
    pub escalate_to: i64,
    pub reason: String,
}

/// The subset of a Soul document the classifier consults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SoulGovernance {
    #[serde(default)]
    pub escalations: Vec<SoulEscalation>,
}

/// Runtime risk profile for one action invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRiskProfile {
    pub tier: RiskTier,
    pub capability: String,
    pub scope: String,
    pub reversible: bool,
    pub soul_escalation: Option<String>,
    pub classified_at: chrono::DateTime<chrono::Utc>,
}

impl ActionRiskProfile {
    fn new(
        tier: RiskTier,
        capability: &Capability,
        scope: Scope,
        soul_escalation: Option<String>,
    ) -> Self {
        Self {
            tier,
            capability: capability.as_str().to_string(),
            scope: scope.to_string(),
            reversible: tier.is_reversible_tier(),
            soul_escalation,
            classified_at: chrono::Utc::now(),
        }
    }
}

/// A plan step handed to [`RiskClassifier::classify_step`].
pub struct PlanStep<'a> {
    pub capability: &'a str,
    pub scope: Scope,
    pub target: Option<&'a str>,
}

/// Deterministic risk tier resolver, called at most once per action.
///
/// Thread-safe: the default-tier table and Soul rules sit behind a
/// `RwLock` so connectors can register tiers at startup and a Soul can
/// be hot-reloaded without rebuilding the classifier.
pub struct RiskClassifier {
    defaults: RwLock<HashMap<String, RiskTier>>,
    scope_escalations: Vec<cplane_config::ScopeEscalation>,
    soul: RwLock<Option<SoulGovernance>>,
    trust_ledger: Option<Arc<TrustLedger>>,
    trust_ledger_enabled: bool,
}

impl RiskClassifier {
    pub fn new(config: &GovernanceConfig) -> Self {
        let defaults = config
            .risk_classification
            .defaults
            .iter()
            .map(|(k, v)| (k.clone(), RiskTier::from_rank(*v)))
            .collect();
        Self {
            defaults: RwLock::new(defaults),
            scope_escalations: config.risk_classification.scope_escalations.clone(),
            soul: RwLock::new(None),
            trust_ledger: None,
            trust_ledger_enabled: config.trust_ledger.feature_flag_enabled,
        }
    }

    pub fn with_trust_ledger(mut self, ledger: Arc<TrustLedger>) -> Self {
        self.trust_ledger = Some(ledger);
        self
    }

    /// Replace the Soul escalation rules.
    pub fn update_soul(&self, soul: Option<SoulGovernance>) {
        *self.soul.write().unwrap() = soul;
    }

    /// Register (or overwrite) a capability's default tier. Used by the
    /// governed proxy's `register_connector_tiers`.
    pub fn register_default_tier(&self, capability: &str, tier: RiskTier) {
        self.defaults
            .write()
            .unwrap()
            .insert(capability.to_string(), tier);
    }

    pub fn known_capabilities(&self) -> Vec<String> {
        self.defaults.read().unwrap().keys().cloned().collect()
    }

    /// Raw default-table lookup, bypassing escalation and trust —
    /// unknown capabilities fall back to [`RiskTier::T3Irreversible`].
    /// Used by the governed proxy's `get_operation_tier`, which reports
    /// an operation's registered tier rather than a classified one.
    pub fn default_tier_for(&self, capability: &str) -> RiskTier {
        self.defaults
            .read()
            .unwrap()
            .get(capability)
            .copied()
            .unwrap_or(RiskTier::T3Irreversible)
    }

    fn glob_matches(pattern: &str, target: &str) -> bool {
        Glob::new(pattern)
            .map(|g| g.compile_matcher().is_match(target))
            .unwrap_or(false)
    }

    pub fn classify(&self, capability: &str, scope: Scope, target: Option<&str>) -> ActionRiskProfile {
        let cap = Capability::from(capability);
        let scope_name = scope.to_string();

        // Step 1: default lookup, unknown capabilities are T3.
        let mut tier = self
            .defaults
            .read()
            .unwrap()
            .get(capability)
            .copied()
            .unwrap_or(RiskTier::T3Irreversible);

        // Step 2: scope/pattern escalation from config, raise-only.
        for rule in &self.scope_escalations {
            if rule.capability != capability {
                continue;
            }
            let scope_matches = rule.scope == scope_name;
            let pattern_matches = rule
                .pattern
                .as_deref()
                .zip(target)
                .is_some_and(|(p, t)| Self::glob_matches(p, t));
            if scope_matches || pattern_matches {
                let escalated = RiskTier::from_rank(rule.escalate_to);
                if escalated > tier {
                    tier = escalated;
                }
            }
        }

        // Step 3: Soul escalation, raise-only, records the rule's reason.
        let mut soul_escalation = None;
        if let Some(soul) = self.soul.read().unwrap().as_ref() {
            for rule in &soul.escalations {
                if rule.capability != capability {
                    continue;
                }
                let scope_matches = rule.scope.as_deref().is_some_and(|s| s == scope_name);
                let pattern_matches = rule
                    .pattern
                    .as_deref()
                    .zip(target)
                    .is_some_and(|(p, t)| Self::glob_matches(p, t));
                if scope_matches || pattern_matches {
                    let escalated = RiskTier::from_rank(rule.escalate_to);
                    if escalated > tier {
                        tier = escalated;
                        soul_escalation = Some(rule.reason.clone());
                    }
                }
            }
        }

        // Step 4: trust relaxation, lower-only. Skipped entirely when a
        // Soul escalation fired this round — the Soul floor must not be
        // undercut by accumulated trust.
        if soul_escalation.is_none() && self.trust_ledger_enabled {
            if let Some(ledger) = &self.trust_ledger {
                if let Some(relaxed) = ledger.get_effective_tier(&cap, scope) {
                    if relaxed < tier {
                        tier = relaxed;
                    }
                }
            }
        }

        ActionRiskProfile::new(tier, &cap, scope, soul_escalation)
    }

    pub fn classify_step(&self, step: &PlanStep) -> ActionRiskProfile {
        self.classify(step.capability, step.scope, step.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cplane_config::{GovernanceConfig, ScopeEscalation};

    fn config_with_default(capability: &str, tier: i64) -> GovernanceConfig {
        let mut config = GovernanceConfig::default();
        config
            .risk_classification
            .defaults
            .insert(capability.to_string(), tier);
        config
    }

    #[test]
    fn unknown_capability_defaults_to_t3() {
        let classifier = RiskClassifier::new(&GovernanceConfig::default());
        let profile = classifier.classify("connector.unknown.op", Scope::External, None);
        assert_eq!(profile.tier, RiskTier::T3Irreversible);
        assert!(!profile.reversible);
    }

    #[test]
    fn known_capability_uses_registered_default() {
        let config = config_with_default("connector.slack.post_message", 2);
        let classifier = RiskClassifier::new(&config);
        let profile = classifier.classify("connector.slack.post_message", Scope::External, None);
        assert_eq!(profile.tier, RiskTier::T2Controlled);
    }

    #[test]
    fn scope_escalation_raises_but_never_lowers() {
        let mut config = config_with_default("connector.slack.delete_message", 1);
        config.risk_classification.scope_escalations.push(ScopeEscalation {
            capability: "connector.slack.delete_message".into(),
            scope: "external".into(),
            pattern: None,
            escalate_to: 3,
            reason: "destructive".into(),
        });
        let classifier = RiskClassifier::new(&config);
        let profile = classifier.classify("connector.slack.delete_message", Scope::External, None);
        assert_eq!(profile.tier, RiskTier::T3Irreversible);

        // a lower escalate_to than the resolved default never lowers the tier
        let profile_workspace =
            classifier.classify("connector.slack.delete_message", Scope::Workspace, None);
        assert_eq!(profile_workspace.tier, RiskTier::T1Reversible);
    }

    #[test]
    fn pattern_escalation_matches_glob_target() {
        let mut config = config_with_default("connector.generic_rest.post", 1);
        config.risk_classification.scope_escalations.push(ScopeEscalation {
            capability: "connector.generic_rest.post".into(),
            scope: "nonexistent".into(),
            pattern: Some("https://payments.*".into()),
            escalate_to: 3,
            reason: "payment endpoint".into(),
        });
        let classifier = RiskClassifier::new(&config);
        let profile = classifier.classify(
            "connector.generic_rest.post",
            Scope::External,
            Some("https://payments.example.com/charge"),
        );
        assert_eq!(profile.tier, RiskTier::T3Irreversible);
    }

    #[test]
    fn soul_escalation_raises_and_records_reason() {
        let config = config_with_default("connector.slack.post_message", 1);
        let classifier = RiskClassifier::new(&config);
        classifier.update_soul(Some(SoulGovernance {
            escalations: vec![SoulEscalation {
                capability: "connector.slack.post_message".into(),
                scope: Some("external".into()),
                pattern: None,
                escalate_to: 2,
                reason: "pin_slack_to_t2".into(),
            }],
        }));
        let profile = classifier.classify("connector.slack.post_message", Scope::External, None);
        assert_eq!(profile.tier, RiskTier::T2Controlled);
        assert_eq!(profile.soul_escalation.as_deref(), Some("pin_slack_to_t2"));
    }

    #[test]
    fn trust_relaxation_lowers_graduated_capability() {
        let config = config_with_default("connector.slack.post_message", 2);
        let ledger = Arc::new(TrustLedger::new(1, true));
        ledger.register_default_tier("connector.slack.post_message", RiskTier::T2Controlled);
        ledger.record_success(&Capability::from("connector.slack.post_message"), Scope::External);

        let mut enabled_config = config.clone();
        enabled_config.trust_ledger.feature_flag_enabled = true;
        let classifier = RiskClassifier::new(&enabled_config).with_trust_ledger(ledger);

        let profile = classifier.classify("connector.slack.post_message", Scope::External, None);
        assert_eq!(profile.tier, RiskTier::T1Reversible);
    }

    #[test]
    fn soul_floor_is_not_undercut_by_trust() {
        let config = config_with_default("connector.slack.post_message", 1);
        let ledger = Arc::new(TrustLedger::new(1, true));
        ledger.register_default_tier("connector.slack.post_message", RiskTier::T1Reversible);
        ledger.record_success(&Capability::from("connector.slack.post_message"), Scope::External);

        let mut enabled_config = config.clone();
        enabled_config.trust_ledger.feature_flag_enabled = true;
        let classifier = RiskClassifier::new(&enabled_config).with_trust_ledger(ledger);
        classifier.update_soul(Some(SoulGovernance {
            escalations: vec![SoulEscalation {
                capability: "connector.slack.post_message".into(),
                scope: Some("external".into()),
                pattern: None,
                escalate_to: 2,
                reason: "pin_to_t2".into(),
            }],
        }));

        let profile = classifier.classify("connector.slack.post_message", Scope::External, None);
        assert_eq!(profile.tier, RiskTier::T2Controlled);
    }

    #[test]
    fn classify_step_delegates_to_classify() {
        let config = config_with_default("connector.slack.post_message", 0);
        let classifier = RiskClassifier::new(&config);
        let step = PlanStep {
            capability: "connector.slack.post_message",
            scope: Scope::Workspace,
            target: None,
        };
        assert_eq!(classifier.classify_step(&step).tier, RiskTier::T0Inert);
    }
}
