//! Policy engine (C13): the optional collaborator consulted by the
//! governed proxy before dispatch. Rule-based: `{capability_pattern,
//! max_risk_level, action}` evaluated in order, first match wins,
//! default allow.

use cplane_config::{GovernanceConfig, PolicyRuleConfig};
use cplane_core::RiskTier;
use globset::{Glob, GlobMatcher};

/// Coarse risk band used for policy matching: T0/T1 -> low, T2 ->
/// medium, T3 -> high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_tier(tier: RiskTier) -> Self {
        match tier {
            RiskTier::T0Inert | RiskTier::T1Reversible => Self::Low,
            RiskTier::T2Controlled => Self::Medium,
            RiskTier::T3Irreversible => Self::High,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// A policy intent submitted by the governed proxy before dispatch.
#[derive(Debug, Clone)]
pub struct PolicyIntent {
    pub capability: String,
    pub risk_level: RiskLevel,
}

/// The engine's decision. Reasons name rules and capabilities only —
/// they must never carry secret material.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub allowed: bool,
    pub reasons: Vec<String>,
}

impl Verdict {
    fn allow() -> Self {
        Self {
            allowed: true,
            reasons: Vec::new(),
        }
    }
}

struct CompiledRule {
    pattern: String,
    matcher: GlobMatcher,
    max_risk_level: RiskLevel,
    action: String,
}

/// Rule-based policy evaluator.
///
/// A rule applies to an intent when the capability matches its glob
/// pattern *and* the intent's risk level is at or below the rule's
/// `max_risk_level` — the field names the ceiling the rule governs, not
/// a trigger threshold. The first applicable rule's action wins;
/// falling off the end of the list (or having no rules configured)
/// allows the action.
pub struct PolicyEngine {
    rules: Vec<CompiledRule>,
}

impl PolicyEngine {
    pub fn from_config(config: &GovernanceConfig) -> Self {
        let rules = config
            .policy
            .as_ref()
            .map(|p| p.rules.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(Self::compile_rule)
            .collect();
        Self { rules }
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    fn compile_rule(rule: &PolicyRuleConfig) -> Option<CompiledRule> {
        let matcher = Glob::new(&rule.capability_pattern).ok()?.compile_matcher();
        let max_risk_level = RiskLevel::parse(&rule.max_risk_level)?;
        Some(CompiledRule {
            pattern: rule.capability_pattern.clone(),
            matcher,
            max_risk_level,
            action: rule.action.clone(),
        })
    }

    pub fn evaluate(&self, intent: &PolicyIntent) -> Verdict {
        for rule in &self.rules {
            if !rule.matcher.is_match(&intent.capability) {
                continue;
            }
            if intent.risk_level > rule.max_risk_level {
                continue;
            }
            return match rule.action.as_str() {
                "deny" => Verdict {
                    allowed: false,
                    reasons: vec![format!(
                        "policy rule '{}' denies '{}' at risk level {}",
                        rule.pattern,
                        intent.capability,
                        intent.risk_level.label()
                    )],
                },
                _ => Verdict::allow(),
            };
        }
        Verdict::allow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cplane_config::{GovernanceConfig, PolicyRuleConfig, PolicySection};

    fn intent(capability: &str, level: RiskLevel) -> PolicyIntent {
        PolicyIntent {
            capability: capability.to_string(),
            risk_level: level,
        }
    }

    #[test]
    fn no_rules_defaults_to_allow() {
        let engine = PolicyEngine::from_config(&GovernanceConfig::default());
        let verdict = engine.evaluate(&intent("connector.slack.post_message", RiskLevel::High));
        assert!(verdict.allowed);
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn matching_deny_rule_blocks_and_explains() {
        let mut config = GovernanceConfig::default();
        config.policy = Some(PolicySection {
            rules: vec![PolicyRuleConfig {
                capability_pattern: "connector.slack.*".into(),
                max_risk_level: "high".into(),
                action: "deny".into(),
            }],
        });
        let engine = PolicyEngine::from_config(&config);
        let verdict = engine.evaluate(&intent("connector.slack.delete_message", RiskLevel::High));
        assert!(!verdict.allowed);
        assert_eq!(verdict.reasons.len(), 1);
        assert!(verdict.reasons[0].contains("connector.slack.delete_message"));
    }

    #[test]
    fn rule_with_lower_ceiling_does_not_apply_to_higher_risk() {
        let mut config = GovernanceConfig::default();
        config.policy = Some(PolicySection {
            rules: vec![PolicyRuleConfig {
                capability_pattern: "connector.slack.*".into(),
                max_risk_level: "low".into(),
                action: "deny".into(),
            }],
        });
        let engine = PolicyEngine::from_config(&config);
        let verdict = engine.evaluate(&intent("connector.slack.post_message", RiskLevel::High));
        assert!(verdict.allowed);
    }

    #[test]
    fn non_matching_pattern_falls_through_to_default_allow() {
        let mut config = GovernanceConfig::default();
        config.policy = Some(PolicySection {
            rules: vec![PolicyRuleConfig {
                capability_pattern: "connector.discord.*".into(),
                max_risk_level: "high".into(),
                action: "deny".into(),
            }],
        });
        let engine = PolicyEngine::from_config(&config);
        let verdict = engine.evaluate(&intent("connector.slack.post_message", RiskLevel::High));
        assert!(verdict.allowed);
    }

    #[test]
    fn first_match_wins_over_later_rules() {
        let mut config = GovernanceConfig::default();
        config.policy = Some(PolicySection {
            rules: vec![
                PolicyRuleConfig {
                    capability_pattern: "connector.slack.*".into(),
                    max_risk_level: "high".into(),
                    action: "allow".into(),
                },
                PolicyRuleConfig {
                    capability_pattern: "connector.slack.*".into(),
                    max_risk_level: "high".into(),
                    action: "deny".into(),
                },
            ],
        });
        let engine = PolicyEngine::from_config(&config);
        let verdict = engine.evaluate(&intent("connector.slack.post_message", RiskLevel::Medium));
        assert!(verdict.allowed);
    }

    #[test]
    fn risk_level_from_tier_mapping() {
        assert_eq!(RiskLevel::from_tier(RiskTier::T0Inert), RiskLevel::Low);
        assert_eq!(RiskLevel::from_tier(RiskTier::T1Reversible), RiskLevel::Low);
        assert_eq!(RiskLevel::from_tier(RiskTier::T2Controlled), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_tier(RiskTier::T3Irreversible), RiskLevel::High);
    }
}
