//! Risk tier — the ordered classification every governed action carries.

use serde::{Deserialize, Serialize};

/// Ordered risk classification. Higher variants are more dangerous.
///
/// Declaration order doubles as rank order: `T0_INERT < T1_REVERSIBLE
/// < T2_CONTROLLED < T3_IRREVERSIBLE`. Never reorder these variants —
/// derived `Ord` depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RiskTier {
    #[serde(rename = "T0_INERT")]
    T0Inert = 0,
    #[serde(rename = "T1_REVERSIBLE")]
    T1Reversible = 1,
    #[serde(rename = "T2_CONTROLLED")]
    T2Controlled = 2,
    #[serde(rename = "T3_IRREVERSIBLE")]
    T3Irreversible = 3,
}

impl RiskTier {
    /// The numeric rank, 0..3.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Build a tier from its numeric rank, clamping to T3 if out of range.
    pub fn from_rank(rank: i64) -> Self {
        match rank {
            0 => Self::T0Inert,
            1 => Self::T1Reversible,
            2 => Self::T2Controlled,
            _ => Self::T3Irreversible,
        }
    }

    /// One rank below this tier, floored at T0. Used by the trust ledger,
    /// which may only lower a tier, never raise it.
    pub fn lowered(self) -> Self {
        Self::from_rank(self.rank() as i64 - 1)
    }

    /// True for T0/T1 — a rolled-back or undoable action.
    pub fn is_reversible_tier(self) -> bool {
        self <= Self::T1Reversible
    }

    /// The stable wire name, e.g. for receipts.
    pub fn name(self) -> &'static str {
        match self {
            Self::T0Inert => "T0_INERT",
            Self::T1Reversible => "T1_REVERSIBLE",
            Self::T2Controlled => "T2_CONTROLLED",
            Self::T3Irreversible => "T3_IRREVERSIBLE",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_by_declaration() {
        assert!(RiskTier::T0Inert < RiskTier::T1Reversible);
        assert!(RiskTier::T1Reversible < RiskTier::T2Controlled);
        assert!(RiskTier::T2Controlled < RiskTier::T3Irreversible);
    }

    #[test]
    fn lowered_floors_at_t0() {
        assert_eq!(RiskTier::T0Inert.lowered(), RiskTier::T0Inert);
        assert_eq!(RiskTier::T1Reversible.lowered(), RiskTier::T0Inert);
    }

    #[test]
    fn from_rank_clamps_unknown_to_t3() {
        assert_eq!(RiskTier::from_rank(99), RiskTier::T3Irreversible);
    }

    #[test]
    fn reversible_tier_flag() {
        assert!(RiskTier::T1Reversible.is_reversible_tier());
        assert!(!RiskTier::T2Controlled.is_reversible_tier());
    }

    #[test]
    fn serde_roundtrip_uses_tier_name() {
        let json = serde_json::to_string(&RiskTier::T2Controlled).unwrap();
        assert_eq!(json, "\"T2_CONTROLLED\"");
        let back: RiskTier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RiskTier::T2Controlled);
    }
}
