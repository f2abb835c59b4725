//! # cplane-governance
//!
//! Risk classification (C8), the trust ledger (C12), the policy engine
//! (C13), and receipt routing (§3) for the governed connector plane.
//! The governed proxy in `cplane-proxy` wires these together into the
//! execution pipeline.

pub mod policy;
pub mod receipt;
pub mod risk_classifier;
pub mod trust_ledger;

pub use policy::{PolicyEngine, PolicyIntent, RiskLevel, Verdict};
pub use receipt::{BatchReceiptBuffer, Receipt, ReceiptRouter, ReceiptStore};
pub use risk_classifier::{ActionRiskProfile, PlanStep, RiskClassifier, SoulEscalation, SoulGovernance};
pub use trust_ledger::TrustLedger;
