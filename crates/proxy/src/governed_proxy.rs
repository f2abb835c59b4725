//! Governed proxy (C9): the orchestration wrapper that puts every other
//! component in this crate behind one governed entry point — risk
//! classification, optional policy evaluation, dispatch through the
//! proxy, trust-ledger feedback, and receipt emission.

use crate::proxy::ConnectorProxy;
use crate::registry::ConnectorRegistry;
use cplane_core::{Capability, ConnectorResponse, ResponseBody, RiskTier, Scope};
use cplane_governance::policy::{PolicyEngine, PolicyIntent, RiskLevel};
use cplane_governance::receipt::{Receipt, ReceiptRouter};
use cplane_governance::risk_classifier::RiskClassifier;
use cplane_governance::trust_ledger::TrustLedger;
use std::collections::HashMap;
use std::sync::Arc;

const EXTERNAL_SCOPE: Scope = Scope::External;

pub struct GovernedConnectorProxy {
    registry: Arc<ConnectorRegistry>,
    proxy: Arc<ConnectorProxy>,
    classifier: Arc<RiskClassifier>,
    policy_engine: Option<Arc<PolicyEngine>>,
    receipts: Arc<ReceiptRouter>,
    trust_ledger: Option<Arc<TrustLedger>>,
}

impl GovernedConnectorProxy {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        proxy: Arc<ConnectorProxy>,
        classifier: Arc<RiskClassifier>,
        receipts: Arc<ReceiptRouter>,
    ) -> Self {
        Self {
            registry,
            proxy,
            classifier,
            policy_engine: None,
            receipts,
            trust_ledger: None,
        }
    }

    pub fn with_policy_engine(mut self, engine: Arc<PolicyEngine>) -> Self {
        self.policy_engine = Some(engine);
        self
    }

    pub fn with_trust_ledger(mut self, ledger: Arc<TrustLedger>) -> Self {
        self.trust_ledger = Some(ledger);
        self
    }

    /// Copy every operation's `default_tier` into the classifier's
    /// defaults table, keyed by `full_capability_id`.
    pub fn register_connector_tiers(&self, connector_id: &str) -> Result<(), String> {
        let operations = self
            .registry
            .get_operations(connector_id)
            .map_err(|e| e.to_string())?;
        for operation in operations {
            self.classifier
                .register_default_tier(&operation.full_capability_id(), operation.default_tier);
        }
        Ok(())
    }

    pub fn get_operation_tier(&self, connector_id: &str, operation_id: &str) -> RiskTier {
        let capability = Capability::for_operation(connector_id, operation_id);
        self.classifier.default_tier_for(capability.as_str())
    }

    pub async fn execute_governed(
        &self,
        connector_id: &str,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> ConnectorResponse {
        let operation = match self.registry.get_operation(connector_id, operation_id) {
            Ok(op) => op,
            Err(e) => return error_response(connector_id, operation_id, e.to_string()),
        };

        let capability_id = operation.full_capability_id();
        let profile = self.classifier.classify(&capability_id, EXTERNAL_SCOPE, None);

        if let Some(policy_engine) = &self.policy_engine {
            let intent = PolicyIntent {
                capability: capability_id.clone(),
                risk_level: RiskLevel::from_tier(profile.tier),
            };
            let verdict = policy_engine.evaluate(&intent);
            if !verdict.allowed {
                return error_response(
                    connector_id,
                    operation_id,
                    format!("denied by policy: {}", verdict.reasons.join("; ")),
                );
            }
        }

        let connector_result = match self
            .registry
            .with_connector(connector_id, |c| c.execute(operation_id, params))
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => return error_response(connector_id, operation_id, e.to_string()),
            Err(e) => return error_response(connector_id, operation_id, e.to_string()),
        };

        let mut response = self.proxy.execute(connector_result).await;

        let capability = Capability::from(capability_id.clone());
        if let Some(ledger) = &self.trust_ledger {
            if response.success {
                ledger.record_success(&capability, EXTERNAL_SCOPE);
            } else {
                ledger.record_failure(&capability, EXTERNAL_SCOPE);
            }
        }

        let receipt = Receipt::new(
            connector_id,
            operation_id,
            &capability_id,
            profile.tier,
            response.status_code,
            response.success,
        );
        response.receipt_id = receipt.receipt_id.clone();
        self.receipts.route(receipt);

        response
    }

    /// Records a rollback event in the trust ledger for the capability
    /// behind `connector_id`/`operation_id`.
    pub fn handle_rollback(&self, connector_id: &str, operation_id: &str, scope: Scope) {
        let Some(ledger) = &self.trust_ledger else { return };
        let Ok(operation) = self.registry.get_operation(connector_id, operation_id) else {
            return;
        };
        let capability = Capability::from(operation.full_capability_id());
        ledger.handle_rollback(&capability, scope);
    }
}

fn error_response(connector_id: &str, operation_id: &str, error: String) -> ConnectorResponse {
    ConnectorResponse {
        operation_id: operation_id.to_string(),
        connector_id: connector_id.to_string(),
        status_code: 0,
        headers: HashMap::new(),
        body: ResponseBody::Empty,
        elapsed_ms: 0.0,
        success: false,
        error,
        receipt_id: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cplane_config::{CatalogConfig, GovernanceConfig, VaultAuditSection, VaultConfig, VaultEncryptionSection, VaultStorageSection};
    use cplane_connectors::EchoConnector;
    use cplane_vault::CredentialVault;

    fn test_vault(dir: &std::path::Path) -> Arc<CredentialVault> {
        Arc::new(CredentialVault::new(&VaultConfig {
            storage: VaultStorageSection {
                path: dir.join("vault.db"),
                backup_path: dir.join("vault.db.bak"),
            },
            encryption: VaultEncryptionSection {
                key_env_var: "CPLANE_TEST_GOVERNED_PROXY_KEY_UNUSED".into(),
            },
            audit: VaultAuditSection {
                log_access: false,
                log_path: dir.join("audit.log"),
            },
        }))
    }

    #[tokio::test]
    async fn unknown_connector_returns_error_response_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ConnectorRegistry::new(CatalogConfig::default()));
        let vault = test_vault(dir.path());
        let proxy = Arc::new(ConnectorProxy::new(registry.clone(), vault));
        let classifier = Arc::new(RiskClassifier::new(&GovernanceConfig::default()));
        let receipts = Arc::new(ReceiptRouter::new(10));
        let governed = GovernedConnectorProxy::new(registry, proxy, classifier, receipts);

        let response = governed.execute_governed("nope", "op", &HashMap::new()).await;
        assert!(!response.success);
        assert_eq!(response.status_code, 0);
    }

    #[tokio::test]
    async fn register_connector_tiers_seeds_classifier_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ConnectorRegistry::new(CatalogConfig::default()));
        registry.register(Box::new(EchoConnector::new())).unwrap();
        let vault = test_vault(dir.path());
        let proxy = Arc::new(ConnectorProxy::new(registry.clone(), vault));
        let classifier = Arc::new(RiskClassifier::new(&GovernanceConfig::default()));
        let receipts = Arc::new(ReceiptRouter::new(10));
        let governed = GovernedConnectorProxy::new(registry, proxy, classifier, receipts);

        governed.register_connector_tiers("echo").unwrap();
        assert_eq!(governed.get_operation_tier("echo", "get_anything"), RiskTier::T0Inert);
    }
}
