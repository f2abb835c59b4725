//! Shared pipeline assembly: every subcommand needs the same four
//! config documents and the same registry/vault/governed-proxy wiring,
//! so it lives here once instead of being rebuilt per command.

use cplane_config::{CatalogConfig, GovernanceConfig, ServiceConfig, VaultConfig};
use cplane_core::ConnectorStatus;
use cplane_governance::{PolicyEngine, ReceiptRouter, RiskClassifier, TrustLedger};
use cplane_proxy::{ConnectorProxy, ConnectorRegistry, GovernedConnectorProxy};
use cplane_ratelimit::RateLimiterRegistry;
use cplane_vault::CredentialVault;
use std::path::Path;
use std::sync::Arc;

pub struct PlaneContext {
    pub service: ServiceConfig,
    pub registry: Arc<ConnectorRegistry>,
    pub vault: Arc<CredentialVault>,
    pub governed_proxy: Arc<GovernedConnectorProxy>,
}

impl PlaneContext {
    /// Load every config document the plane needs, build the vault and
    /// registry, register the account-agnostic first-party connectors,
    /// and assemble the governed proxy on top of them.
    ///
    /// Account-scoped connectors (email, SMS, WhatsApp, user-declared
    /// REST) need per-tenant construction parameters this local CLI has
    /// no source for, so only `first_party_connectors()` is registered
    /// here.
    pub fn load(service_config_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let service = ServiceConfig::load_from(service_config_path)?;
        let governance = GovernanceConfig::load_from(&service.config.governance_path)?;
        let catalog = CatalogConfig::load_from(&service.config.catalog_path)?;
        let vault_config = VaultConfig::load_from(&service.config.vault_config_path)?;

        let vault = Arc::new(CredentialVault::new(&vault_config));
        let registry = Arc::new(ConnectorRegistry::new(catalog));

        for connector in cplane_connectors::first_party_connectors() {
            let id = connector.manifest().id.clone();
            registry.register(connector)?;
            // The core never auto-transitions connector status; this CLI
            // is the control plane that does, so a freshly registered
            // first-party connector goes straight to active.
            registry.update_status(&id, ConnectorStatus::Active)?;
        }

        let classifier = Arc::new(RiskClassifier::new(&governance));
        let receipts = Arc::new(ReceiptRouter::new(governance.batch_receipts.buffer_size));
        let proxy = Arc::new(
            ConnectorProxy::new(registry.clone(), vault.clone())
                .with_rate_limiters(Arc::new(RateLimiterRegistry::from_catalog(registry.catalog()))),
        );

        let mut governed_proxy =
            GovernedConnectorProxy::new(registry.clone(), proxy, classifier, receipts)
                .with_policy_engine(Arc::new(PolicyEngine::from_config(&governance)));

        if governance.trust_ledger.enabled {
            governed_proxy = governed_proxy.with_trust_ledger(Arc::new(TrustLedger::new(
                governance.trust_ledger.graduation_threshold,
                governance.trust_ledger.enabled,
            )));
        }

        for connector_id in registry.list_connectors() {
            if let Err(e) = governed_proxy.register_connector_tiers(&connector_id) {
                tracing::warn!(connector_id, error = %e, "failed to register connector risk tiers");
            }
        }

        Ok(Self {
            service,
            registry,
            vault,
            governed_proxy: Arc::new(governed_proxy),
        })
    }
}
