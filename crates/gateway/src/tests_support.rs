//! Shared test fixtures for gateway handler/router tests.

use crate::{GatewayState, SharedState};
use cplane_config::{CatalogConfig, VaultAuditSection, VaultConfig, VaultEncryptionSection, VaultStorageSection};
use cplane_connectors::Connector;
use cplane_proxy::ConnectorRegistry;
use cplane_vault::CredentialVault;
use std::sync::Arc;

/// `dir` must outlive the returned state — callers hold the `TempDir`
/// for the duration of the test.
pub fn test_state(connectors: Vec<Box<dyn Connector>>, dir: &std::path::Path) -> SharedState {
    let registry = Arc::new(ConnectorRegistry::new(CatalogConfig::default()));
    for connector in connectors {
        registry.register(connector).expect("test connector registration");
    }

    let vault = Arc::new(CredentialVault::new(&VaultConfig {
        storage: VaultStorageSection {
            path: dir.join("vault.db"),
            backup_path: dir.join("vault.db.bak"),
        },
        encryption: VaultEncryptionSection {
            key_env_var: "CPLANE_TEST_GATEWAY_KEY_UNUSED".into(),
        },
        audit: VaultAuditSection {
            log_access: false,
            log_path: dir.join("audit.log"),
        },
    }));

    Arc::new(GatewayState {
        registry,
        vault,
        bearer_token: Some("test-token".to_string()),
    })
}
