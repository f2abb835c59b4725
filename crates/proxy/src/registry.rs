//! Connector registry (C5): tracks every registered connector instance,
//! its manifest, and its lifecycle status. Loads a YAML catalog at
//! construction (global settings, rate limits, per-connector overrides);
//! a missing catalog file is not an error.

use chrono::{DateTime, Utc};
use cplane_config::CatalogConfig;
use cplane_connectors::Connector;
use cplane_core::{ConnectorManifest, ConnectorOperation, ConnectorStatus, RegistryError};
use std::collections::HashMap;
use std::sync::RwLock;

/// A registered connector plus its bookkeeping.
pub struct ConnectorEntry {
    pub connector: Box<dyn Connector>,
    pub registered_at: DateTime<Utc>,
}

impl ConnectorEntry {
    pub fn manifest(&self) -> &ConnectorManifest {
        self.connector.manifest()
    }
}

/// Holds every registered connector behind a single read-write lock —
/// per-connector granularity is not required (reads dominate writes).
pub struct ConnectorRegistry {
    catalog: CatalogConfig,
    entries: RwLock<HashMap<String, ConnectorEntry>>,
}

impl ConnectorRegistry {
    pub fn new(catalog: CatalogConfig) -> Self {
        Self {
            catalog,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &CatalogConfig {
        &self.catalog
    }

    /// Register a connector. Fails if the global connector feature is
    /// disabled, or if a connector with the same id is already present.
    pub fn register(&self, connector: Box<dyn Connector>) -> Result<(), RegistryError> {
        if !self.catalog.settings.connectors_enabled {
            return Err(RegistryError::FeatureDisabled);
        }
        let id = connector.manifest().id.clone();
        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(&id) {
            return Err(RegistryError::DuplicateConnector(id));
        }
        entries.insert(
            id,
            ConnectorEntry {
                connector,
                registered_at: Utc::now(),
            },
        );
        Ok(())
    }

    pub fn unregister(&self, connector_id: &str) -> bool {
        self.entries.write().unwrap().remove(connector_id).is_some()
    }

    pub fn list_connectors(&self) -> Vec<String> {
        self.entries.read().unwrap().keys().cloned().collect()
    }

    pub fn list_active(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|(_, entry)| entry.connector.status() == ConnectorStatus::Active)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn get_operations(&self, connector_id: &str) -> Result<Vec<ConnectorOperation>, RegistryError> {
        let entries = self.entries.read().unwrap();
        let entry = entries
            .get(connector_id)
            .ok_or_else(|| RegistryError::ConnectorNotFound(connector_id.to_string()))?;
        Ok(entry.connector.get_operations())
    }

    pub fn get_operation(
        &self,
        connector_id: &str,
        operation_id: &str,
    ) -> Result<ConnectorOperation, RegistryError> {
        let entries = self.entries.read().unwrap();
        let entry = entries
            .get(connector_id)
            .ok_or_else(|| RegistryError::ConnectorNotFound(connector_id.to_string()))?;
        entry
            .connector
            .get_operations()
            .into_iter()
            .find(|op| op.id == operation_id)
            .ok_or_else(|| RegistryError::OperationNotFound {
                connector_id: connector_id.to_string(),
                operation_id: operation_id.to_string(),
            })
    }

    pub fn update_status(&self, connector_id: &str, status: ConnectorStatus) -> Result<(), RegistryError> {
        let entries = self.entries.read().unwrap();
        let entry = entries
            .get(connector_id)
            .ok_or_else(|| RegistryError::ConnectorNotFound(connector_id.to_string()))?;
        entry.connector.set_status(status);
        Ok(())
    }

    /// Run `f` against a connector's manifest + operations while holding
    /// the read lock — used by the proxy so it never has to clone a
    /// trait object out of the registry.
    pub fn with_connector<R>(
        &self,
        connector_id: &str,
        f: impl FnOnce(&dyn Connector) -> R,
    ) -> Result<R, RegistryError> {
        let entries = self.entries.read().unwrap();
        let entry = entries
            .get(connector_id)
            .ok_or_else(|| RegistryError::ConnectorNotFound(connector_id.to_string()))?;
        Ok(f(entry.connector.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cplane_connectors::EchoConnector;

    #[test]
    fn register_then_get_operations() {
        let registry = ConnectorRegistry::new(CatalogConfig::default());
        registry.register(Box::new(EchoConnector::new())).unwrap();
        let ops = registry.get_operations("echo").unwrap();
        assert!(ops.iter().any(|op| op.id == "get_anything"));
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = ConnectorRegistry::new(CatalogConfig::default());
        registry.register(Box::new(EchoConnector::new())).unwrap();
        let err = registry.register(Box::new(EchoConnector::new())).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateConnector(id) if id == "echo"));
    }

    #[test]
    fn registration_refused_when_feature_disabled() {
        let mut catalog = CatalogConfig::default();
        catalog.settings.connectors_enabled = false;
        let registry = ConnectorRegistry::new(catalog);
        let err = registry.register(Box::new(EchoConnector::new())).unwrap_err();
        assert!(matches!(err, RegistryError::FeatureDisabled));
    }

    #[test]
    fn unknown_connector_errors_on_lookup() {
        let registry = ConnectorRegistry::new(CatalogConfig::default());
        let err = registry.get_operations("nope").unwrap_err();
        assert!(matches!(err, RegistryError::ConnectorNotFound(id) if id == "nope"));
    }

    #[test]
    fn list_active_filters_by_status() {
        let registry = ConnectorRegistry::new(CatalogConfig::default());
        registry.register(Box::new(EchoConnector::new())).unwrap();
        assert!(registry.list_active().is_empty());
        registry.update_status("echo", ConnectorStatus::Active).unwrap();
        assert_eq!(registry.list_active(), vec!["echo".to_string()]);
    }

    #[test]
    fn unregister_removes_entry() {
        let registry = ConnectorRegistry::new(CatalogConfig::default());
        registry.register(Box::new(EchoConnector::new())).unwrap();
        assert!(registry.unregister("echo"));
        assert!(!registry.unregister("echo"));
        assert!(registry.get_operations("echo").is_err());
    }
}
