//! The connector trait every first-party and user-declared integration
//! implements. `execute` must be a pure function of its inputs: no
//! network calls, no clock reads, no vault access. The proxy is the
//! only thing that ever performs I/O with the result.

use cplane_core::{ConnectorManifest, ConnectorOperation, ConnectorResult, ConnectorStatus, ModelError};
use cplane_vault::CredentialVault;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};

fn status_to_u8(status: ConnectorStatus) -> u8 {
    match status {
        ConnectorStatus::Registered => 0,
        ConnectorStatus::Configured => 1,
        ConnectorStatus::Active => 2,
        ConnectorStatus::Suspended => 3,
        ConnectorStatus::Error => 4,
    }
}

fn status_from_u8(v: u8) -> ConnectorStatus {
    match v {
        0 => ConnectorStatus::Registered,
        1 => ConnectorStatus::Configured,
        2 => ConnectorStatus::Active,
        3 => ConnectorStatus::Suspended,
        _ => ConnectorStatus::Error,
    }
}

/// Shared connector state: the manifest and the lifecycle status cell.
/// Every connector embeds one of these and delegates `manifest`/
/// `status`/`set_status` to it.
pub struct ConnectorState {
    manifest: ConnectorManifest,
    status: AtomicU8,
}

impl ConnectorState {
    pub fn new(manifest: ConnectorManifest) -> Self {
        Self {
            manifest,
            status: AtomicU8::new(status_to_u8(ConnectorStatus::Registered)),
        }
    }

    pub fn manifest(&self) -> &ConnectorManifest {
        &self.manifest
    }

    pub fn status(&self) -> ConnectorStatus {
        status_from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn set_status(&self, status: ConnectorStatus) {
        self.status.store(status_to_u8(status), Ordering::SeqCst);
    }
}

/// An outbound integration: declares what it does ([`ConnectorManifest`]),
/// what it can do ([`Connector::get_operations`]), and how to turn an
/// operation invocation into a request spec ([`Connector::execute`]).
///
/// Connectors never make network calls. `execute` is a pure function
/// from `(operation_id, params)` plus the connector's own static
/// configuration to a [`ConnectorResult`] — the governed proxy performs
/// the actual HTTP.
pub trait Connector: Send + Sync {
    fn manifest(&self) -> &ConnectorManifest;

    fn status(&self) -> ConnectorStatus;

    fn set_status(&self, status: ConnectorStatus);

    fn get_operations(&self) -> Vec<ConnectorOperation>;

    fn execute(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<ConnectorResult, ModelError>;

    /// Whether this connector's required credentials are present in the
    /// vault. Connectors with no required credentials (echo) always
    /// return `true`.
    fn validate_credentials(&self, vault: &CredentialVault) -> bool;
}

/// Helper shared by connectors whose `validate_credentials` is "every
/// required credential spec exists in the vault" — the common case.
pub fn all_required_credentials_present(manifest: &ConnectorManifest, vault: &CredentialVault) -> bool {
    manifest
        .required_credentials
        .iter()
        .filter(|spec| spec.required)
        .all(|spec| vault.exists(&spec.vault_key))
}

/// Fetch a required string param, or an error naming the operation.
pub fn require_str<'a>(
    params: &'a HashMap<String, serde_json::Value>,
    operation_id: &str,
    name: &str,
) -> Result<&'a str, ModelError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ModelError::InvalidRequestSpec {
            operation_id: operation_id.to_string(),
            reason: format!("missing required parameter '{name}'"),
        })
}

pub fn opt_str<'a>(params: &'a HashMap<String, serde_json::Value>, name: &str) -> Option<&'a str> {
    params.get(name).and_then(|v| v.as_str())
}

pub fn opt_str_or<'a>(params: &'a HashMap<String, serde_json::Value>, name: &str, default: &'a str) -> &'a str {
    opt_str(params, name).unwrap_or(default)
}

pub fn opt_i64(params: &HashMap<String, serde_json::Value>, name: &str, default: i64) -> i64 {
    params.get(name).and_then(|v| v.as_i64()).unwrap_or(default)
}
