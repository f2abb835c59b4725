//! Shared connector domain model: manifests, credential declarations,
//! operations, and the request/response types that flow between a
//! connector's pure `execute()` and the proxy's real I/O.
//!
//! Lives in `cplane-core` (rather than the connectors crate) because the
//! vault, the connectors, the governance classifier, and the proxy all
//! need these same types without forming a dependency cycle.

use crate::risk::RiskTier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle status of a connector instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorStatus {
    Registered,
    Configured,
    Active,
    Suspended,
    Error,
}

/// A credential a connector requires, and where in the vault it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub vault_key: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub scopes: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Trust level of a connector's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectorSource {
    FirstParty,
    Community,
    User,
}

/// Immutable declaration of what a connector does and needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    pub author: String,
    pub source: ConnectorSource,
    #[serde(default)]
    pub description: String,
    pub target_domains: Vec<String>,
    #[serde(default)]
    pub required_credentials: Vec<CredentialSpec>,
    #[serde(default)]
    pub data_reads: Vec<String>,
    #[serde(default)]
    pub data_writes: Vec<String>,
    #[serde(default)]
    pub does_not_access: Vec<String>,
}

impl ConnectorManifest {
    pub fn validate(&self) -> Result<(), crate::ModelError> {
        if self.id.is_empty() {
            return Err(crate::ModelError::InvalidManifest {
                id: self.id.clone(),
                reason: "id must not be empty".into(),
            });
        }
        if self.name.is_empty() {
            return Err(crate::ModelError::InvalidManifest {
                id: self.id.clone(),
                reason: "name must not be empty".into(),
            });
        }
        if self.version.is_empty() {
            return Err(crate::ModelError::InvalidManifest {
                id: self.id.clone(),
                reason: "version must not be empty".into(),
            });
        }
        if self.target_domains.is_empty() {
            return Err(crate::ModelError::InvalidManifest {
                id: self.id.clone(),
                reason: "target_domains must not be empty — connectors must declare where they talk".into(),
            });
        }
        Ok(())
    }
}

/// The capability class an operation exercises, used by governance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityClass {
    Read,
    Write,
    Delete,
}

/// Specification for a parameter accepted by a connector operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// Declaration of a single operation a connector supports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorOperation {
    pub id: String,
    pub connector_id: String,
    pub capability: CapabilityClass,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub default_tier: RiskTier,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub idempotent: bool,
    #[serde(default)]
    pub reversible: bool,
    #[serde(default)]
    pub rollback_operation_id: String,
}

impl ConnectorOperation {
    /// `connector.{connector_id}.{id}` — see [`crate::Capability::for_operation`].
    pub fn full_capability_id(&self) -> String {
        crate::Capability::for_operation(&self.connector_id, &self.id).0
    }

    pub fn validate(&self) -> Result<(), crate::ModelError> {
        if self.id.is_empty() {
            return Err(crate::ModelError::InvalidOperation {
                connector_id: self.connector_id.clone(),
                operation_id: self.id.clone(),
                reason: "id must not be empty".into(),
            });
        }
        if self.connector_id.is_empty() {
            return Err(crate::ModelError::InvalidOperation {
                connector_id: self.connector_id.clone(),
                operation_id: self.id.clone(),
                reason: "connector_id must not be empty".into(),
            });
        }
        Ok(())
    }
}

/// HTTP method for a request spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// The body of a request spec — a tagged sum type replacing the
/// source's duck-typed `Any` body so the proxy can dispatch on shape
/// without inspecting runtime type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(String),
    Protocol(serde_json::Value),
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// HTTP request specification produced by a connector's `execute()`.
///
/// NOT the HTTP response — the request that the proxy will send through
/// the governance pipeline and then execute. Connectors must never
/// perform I/O when building one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorResult {
    pub operation_id: String,
    pub connector_id: String,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: RequestBody,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    #[serde(default)]
    pub credential_vault_key: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::Empty
    }
}

fn default_timeout() -> u32 {
    30
}

impl ConnectorResult {
    pub fn validate(&self) -> Result<(), crate::ModelError> {
        if self.url.is_empty() {
            return Err(crate::ModelError::InvalidRequestSpec {
                operation_id: self.operation_id.clone(),
                reason: "url must not be empty".into(),
            });
        }
        if !(self.url.starts_with("https://") || self.url.starts_with("protocol://")) {
            return Err(crate::ModelError::InvalidRequestSpec {
                operation_id: self.operation_id.clone(),
                reason: "url must begin with https:// or protocol://".into(),
            });
        }
        if matches!(self.method, HttpMethod::Get | HttpMethod::Delete) && !self.body.is_empty() {
            return Err(crate::ModelError::InvalidRequestSpec {
                operation_id: self.operation_id.clone(),
                reason: format!("body must be empty for {:?} requests", self.method),
            });
        }
        if self.timeout_seconds == 0 {
            return Err(crate::ModelError::InvalidRequestSpec {
                operation_id: self.operation_id.clone(),
                reason: "timeout_seconds must be > 0".into(),
            });
        }
        Ok(())
    }
}

/// The response body — `Text` covers non-JSON payloads (e.g. IMAP/SMTP
/// acknowledgements) that the source would have returned as a raw string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
    Empty,
}

/// Response after the proxy executes a [`ConnectorResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorResponse {
    pub operation_id: String,
    pub connector_id: String,
    pub status_code: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: ResponseBody,
    #[serde(default)]
    pub elapsed_ms: f64,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub receipt_id: String,
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::Empty
    }
}

impl ConnectorResponse {
    pub fn is_error(&self) -> bool {
        !self.success || self.status_code >= 400
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_manifest() -> ConnectorManifest {
        ConnectorManifest {
            id: "slack".into(),
            name: "Slack".into(),
            version: "1.0.0".into(),
            author: "acme".into(),
            source: ConnectorSource::FirstParty,
            description: String::new(),
            target_domains: vec!["slack.com".into()],
            required_credentials: vec![],
            data_reads: vec![],
            data_writes: vec![],
            does_not_access: vec![],
        }
    }

    #[test]
    fn manifest_without_target_domains_is_invalid() {
        let mut m = sample_manifest();
        m.target_domains.clear();
        assert!(m.validate().is_err());
    }

    #[test]
    fn full_capability_id_matches_convention() {
        let op = ConnectorOperation {
            id: "post_message".into(),
            connector_id: "slack".into(),
            capability: CapabilityClass::Write,
            name: "Post message".into(),
            description: String::new(),
            default_tier: RiskTier::T2Controlled,
            parameters: vec![],
            idempotent: false,
            reversible: true,
            rollback_operation_id: "delete_message".into(),
        };
        assert_eq!(op.full_capability_id(), "connector.slack.post_message");
    }

    #[test]
    fn get_request_with_body_is_invalid() {
        let result = ConnectorResult {
            operation_id: "list".into(),
            connector_id: "slack".into(),
            method: HttpMethod::Get,
            url: "https://slack.com/api/list".into(),
            headers: HashMap::new(),
            body: RequestBody::Json(serde_json::json!({"a": 1})),
            timeout_seconds: 30,
            credential_vault_key: String::new(),
            metadata: HashMap::new(),
        };
        assert!(result.validate().is_err());
    }

    #[test]
    fn protocol_url_is_valid_without_https() {
        let result = ConnectorResult {
            operation_id: "send".into(),
            connector_id: "email".into(),
            method: HttpMethod::Post,
            url: "protocol://smtp".into(),
            headers: HashMap::new(),
            body: RequestBody::Protocol(serde_json::json!({"protocol": "smtp"})),
            timeout_seconds: 30,
            credential_vault_key: String::new(),
            metadata: HashMap::new(),
        };
        assert!(result.validate().is_ok());
    }

    #[test]
    fn plain_http_url_is_rejected() {
        let result = ConnectorResult {
            operation_id: "x".into(),
            connector_id: "x".into(),
            method: HttpMethod::Post,
            url: "http://example.com".into(),
            headers: HashMap::new(),
            body: RequestBody::Empty,
            timeout_seconds: 30,
            credential_vault_key: String::new(),
            metadata: HashMap::new(),
        };
        assert!(result.validate().is_err());
    }

    #[test]
    fn response_is_error_on_4xx_even_if_success_true() {
        let response = ConnectorResponse {
            operation_id: "x".into(),
            connector_id: "x".into(),
            status_code: 404,
            headers: HashMap::new(),
            body: ResponseBody::Empty,
            elapsed_ms: 1.0,
            success: true,
            error: String::new(),
            receipt_id: String::new(),
        };
        assert!(response.is_error());
    }
}
