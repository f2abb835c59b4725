//! Echo test connector targeting httpbin.org. No credentials — used
//! to exercise the governance and proxy pipeline end to end.

use crate::base::{opt_i64, Connector, ConnectorState};
use cplane_core::{
    CapabilityClass, ConnectorManifest, ConnectorOperation, ConnectorResult, ConnectorSource,
    ConnectorStatus, HttpMethod, ModelError, ParameterSpec, RequestBody, RiskTier,
};
use cplane_vault::CredentialVault;
use serde_json::json;
use std::collections::HashMap;

pub struct EchoConnector {
    state: ConnectorState,
}

impl EchoConnector {
    pub fn new() -> Self {
        let manifest = ConnectorManifest {
            id: "echo".into(),
            name: "Echo Test Connector".into(),
            version: "1.0.0".into(),
            author: "lancelot".into(),
            source: ConnectorSource::FirstParty,
            description: "Integration test connector — echoes requests via httpbin.org".into(),
            target_domains: vec!["httpbin.org".into()],
            required_credentials: vec![],
            data_reads: vec![],
            data_writes: vec![],
            does_not_access: vec![],
        };
        Self {
            state: ConnectorState::new(manifest),
        }
    }
}

impl Default for EchoConnector {
    fn default() -> Self {
        Self::new()
    }
}

fn op(
    id: &str,
    capability: CapabilityClass,
    name: &str,
    description: &str,
    default_tier: RiskTier,
    idempotent: bool,
    parameters: Vec<ParameterSpec>,
) -> ConnectorOperation {
    ConnectorOperation {
        id: id.into(),
        connector_id: "echo".into(),
        capability,
        name: name.into(),
        description: description.into(),
        default_tier,
        parameters,
        idempotent,
        reversible: false,
        rollback_operation_id: String::new(),
    }
}

impl Connector for EchoConnector {
    fn manifest(&self) -> &ConnectorManifest {
        self.state.manifest()
    }

    fn status(&self) -> ConnectorStatus {
        self.state.status()
    }

    fn set_status(&self, status: ConnectorStatus) {
        self.state.set_status(status);
    }

    fn get_operations(&self) -> Vec<ConnectorOperation> {
        vec![
            op(
                "get_anything",
                CapabilityClass::Read,
                "Get Anything",
                "Echo back any request data",
                RiskTier::T0Inert,
                true,
                vec![],
            ),
            op(
                "post_data",
                CapabilityClass::Write,
                "Post Data",
                "Post data and get echo response",
                RiskTier::T2Controlled,
                false,
                vec![ParameterSpec {
                    name: "data".into(),
                    param_type: "dict".into(),
                    required: false,
                    description: String::new(),
                    default: None,
                }],
            ),
            op(
                "get_status",
                CapabilityClass::Read,
                "Get Status",
                "Get specific HTTP status code response",
                RiskTier::T0Inert,
                true,
                vec![ParameterSpec {
                    name: "code".into(),
                    param_type: "int".into(),
                    required: true,
                    description: String::new(),
                    default: Some(json!(200)),
                }],
            ),
        ]
    }

    fn execute(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<ConnectorResult, ModelError> {
        let result = match operation_id {
            "get_anything" => ConnectorResult {
                operation_id: operation_id.into(),
                connector_id: "echo".into(),
                method: HttpMethod::Get,
                url: "https://httpbin.org/anything".into(),
                headers: HashMap::new(),
                body: RequestBody::Empty,
                timeout_seconds: 30,
                credential_vault_key: String::new(),
                metadata: HashMap::new(),
            },
            "post_data" => {
                let data = params.get("data").cloned().unwrap_or_else(|| json!({}));
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "echo".into(),
                    method: HttpMethod::Post,
                    url: "https://httpbin.org/post".into(),
                    headers: HashMap::new(),
                    body: RequestBody::Json(data),
                    timeout_seconds: 30,
                    credential_vault_key: String::new(),
                    metadata: HashMap::new(),
                }
            }
            "get_status" => {
                let code = opt_i64(params, "code", 200);
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "echo".into(),
                    method: HttpMethod::Get,
                    url: format!("https://httpbin.org/status/{code}"),
                    headers: HashMap::new(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: String::new(),
                    metadata: HashMap::new(),
                }
            }
            other => {
                return Err(ModelError::InvalidOperation {
                    connector_id: "echo".into(),
                    operation_id: other.into(),
                    reason: "unknown operation".into(),
                })
            }
        };
        Ok(result)
    }

    fn validate_credentials(&self, _vault: &CredentialVault) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn requires_no_credentials() {
        let connector = EchoConnector::new();
        assert!(connector.manifest().required_credentials.is_empty());
    }

    #[test]
    fn get_status_defaults_code_to_200() {
        let connector = EchoConnector::new();
        let result = connector.execute("get_status", &params(&[])).unwrap();
        assert_eq!(result.url, "https://httpbin.org/status/200");
    }

    #[test]
    fn post_data_defaults_to_empty_object() {
        let connector = EchoConnector::new();
        let result = connector.execute("post_data", &params(&[])).unwrap();
        match result.body {
            RequestBody::Json(v) => assert_eq!(v, json!({})),
            _ => panic!("expected JSON body"),
        }
    }
}
