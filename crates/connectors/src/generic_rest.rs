//! User-declared REST connector. Operations are generated from a
//! config at construction time rather than hardcoded; construction
//! validates the config for SSRF, wildcard domains, and path traversal
//! before a single operation is ever built.

use crate::base::{Connector, ConnectorState};
use cplane_core::{
    CapabilityClass, ConnectorManifest, ConnectorOperation, ConnectorResult, ConnectorSource,
    ConnectorStatus, CredentialSpec, Error, HttpMethod, ModelError, RequestBody, RiskTier,
};
use cplane_vault::CredentialVault;
use serde_json::json;
use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;

const VALID_AUTH_TYPES: &[&str] = &["bearer", "api_key", "basic", "oauth2"];
const MAX_ENDPOINTS: usize = 50;

fn private_networks() -> Vec<ipnet::IpNet> {
    vec![
        ipnet::IpNet::from_str("127.0.0.0/8").unwrap(),
        ipnet::IpNet::from_str("10.0.0.0/8").unwrap(),
        ipnet::IpNet::from_str("172.16.0.0/12").unwrap(),
        ipnet::IpNet::from_str("192.168.0.0/16").unwrap(),
        ipnet::IpNet::from_str("169.254.0.0/16").unwrap(),
    ]
}

fn is_private_host(hostname: &str) -> bool {
    if hostname == "localhost" || hostname == "localhost.localdomain" {
        return true;
    }
    match hostname.parse::<IpAddr>() {
        Ok(addr) => private_networks().iter().any(|net| net.contains(&addr)),
        Err(_) => false,
    }
}

fn is_valid_param_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 64 && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// One user-declared REST endpoint: a path template, an HTTP method,
/// and a display name/description/tier.
#[derive(Debug, Clone)]
pub struct RestEndpointConfig {
    pub path: String,
    pub method: String,
    pub name: String,
    pub description: String,
    pub default_tier: Option<u8>,
}

/// Construction-time configuration for a [`GenericRestConnector`].
#[derive(Debug, Clone)]
pub struct GenericRestConfig {
    pub id: String,
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub base_url: String,
    pub auth_type: String,
    pub auth_vault_key: String,
    pub endpoints: Vec<RestEndpointConfig>,
}

impl GenericRestConfig {
    fn validate(&self) -> Result<(), Error> {
        if self.base_url.is_empty() {
            return Err(Error::Config { message: "generic REST connector: base_url is required".into() });
        }
        if self.id.is_empty() {
            return Err(Error::Config { message: "generic REST connector: id is required".into() });
        }
        if self.name.is_empty() {
            return Err(Error::Config { message: "generic REST connector: name is required".into() });
        }
        if !self.base_url.starts_with("https://") {
            return Err(Error::Config {
                message: format!("generic REST connector: base_url must start with https://, got '{}'", self.base_url),
            });
        }

        let parsed = url::Url::parse(&self.base_url)
            .map_err(|e| Error::Config { message: format!("generic REST connector: invalid base_url: {e}") })?;
        let hostname = parsed.host_str().unwrap_or("").to_string();

        if hostname.contains('*') {
            return Err(Error::Config {
                message: format!("generic REST connector: wildcard base_urls not allowed, got '{hostname}'"),
            });
        }
        if is_private_host(&hostname) {
            return Err(Error::Config {
                message: format!("generic REST connector: private/localhost base_url not allowed, got '{hostname}'"),
            });
        }
        if !VALID_AUTH_TYPES.contains(&self.auth_type.as_str()) {
            return Err(Error::Config {
                message: format!(
                    "generic REST connector: auth_type must be one of {VALID_AUTH_TYPES:?}, got '{}'",
                    self.auth_type
                ),
            });
        }
        if self.endpoints.is_empty() {
            return Err(Error::Config { message: "generic REST connector: endpoints must not be empty".into() });
        }
        if self.endpoints.len() > MAX_ENDPOINTS {
            return Err(Error::Config {
                message: format!("generic REST connector: max {MAX_ENDPOINTS} endpoints allowed, got {}", self.endpoints.len()),
            });
        }
        for ep in &self.endpoints {
            if !ep.path.starts_with('/') {
                return Err(Error::Config {
                    message: format!("generic REST connector: endpoint path must start with /, got '{}'", ep.path),
                });
            }
            if ep.path.contains("../") || ep.path.contains("..\\") {
                return Err(Error::Config {
                    message: format!("generic REST connector: path traversal detected in '{}'", ep.path),
                });
            }
        }
        Ok(())
    }

    fn hostname(&self) -> String {
        url::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }
}

pub struct GenericRestConnector {
    state: ConnectorState,
    base_url: String,
    auth_vault_key: String,
    endpoints: Vec<RestEndpointConfig>,
    operations: Vec<ConnectorOperation>,
}

fn build_operation_id(path: &str, method: &str) -> String {
    let sanitized = path.trim_matches('/').replace('/', "_").replace('{', "").replace('}', "");
    if sanitized.is_empty() {
        method.to_lowercase()
    } else {
        format!("{}_{sanitized}", method.to_lowercase())
    }
}

fn capability_and_tier(method: &str, default_tier: Option<u8>) -> (CapabilityClass, RiskTier) {
    match method {
        "GET" => (CapabilityClass::Read, RiskTier::from_rank(default_tier.unwrap_or(2) as i64)),
        "POST" | "PUT" | "PATCH" => {
            (CapabilityClass::Write, RiskTier::from_rank(default_tier.unwrap_or(3) as i64))
        }
        "DELETE" => (CapabilityClass::Delete, RiskTier::from_rank(default_tier.unwrap_or(3) as i64)),
        _ => (CapabilityClass::Write, RiskTier::T3Irreversible),
    }
}

impl GenericRestConnector {
    pub fn new(config: GenericRestConfig) -> Result<Self, Error> {
        config.validate()?;

        let hostname = config.hostname();
        let cred_specs = if config.auth_vault_key.is_empty() {
            vec![]
        } else {
            vec![CredentialSpec {
                name: format!("{}_credential", config.id),
                credential_type: config.auth_type.clone(),
                vault_key: config.auth_vault_key.clone(),
                required: true,
                scopes: vec![],
            }]
        };

        let operations = config
            .endpoints
            .iter()
            .map(|ep| {
                let method = ep.method.to_uppercase();
                let op_id = build_operation_id(&ep.path, &method);
                let (capability, default_tier) = capability_and_tier(&method, ep.default_tier);
                ConnectorOperation {
                    id: op_id.clone(),
                    connector_id: config.id.clone(),
                    capability,
                    name: if ep.name.is_empty() { op_id } else { ep.name.clone() },
                    description: ep.description.clone(),
                    default_tier,
                    parameters: vec![],
                    idempotent: matches!(method.as_str(), "GET" | "PUT" | "DELETE"),
                    reversible: false,
                    rollback_operation_id: String::new(),
                }
            })
            .collect();

        let manifest = ConnectorManifest {
            id: config.id.clone(),
            name: config.name.clone(),
            version: config.version.clone(),
            author: config.author.clone(),
            source: ConnectorSource::User,
            description: config.description.clone(),
            target_domains: vec![hostname],
            required_credentials: cred_specs,
            data_reads: vec![],
            data_writes: vec![],
            does_not_access: vec![],
        };

        Ok(Self {
            state: ConnectorState::new(manifest),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_vault_key: config.auth_vault_key,
            endpoints: config.endpoints,
            operations,
        })
    }
}

impl Connector for GenericRestConnector {
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
        self.operations.clone()
    }

    fn execute(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<ConnectorResult, ModelError> {
        for key in params.keys() {
            if !is_valid_param_name(key) {
                return Err(ModelError::InvalidRequestSpec {
                    operation_id: operation_id.to_string(),
                    reason: format!(
                        "invalid param name '{key}' — alphanumeric + underscore only, max 64 chars"
                    ),
                });
            }
        }

        let (ep, op) = self
            .endpoints
            .iter()
            .zip(self.operations.iter())
            .find(|(_, op)| op.id == operation_id)
            .ok_or_else(|| ModelError::InvalidOperation {
                connector_id: self.manifest().id.clone(),
                operation_id: operation_id.to_string(),
                reason: "unknown operation".into(),
            })?;

        let method_str = ep.method.to_uppercase();
        let mut path = ep.path.clone();
        for (key, value) in params {
            let placeholder = format!("{{{key}}}");
            let replacement = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            path = path.replace(&placeholder, &replacement);
        }

        let method = match method_str.as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            other => {
                return Err(ModelError::InvalidOperation {
                    connector_id: self.manifest().id.clone(),
                    operation_id: operation_id.to_string(),
                    reason: format!("unsupported HTTP method '{other}'"),
                })
            }
        };

        let body = if matches!(method, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch) {
            RequestBody::Json(json!(params))
        } else {
            RequestBody::Empty
        };

        let _ = op;
        Ok(ConnectorResult {
            operation_id: operation_id.into(),
            connector_id: self.manifest().id.clone(),
            method,
            url: format!("{}{path}", self.base_url),
            headers: HashMap::new(),
            body,
            timeout_seconds: 30,
            credential_vault_key: self.auth_vault_key.clone(),
            metadata: HashMap::new(),
        })
    }

    fn validate_credentials(&self, _vault: &CredentialVault) -> bool {
        !self.auth_vault_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> GenericRestConfig {
        GenericRestConfig {
            id: "weather".into(),
            name: "Weather API".into(),
            version: "1.0.0".into(),
            author: "user".into(),
            description: "Weather lookups".into(),
            base_url: "https://api.weather.example.com".into(),
            auth_type: "bearer".into(),
            auth_vault_key: "weather.token".into(),
            endpoints: vec![
                RestEndpointConfig {
                    path: "/v1/forecast/{city}".into(),
                    method: "GET".into(),
                    name: "Get Forecast".into(),
                    description: "".into(),
                    default_tier: None,
                },
                RestEndpointConfig {
                    path: "/v1/alerts".into(),
                    method: "POST".into(),
                    name: "Create Alert".into(),
                    description: "".into(),
                    default_tier: None,
                },
            ],
        }
    }

    fn params(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn rejects_non_https_base_url() {
        let mut cfg = sample_config();
        cfg.base_url = "http://api.weather.example.com".into();
        assert!(GenericRestConnector::new(cfg).is_err());
    }

    #[test]
    fn rejects_private_host() {
        let mut cfg = sample_config();
        cfg.base_url = "https://127.0.0.1".into();
        cfg.endpoints[0].path = "/v1/forecast".into();
        assert!(GenericRestConnector::new(cfg).is_err());
    }

    #[test]
    fn rejects_localhost_by_name() {
        let mut cfg = sample_config();
        cfg.base_url = "https://localhost".into();
        assert!(GenericRestConnector::new(cfg).is_err());
    }

    #[test]
    fn rejects_path_traversal() {
        let mut cfg = sample_config();
        cfg.endpoints[0].path = "/v1/../secret".into();
        assert!(GenericRestConnector::new(cfg).is_err());
    }

    #[test]
    fn generates_get_operation_id_from_path() {
        let connector = GenericRestConnector::new(sample_config()).unwrap();
        let ops = connector.get_operations();
        assert!(ops.iter().any(|o| o.id == "get_v1_forecast_city"));
    }

    #[test]
    fn substitutes_path_param_and_rejects_bad_param_names() {
        let connector = GenericRestConnector::new(sample_config()).unwrap();
        let result = connector
            .execute("get_v1_forecast_city", &params(&[("city", json!("nyc"))]))
            .unwrap();
        assert_eq!(result.url, "https://api.weather.example.com/v1/forecast/nyc");

        let bad = connector.execute("get_v1_forecast_city", &params(&[("bad name!", json!("x"))]));
        assert!(bad.is_err());
    }

    #[test]
    fn post_endpoint_carries_params_as_json_body() {
        let connector = GenericRestConnector::new(sample_config()).unwrap();
        let result = connector
            .execute("post_v1_alerts", &params(&[("severity", json!("high"))]))
            .unwrap();
        match result.body {
            RequestBody::Json(v) => assert_eq!(v["severity"], "high"),
            _ => panic!("expected JSON body"),
        }
    }
}
