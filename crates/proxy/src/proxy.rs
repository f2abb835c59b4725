//! The outbound HTTP proxy (C7) — the only component in the plane that
//! performs a real network call on a connector's behalf. Domain
//! validation, credential injection, and transport all happen here;
//! `protocol://` results are delegated whole to the protocol adapter.

use crate::oauth1::{build_authorization_header, OAuth1Credentials};
use crate::protocol_adapter::ProtocolAdapter;
use crate::registry::ConnectorRegistry;
use base64::Engine;
use cplane_core::{ConnectorResponse, ConnectorResult, HttpMethod, RequestBody, ResponseBody};
use cplane_ratelimit::RateLimiterRegistry;
use cplane_vault::CredentialVault;
use std::collections::HashMap;
use std::sync::Arc;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Host allowlist check. Exact match only — no suffix or wildcard
/// matching, deliberately stricter than a typical CORS-style check.
pub struct DomainValidator;

impl DomainValidator {
    /// `raw_url` may still contain the literal `{token}` placeholder;
    /// callers substitute a fixed placeholder before calling this so
    /// validation never depends on the real secret value.
    pub fn extract_host(url: &str) -> Option<String> {
        url::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string))
    }

    pub fn is_domain_allowed(host: &str, target_domains: &[String]) -> bool {
        target_domains.iter().any(|d| d == host)
    }
}

pub struct ConnectorProxy {
    registry: Arc<ConnectorRegistry>,
    vault: Arc<CredentialVault>,
    rate_limiters: Option<Arc<RateLimiterRegistry>>,
    protocol_adapters: HashMap<String, Arc<ProtocolAdapter>>,
    http: reqwest::Client,
}

impl ConnectorProxy {
    pub fn new(registry: Arc<ConnectorRegistry>, vault: Arc<CredentialVault>) -> Self {
        Self {
            registry,
            vault,
            rate_limiters: None,
            protocol_adapters: HashMap::new(),
            http: reqwest::Client::builder().build().expect("failed to build http client"),
        }
    }

    pub fn with_rate_limiters(mut self, rate_limiters: Arc<RateLimiterRegistry>) -> Self {
        self.rate_limiters = Some(rate_limiters);
        self
    }

    pub fn register_protocol_adapter(&mut self, connector_id: impl Into<String>, adapter: Arc<ProtocolAdapter>) {
        self.protocol_adapters.insert(connector_id.into(), adapter);
    }

    pub async fn execute(&self, result: ConnectorResult) -> ConnectorResponse {
        let started = std::time::Instant::now();

        let manifest = match self.registry.with_connector(&result.connector_id, |c| c.manifest().clone()) {
            Ok(manifest) => manifest,
            Err(e) => return error_response(&result, 0, e.to_string(), started),
        };

        if let Some(rate_limiters) = &self.rate_limiters {
            if !rate_limiters.check(&result.connector_id) {
                return error_response(&result, 429, "rate limited".to_string(), started);
            }
        }

        if let Some(scheme) = result.url.strip_prefix("protocol://") {
            let _ = scheme;
            return match self.protocol_adapters.get(&result.connector_id) {
                Some(adapter) => adapter.execute(&result).await,
                None => error_response(
                    &result,
                    0,
                    format!("no protocol adapter configured for connector '{}'", result.connector_id),
                    started,
                ),
            };
        }

        let validation_url = placeholder_for_validation(&result.url);
        let host = match DomainValidator::extract_host(&validation_url) {
            Some(host) => host,
            None => return error_response(&result, 0, format!("could not parse host from url '{}'", result.url), started),
        };
        if !DomainValidator::is_domain_allowed(&host, &manifest.target_domains) {
            return error_response(&result, 0, format!("domain '{host}' is not in the connector's allowlist"), started);
        }

        let mut url = result.url.clone();
        let mut headers = result.headers.clone();
        if let Err(message) = self.inject_credentials(&result, &mut url, &mut headers).await {
            return error_response(&result, 0, message, started);
        }

        self.transport(&result, &url, &headers, started).await
    }

    async fn inject_credentials(
        &self,
        result: &ConnectorResult,
        url: &mut String,
        headers: &mut HashMap<String, String>,
    ) -> Result<(), String> {
        let connector_id = result.connector_id.as_str();
        let auth_type = result.metadata.get("auth_type").and_then(|v| v.as_str()).unwrap_or("");

        match auth_type {
            "url_token" => {
                if result.credential_vault_key.is_empty() {
                    return Err("url_token auth requires a credential_vault_key".to_string());
                }
                let token = self.retrieve(connector_id, &result.credential_vault_key)?;
                *url = url.replacen("{token}", &token, 1);
                Ok(())
            }
            "oauth1" => {
                let consumer_key_key = metadata_str(result, "oauth_consumer_key")?;
                let consumer_secret_key = metadata_str(result, "oauth_consumer_secret")?;
                let token_key_key = metadata_str(result, "oauth_token_key")?;
                let token_secret_key = metadata_str(result, "oauth_token_secret")?;

                let consumer_key = self.retrieve(connector_id, consumer_key_key)?;
                let consumer_secret = self.retrieve(connector_id, consumer_secret_key)?;
                let token_key = self.retrieve(connector_id, token_key_key)?;
                let token_secret = self.retrieve(connector_id, token_secret_key)?;

                let creds = OAuth1Credentials {
                    consumer_key: &consumer_key,
                    consumer_secret: &consumer_secret,
                    token_key: &token_key,
                    token_secret: &token_secret,
                };
                let header = build_authorization_header(http_method_str(result.method), url, &creds);
                headers.insert("Authorization".to_string(), header);
                Ok(())
            }
            "basic_auth_composed" => {
                let username_key = metadata_str(result, "basic_auth_username_key")?;
                let username = self.retrieve(connector_id, username_key)?;
                let password = self.retrieve(connector_id, &result.credential_vault_key)?;
                let encoded =
                    base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
                headers.insert("Authorization".to_string(), format!("Basic {encoded}"));
                Ok(())
            }
            _ => {
                if result.credential_vault_key.is_empty() {
                    return Ok(());
                }
                let value = self.retrieve(connector_id, &result.credential_vault_key)?;
                let credential_type = self
                    .vault
                    .describe(&result.credential_vault_key)
                    .map(|d| d.credential_type)
                    .unwrap_or_default();
                match credential_type.as_str() {
                    "oauth_token" | "bearer" => {
                        headers.insert("Authorization".to_string(), format!("Bearer {value}"));
                    }
                    "api_key" => {
                        headers.insert("X-API-Key".to_string(), value);
                    }
                    "basic_auth" => {
                        headers.insert("Authorization".to_string(), format!("Basic {value}"));
                    }
                    "bot_token" => {
                        headers.insert("Authorization".to_string(), format!("Bot {value}"));
                    }
                    _ => {
                        headers.insert("Authorization".to_string(), format!("Bearer {value}"));
                    }
                }
                Ok(())
            }
        }
    }

    fn retrieve(&self, connector_id: &str, key: &str) -> Result<String, String> {
        self.vault
            .retrieve(key, Some(connector_id))
            .map_err(|e| format!("credential error: {e}"))
    }

    async fn transport(
        &self,
        result: &ConnectorResult,
        url: &str,
        headers: &HashMap<String, String>,
        started: std::time::Instant,
    ) -> ConnectorResponse {
        let method = match result.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let is_form = headers
            .get("Content-Type")
            .map(|ct| ct.eq_ignore_ascii_case(FORM_CONTENT_TYPE))
            .unwrap_or(false);

        let mut request = self
            .http
            .request(method, url)
            .timeout(std::time::Duration::from_secs(result.timeout_seconds as u64));
        for (key, value) in headers {
            request = request.header(key, value);
        }
        request = match &result.body {
            RequestBody::Empty | RequestBody::Protocol(_) => request,
            RequestBody::Json(value) => {
                if is_form {
                    request.body(value.to_string())
                } else {
                    request.json(value)
                }
            }
            RequestBody::Form(raw) => request.body(raw.clone()),
        };

        match request.send().await {
            Ok(response) => {
                let status_code = response.status().as_u16();
                let mut headers_out = HashMap::new();
                for (name, value) in response.headers() {
                    if let Ok(v) = value.to_str() {
                        headers_out.insert(name.to_string(), v.to_string());
                    }
                }
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                let text = response.text().await.unwrap_or_default();
                let body = match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(v) => ResponseBody::Json(v),
                    Err(_) => ResponseBody::Text(text),
                };
                ConnectorResponse {
                    operation_id: result.operation_id.clone(),
                    connector_id: result.connector_id.clone(),
                    status_code,
                    headers: headers_out,
                    body,
                    elapsed_ms,
                    success: status_code > 0 && status_code < 400,
                    error: String::new(),
                    receipt_id: String::new(),
                }
            }
            Err(e) => error_response(result, 0, format!("transport error: {e}"), started),
        }
    }
}

fn http_method_str(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "GET",
        HttpMethod::Post => "POST",
        HttpMethod::Put => "PUT",
        HttpMethod::Patch => "PATCH",
        HttpMethod::Delete => "DELETE",
    }
}

fn metadata_str<'a>(result: &'a ConnectorResult, name: &str) -> Result<&'a str, String> {
    result
        .metadata
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing required metadata field '{name}'"))
}

/// Swap the `{token}` placeholder for a fixed literal before host
/// extraction, so domain validation never depends on the real secret.
fn placeholder_for_validation(url: &str) -> String {
    url.replacen("{token}", "PLACEHOLDER", 1)
}

fn error_response(result: &ConnectorResult, status_code: u16, error: String, started: std::time::Instant) -> ConnectorResponse {
    ConnectorResponse {
        operation_id: result.operation_id.clone(),
        connector_id: result.connector_id.clone(),
        status_code,
        headers: HashMap::new(),
        body: ResponseBody::Empty,
        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        success: false,
        error,
        receipt_id: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_validator_requires_exact_match() {
        let domains = vec!["slack.com".to_string()];
        assert!(DomainValidator::is_domain_allowed("slack.com", &domains));
        assert!(!DomainValidator::is_domain_allowed("evil.slack.com", &domains));
        assert!(!DomainValidator::is_domain_allowed("notslack.com", &domains));
    }

    #[test]
    fn placeholder_substitution_only_touches_token_braces() {
        let url = "https://api.example.com/auth/{token}/status";
        let substituted = placeholder_for_validation(url);
        assert_eq!(substituted, "https://api.example.com/auth/PLACEHOLDER/status");
        assert_eq!(DomainValidator::extract_host(&substituted).unwrap(), "api.example.com");
    }

    #[test]
    fn extract_host_handles_plain_https_url() {
        assert_eq!(
            DomainValidator::extract_host("https://slack.com/api/chat.postMessage").unwrap(),
            "slack.com"
        );
    }
}
