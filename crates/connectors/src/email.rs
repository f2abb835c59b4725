//! Multi-backend email connector: Gmail, Outlook (Microsoft Graph), and
//! plain SMTP/IMAP via the protocol adapter.

use crate::base::{opt_str, require_str, Connector, ConnectorState};
use crate::util::{accept_and_content_json_headers, accept_json_headers};
use base64::Engine;
use cplane_core::{
    CapabilityClass, ConnectorManifest, ConnectorOperation, ConnectorResult, ConnectorSource,
    ConnectorStatus, CredentialSpec, HttpMethod, ModelError, ParameterSpec, RequestBody, RiskTier,
};
use cplane_vault::CredentialVault;
use serde_json::json;
use std::collections::HashMap;

/// Which email provider this connector instance talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailBackend {
    Gmail,
    Outlook,
    Smtp,
}

impl EmailBackend {
    fn api_base(self) -> &'static str {
        match self {
            EmailBackend::Gmail => "https://gmail.googleapis.com/gmail/v1",
            EmailBackend::Outlook => "https://graph.microsoft.com/v1.0",
            EmailBackend::Smtp => "protocol://smtp",
        }
    }

    fn target_domains(self) -> Vec<String> {
        match self {
            EmailBackend::Gmail => vec!["gmail.googleapis.com".into()],
            EmailBackend::Outlook => vec!["graph.microsoft.com".into()],
            EmailBackend::Smtp => vec!["protocol.smtp".into(), "protocol.imap".into()],
        }
    }

    fn description(self) -> &'static str {
        match self {
            EmailBackend::Gmail => "Gmail API integration for reading and sending email",
            EmailBackend::Outlook => "Microsoft Graph API for Outlook email",
            EmailBackend::Smtp => "SMTP/IMAP email via standard protocols",
        }
    }

    fn does_not_access(self) -> Vec<String> {
        match self {
            EmailBackend::Gmail => vec!["Email drafts".into(), "Email settings".into(), "Contact lists".into()],
            EmailBackend::Outlook => vec![
                "Calendar data".into(),
                "Teams messages".into(),
                "OneDrive files".into(),
                "User profile details".into(),
            ],
            EmailBackend::Smtp => vec!["Contact lists".into(), "Calendar".into(), "Email settings".into()],
        }
    }

    fn required_credentials(self) -> Vec<CredentialSpec> {
        match self {
            EmailBackend::Gmail => vec![CredentialSpec {
                name: "gmail_access_token".into(),
                credential_type: "oauth_token".into(),
                vault_key: "email.gmail_token".into(),
                required: true,
                scopes: vec!["gmail.readonly".into(), "gmail.send".into()],
            }],
            EmailBackend::Outlook => vec![CredentialSpec {
                name: "outlook_access_token".into(),
                credential_type: "oauth_token".into(),
                vault_key: "email.outlook_token".into(),
                required: true,
                scopes: vec!["Mail.Read".into(), "Mail.Send".into(), "Mail.ReadWrite".into()],
            }],
            EmailBackend::Smtp => vec![
                CredentialSpec {
                    name: "smtp_host".into(),
                    credential_type: "config".into(),
                    vault_key: "email.smtp_host".into(),
                    required: true,
                    scopes: vec![],
                },
                CredentialSpec {
                    name: "smtp_port".into(),
                    credential_type: "config".into(),
                    vault_key: "email.smtp_port".into(),
                    required: true,
                    scopes: vec![],
                },
                CredentialSpec {
                    name: "smtp_username".into(),
                    credential_type: "config".into(),
                    vault_key: "email.smtp_username".into(),
                    required: true,
                    scopes: vec![],
                },
                CredentialSpec {
                    name: "smtp_password".into(),
                    credential_type: "api_key".into(),
                    vault_key: "email.smtp_password".into(),
                    required: true,
                    scopes: vec![],
                },
                CredentialSpec {
                    name: "smtp_from_address".into(),
                    credential_type: "config".into(),
                    vault_key: "email.smtp_from_address".into(),
                    required: true,
                    scopes: vec![],
                },
                CredentialSpec {
                    name: "smtp_use_tls".into(),
                    credential_type: "config".into(),
                    vault_key: "email.smtp_use_tls".into(),
                    required: false,
                    scopes: vec![],
                },
                CredentialSpec {
                    name: "imap_host".into(),
                    credential_type: "config".into(),
                    vault_key: "email.imap_host".into(),
                    required: false,
                    scopes: vec![],
                },
                CredentialSpec {
                    name: "imap_port".into(),
                    credential_type: "config".into(),
                    vault_key: "email.imap_port".into(),
                    required: false,
                    scopes: vec![],
                },
            ],
        }
    }

    fn cred_key(self) -> &'static str {
        match self {
            EmailBackend::Gmail => "email.gmail_token",
            EmailBackend::Outlook => "email.outlook_token",
            EmailBackend::Smtp => "email.smtp_password",
        }
    }
}

pub struct EmailConnector {
    state: ConnectorState,
    backend: EmailBackend,
}

impl EmailConnector {
    pub fn new(backend: EmailBackend) -> Self {
        let manifest = ConnectorManifest {
            id: "email".into(),
            name: "Email Integration".into(),
            version: "1.0.0".into(),
            author: "lancelot".into(),
            source: ConnectorSource::FirstParty,
            description: backend.description().into(),
            target_domains: backend.target_domains(),
            required_credentials: backend.required_credentials(),
            data_reads: vec!["Email subjects, bodies, senders, timestamps".into()],
            data_writes: vec!["New emails, replies".into()],
            does_not_access: backend.does_not_access(),
        };
        Self {
            state: ConnectorState::new(manifest),
            backend,
        }
    }
}

fn op(
    id: &str,
    capability: CapabilityClass,
    name: &str,
    description: &str,
    default_tier: RiskTier,
    idempotent: bool,
    reversible: bool,
    rollback_operation_id: &str,
    parameters: Vec<ParameterSpec>,
) -> ConnectorOperation {
    ConnectorOperation {
        id: id.into(),
        connector_id: "email".into(),
        capability,
        name: name.into(),
        description: description.into(),
        default_tier,
        parameters,
        idempotent,
        reversible,
        rollback_operation_id: rollback_operation_id.into(),
    }
}

fn param(name: &str, param_type: &str, required: bool, description: &str, default: Option<serde_json::Value>) -> ParameterSpec {
    ParameterSpec {
        name: name.into(),
        param_type: param_type.into(),
        required,
        description: description.into(),
        default,
    }
}

/// Minimal MIME `Content-Type: text/plain` message, base64url-encoded
/// the way Gmail's `messages.send` expects its `raw` field.
fn mime_text_raw(to: &str, subject: &str, body: &str, cc: Option<&str>) -> String {
    let mut raw = String::new();
    raw.push_str(&format!("To: {to}\r\n"));
    raw.push_str(&format!("Subject: {subject}\r\n"));
    if let Some(cc) = cc {
        raw.push_str(&format!("Cc: {cc}\r\n"));
    }
    raw.push_str("Content-Type: text/plain; charset=\"us-ascii\"\r\n");
    raw.push_str("MIME-Version: 1.0\r\n");
    raw.push_str("Content-Transfer-Encoding: 7bit\r\n\r\n");
    raw.push_str(body);
    base64::engine::general_purpose::URL_SAFE.encode(raw.as_bytes())
}

impl Connector for EmailConnector {
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
                "list_messages",
                CapabilityClass::Read,
                "List Messages",
                "List messages matching optional query",
                RiskTier::T1Reversible,
                true,
                false,
                "",
                vec![
                    param("query", "str", false, "", Some(json!(""))),
                    param("max_results", "int", false, "", Some(json!(20))),
                ],
            ),
            op(
                "get_message",
                CapabilityClass::Read,
                "Get Message",
                "Get a single message by ID",
                RiskTier::T1Reversible,
                true,
                false,
                "",
                vec![param("message_id", "str", true, "", None)],
            ),
            op(
                "search_messages",
                CapabilityClass::Read,
                "Search Messages",
                "Search messages with query syntax",
                RiskTier::T1Reversible,
                true,
                false,
                "",
                vec![
                    param("query", "str", true, "", None),
                    param("max_results", "int", false, "", Some(json!(20))),
                ],
            ),
            op(
                "send_message",
                CapabilityClass::Write,
                "Send Message",
                "Send a new email",
                RiskTier::T3Irreversible,
                false,
                false,
                "",
                vec![
                    param("to", "str", true, "", None),
                    param("subject", "str", true, "", None),
                    param("body", "str", true, "", None),
                    param("cc", "str", false, "", Some(json!(""))),
                ],
            ),
            op(
                "reply_message",
                CapabilityClass::Write,
                "Reply to Message",
                "Reply to an existing email thread",
                RiskTier::T3Irreversible,
                false,
                false,
                "",
                vec![
                    param("message_id", "str", true, "", None),
                    param("thread_id", "str", true, "", None),
                    param("body", "str", true, "", None),
                ],
            ),
            op(
                "delete_message",
                CapabilityClass::Delete,
                "Delete Message",
                "Permanently delete a message",
                RiskTier::T3Irreversible,
                true,
                false,
                "",
                vec![param("message_id", "str", true, "", None)],
            ),
            op(
                "move_to_folder",
                CapabilityClass::Write,
                "Move to Folder",
                "Move a message to a folder/label",
                RiskTier::T2Controlled,
                true,
                true,
                "move_to_folder",
                vec![
                    param("message_id", "str", true, "", None),
                    param("label_id", "str", true, "", None),
                ],
            ),
        ]
    }

    fn execute(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<ConnectorResult, ModelError> {
        let cred_key = self.backend.cred_key().to_string();
        let base = self.backend.api_base();

        match self.backend {
            EmailBackend::Gmail => self.execute_gmail(operation_id, params, base, cred_key),
            EmailBackend::Outlook => self.execute_outlook(operation_id, params, base, cred_key),
            EmailBackend::Smtp => self.execute_smtp(operation_id, params, cred_key),
        }
    }

    fn validate_credentials(&self, vault: &CredentialVault) -> bool {
        match self.backend {
            EmailBackend::Smtp => {
                vault.exists("email.smtp_host")
                    && vault.exists("email.smtp_port")
                    && vault.exists("email.smtp_username")
                    && vault.exists("email.smtp_password")
                    && vault.exists("email.smtp_from_address")
            }
            _ => vault.exists(self.backend.cred_key()),
        }
    }
}

impl EmailConnector {
    fn execute_gmail(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
        base: &str,
        cred_key: String,
    ) -> Result<ConnectorResult, ModelError> {
        let headers = accept_json_headers();
        let result = match operation_id {
            "list_messages" => {
                let max_results = params.get("max_results").and_then(|v| v.as_i64()).unwrap_or(20);
                let mut qs = vec![format!("maxResults={max_results}")];
                if let Some(q) = opt_str(params, "query").filter(|s| !s.is_empty()) {
                    qs.insert(0, format!("q={}", urlencoding_simple(q)));
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Get,
                    url: format!("{base}/users/me/messages?{}", qs.join("&")),
                    headers,
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "get_message" => {
                let mid = require_str(params, operation_id, "message_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Get,
                    url: format!("{base}/users/me/messages/{mid}?format=full"),
                    headers,
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "search_messages" => {
                let query = require_str(params, operation_id, "query")?;
                let max_results = params.get("max_results").and_then(|v| v.as_i64()).unwrap_or(20);
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Get,
                    url: format!("{base}/users/me/messages?q={}&maxResults={max_results}", urlencoding_simple(query)),
                    headers,
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "send_message" => {
                let to = require_str(params, operation_id, "to")?;
                let subject = require_str(params, operation_id, "subject")?;
                let body_text = require_str(params, operation_id, "body")?;
                let cc = opt_str(params, "cc").filter(|s| !s.is_empty());
                let raw = mime_text_raw(to, subject, body_text, cc);
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Post,
                    url: format!("{base}/users/me/messages"),
                    headers,
                    body: RequestBody::Json(json!({"raw": raw})),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "reply_message" => {
                let thread_id = require_str(params, operation_id, "thread_id")?;
                let body_text = require_str(params, operation_id, "body")?;
                let raw = mime_text_raw("", "", body_text, None);
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Post,
                    url: format!("{base}/users/me/messages"),
                    headers,
                    body: RequestBody::Json(json!({"raw": raw, "threadId": thread_id})),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "delete_message" => {
                let mid = require_str(params, operation_id, "message_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Delete,
                    url: format!("{base}/users/me/messages/{mid}"),
                    headers,
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "move_to_folder" => {
                let mid = require_str(params, operation_id, "message_id")?;
                let label_id = require_str(params, operation_id, "label_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Post,
                    url: format!("{base}/users/me/messages/{mid}/modify"),
                    headers,
                    body: RequestBody::Json(json!({"addLabelIds": [label_id]})),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            other => {
                return Err(ModelError::InvalidOperation {
                    connector_id: "email".into(),
                    operation_id: other.into(),
                    reason: "unknown operation".into(),
                })
            }
        };
        Ok(result)
    }

    fn execute_outlook(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
        base: &str,
        cred_key: String,
    ) -> Result<ConnectorResult, ModelError> {
        let result = match operation_id {
            "list_messages" => {
                let max_results = params.get("max_results").and_then(|v| v.as_i64()).unwrap_or(20);
                let mut url = format!("{base}/me/messages?$top={max_results}");
                if let Some(q) = opt_str(params, "query").filter(|s| !s.is_empty()) {
                    url.push_str(&format!("&$filter=contains(subject,'{q}')"));
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Get,
                    url,
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "get_message" => {
                let mid = require_str(params, operation_id, "message_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Get,
                    url: format!("{base}/me/messages/{mid}"),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "search_messages" => {
                let query = require_str(params, operation_id, "query")?;
                let max_results = params.get("max_results").and_then(|v| v.as_i64()).unwrap_or(20);
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Get,
                    url: format!("{base}/me/messages?$search=\"{query}\"&$top={max_results}"),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "send_message" => {
                let to = require_str(params, operation_id, "to")?;
                let subject = require_str(params, operation_id, "subject")?;
                let body_text = require_str(params, operation_id, "body")?;
                let mut message = json!({
                    "subject": subject,
                    "body": {"contentType": "Text", "content": body_text},
                    "toRecipients": [{"emailAddress": {"address": to}}],
                });
                if let Some(cc) = opt_str(params, "cc").filter(|s| !s.is_empty()) {
                    message["ccRecipients"] = json!([{"emailAddress": {"address": cc}}]);
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Post,
                    url: format!("{base}/me/sendMail"),
                    headers: accept_and_content_json_headers(),
                    body: RequestBody::Json(json!({"message": message})),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "reply_message" => {
                let mid = require_str(params, operation_id, "message_id")?;
                let body_text = require_str(params, operation_id, "body")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Post,
                    url: format!("{base}/me/messages/{mid}/reply"),
                    headers: accept_and_content_json_headers(),
                    body: RequestBody::Json(json!({"comment": body_text})),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "delete_message" => {
                let mid = require_str(params, operation_id, "message_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Delete,
                    url: format!("{base}/me/messages/{mid}"),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "move_to_folder" => {
                let mid = require_str(params, operation_id, "message_id")?;
                let label_id = require_str(params, operation_id, "label_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Post,
                    url: format!("{base}/me/messages/{mid}/move"),
                    headers: accept_and_content_json_headers(),
                    body: RequestBody::Json(json!({"destinationId": label_id})),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            other => {
                return Err(ModelError::InvalidOperation {
                    connector_id: "email".into(),
                    operation_id: other.into(),
                    reason: "unknown operation".into(),
                })
            }
        };
        Ok(result)
    }

    fn execute_smtp(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
        cred_key: String,
    ) -> Result<ConnectorResult, ModelError> {
        let mut metadata = HashMap::new();
        metadata.insert("protocol_adapter".to_string(), json!(true));

        let result = match operation_id {
            "list_messages" | "get_message" | "search_messages" | "delete_message" | "move_to_folder" => {
                let mut body = json!({"protocol": "imap"});
                match operation_id {
                    "list_messages" => {
                        body["action"] = json!("list");
                        body["query"] = json!(opt_str(params, "query").unwrap_or(""));
                        body["max_results"] = json!(params.get("max_results").and_then(|v| v.as_i64()).unwrap_or(20));
                    }
                    "get_message" => {
                        body["action"] = json!("fetch");
                        body["message_id"] = json!(require_str(params, operation_id, "message_id")?);
                    }
                    "search_messages" => {
                        body["action"] = json!("search");
                        body["query"] = json!(require_str(params, operation_id, "query")?);
                        body["max_results"] = json!(params.get("max_results").and_then(|v| v.as_i64()).unwrap_or(20));
                    }
                    "delete_message" => {
                        body["action"] = json!("delete");
                        body["message_id"] = json!(require_str(params, operation_id, "message_id")?);
                    }
                    "move_to_folder" => {
                        body["action"] = json!("move");
                        body["message_id"] = json!(require_str(params, operation_id, "message_id")?);
                        body["destination"] = json!(require_str(params, operation_id, "label_id")?);
                    }
                    _ => unreachable!(),
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Post,
                    url: "protocol://imap".into(),
                    headers: HashMap::new(),
                    body: RequestBody::Protocol(body),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata,
                }
            }
            "send_message" | "reply_message" => {
                let mut body = json!({
                    "protocol": "smtp",
                    "action": "send",
                    "to": opt_str(params, "to").unwrap_or(""),
                    "subject": opt_str(params, "subject").unwrap_or(""),
                    "body": opt_str(params, "body").unwrap_or(""),
                    "mime_type": "text/plain",
                });
                if operation_id == "send_message" {
                    if let Some(cc) = opt_str(params, "cc").filter(|s| !s.is_empty()) {
                        body["cc"] = json!(cc);
                    }
                } else {
                    body["headers"] = json!({"In-Reply-To": opt_str(params, "message_id").unwrap_or("")});
                    body["thread_id"] = json!(opt_str(params, "thread_id").unwrap_or(""));
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "email".into(),
                    method: HttpMethod::Post,
                    url: "protocol://smtp".into(),
                    headers: HashMap::new(),
                    body: RequestBody::Protocol(body),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata,
                }
            }
            other => {
                return Err(ModelError::InvalidOperation {
                    connector_id: "email".into(),
                    operation_id: other.into(),
                    reason: "unknown operation".into(),
                })
            }
        };
        Ok(result)
    }
}

/// Minimal query-string escaping for the handful of characters likely
/// to appear in a Gmail search query; full RFC 3986 escaping happens
/// downstream once connected to a real HTTP client.
fn urlencoding_simple(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s, percent_encoding::NON_ALPHANUMERIC).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn gmail_send_message_base64_encodes_raw() {
        let connector = EmailConnector::new(EmailBackend::Gmail);
        let result = connector
            .execute(
                "send_message",
                &params(&[
                    ("to", json!("a@example.com")),
                    ("subject", json!("hi")),
                    ("body", json!("hello")),
                ]),
            )
            .unwrap();
        match result.body {
            RequestBody::Json(v) => assert!(v["raw"].as_str().unwrap().len() > 0),
            _ => panic!("expected JSON body"),
        }
    }

    #[test]
    fn outlook_send_message_nests_recipients() {
        let connector = EmailConnector::new(EmailBackend::Outlook);
        let result = connector
            .execute(
                "send_message",
                &params(&[
                    ("to", json!("a@example.com")),
                    ("subject", json!("hi")),
                    ("body", json!("hello")),
                ]),
            )
            .unwrap();
        match result.body {
            RequestBody::Json(v) => {
                assert_eq!(v["message"]["toRecipients"][0]["emailAddress"]["address"], "a@example.com");
            }
            _ => panic!("expected JSON body"),
        }
    }

    #[test]
    fn smtp_backend_uses_protocol_body_and_url() {
        let connector = EmailConnector::new(EmailBackend::Smtp);
        let result = connector
            .execute(
                "send_message",
                &params(&[
                    ("to", json!("a@example.com")),
                    ("subject", json!("hi")),
                    ("body", json!("hello")),
                ]),
            )
            .unwrap();
        assert_eq!(result.url, "protocol://smtp");
        assert!(matches!(result.body, RequestBody::Protocol(_)));
    }

    #[test]
    fn smtp_validate_credentials_checks_all_five_required_keys() {
        let connector = EmailConnector::new(EmailBackend::Smtp);
        assert_eq!(connector.manifest().required_credentials.len(), 8);
    }
}
