//! Twilio SMS connector. Uses form-urlencoded bodies and composed
//! basic auth (account SID as username, auth token as password) —
//! a deliberate deviation from a single `basic_auth` vault key toward
//! the two-key `basic_auth_composed` credential injection scheme.

use crate::base::{opt_str, require_str, Connector, ConnectorState};
use crate::util::form_headers;
use cplane_core::{
    CapabilityClass, ConnectorManifest, ConnectorOperation, ConnectorResult, ConnectorSource,
    ConnectorStatus, CredentialSpec, HttpMethod, ModelError, ParameterSpec, RequestBody, RiskTier,
};
use cplane_vault::CredentialVault;
use serde_json::json;
use std::collections::HashMap;

pub struct SmsConnector {
    state: ConnectorState,
    account_sid: String,
    from_number: Option<String>,
    messaging_service_sid: Option<String>,
}

impl SmsConnector {
    pub fn new(
        account_sid: impl Into<String>,
        from_number: Option<String>,
        messaging_service_sid: Option<String>,
    ) -> Self {
        let manifest = ConnectorManifest {
            id: "sms".into(),
            name: "Twilio SMS Integration".into(),
            version: "1.0.0".into(),
            author: "lancelot".into(),
            source: ConnectorSource::FirstParty,
            description: "Twilio REST API for SMS/MMS messaging".into(),
            target_domains: vec!["api.twilio.com".into()],
            required_credentials: vec![
                CredentialSpec {
                    name: "twilio_account_sid".into(),
                    credential_type: "config".into(),
                    vault_key: "sms.account_sid".into(),
                    required: true,
                    scopes: vec![],
                },
                CredentialSpec {
                    name: "twilio_auth_token".into(),
                    credential_type: "api_key".into(),
                    vault_key: "sms.auth_token".into(),
                    required: true,
                    scopes: vec![],
                },
                CredentialSpec {
                    name: "twilio_from_number".into(),
                    credential_type: "config".into(),
                    vault_key: "sms.from_number".into(),
                    required: false,
                    scopes: vec![],
                },
                CredentialSpec {
                    name: "twilio_messaging_service_sid".into(),
                    credential_type: "config".into(),
                    vault_key: "sms.messaging_service_sid".into(),
                    required: false,
                    scopes: vec![],
                },
            ],
            data_reads: vec!["Message status and content".into(), "Media attachments".into()],
            data_writes: vec!["Outbound SMS/MMS messages".into()],
            does_not_access: vec!["Voice calls".into(), "Account billing details".into(), "Other subaccounts".into()],
        };
        Self {
            state: ConnectorState::new(manifest),
            account_sid: account_sid.into(),
            from_number,
            messaging_service_sid,
        }
    }

    fn base_url(&self) -> String {
        format!("https://api.twilio.com/2010-04-01/Accounts/{}", self.account_sid)
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
        connector_id: "sms".into(),
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

fn param(name: &str, param_type: &str, required: bool, default: Option<serde_json::Value>) -> ParameterSpec {
    ParameterSpec {
        name: name.into(),
        param_type: param_type.into(),
        required,
        description: String::new(),
        default,
    }
}

fn basic_auth_metadata(billable: bool) -> HashMap<String, serde_json::Value> {
    let mut m = HashMap::new();
    m.insert("auth_type".to_string(), json!("basic_auth_composed"));
    m.insert("basic_auth_username_key".to_string(), json!("sms.account_sid"));
    m.insert("basic_auth_password_key".to_string(), json!("sms.auth_token"));
    if billable {
        m.insert("billable".to_string(), json!(true));
    }
    m
}

fn form_body(pairs: Vec<(&str, String)>) -> String {
    serde_urlencoded::to_string(pairs).unwrap_or_default()
}

impl Connector for SmsConnector {
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
                "send_sms",
                CapabilityClass::Write,
                "Send SMS",
                "Send a text message",
                RiskTier::T3Irreversible,
                false,
                vec![param("to", "str", true, None), param("body", "str", true, None)],
            ),
            op(
                "send_mms",
                CapabilityClass::Write,
                "Send MMS",
                "Send a media message",
                RiskTier::T3Irreversible,
                false,
                vec![
                    param("to", "str", true, None),
                    param("body", "str", true, None),
                    param("media_url", "str", true, None),
                ],
            ),
            op(
                "get_message",
                CapabilityClass::Read,
                "Get Message",
                "Get a single message's status and content",
                RiskTier::T1Reversible,
                true,
                vec![param("message_sid", "str", true, None)],
            ),
            op(
                "list_messages",
                CapabilityClass::Read,
                "List Messages",
                "List sent/received messages",
                RiskTier::T1Reversible,
                true,
                vec![
                    param("to", "str", false, Some(json!(""))),
                    param("from_number", "str", false, Some(json!(""))),
                    param("date_sent", "str", false, Some(json!(""))),
                ],
            ),
            op(
                "get_media",
                CapabilityClass::Read,
                "Get Media",
                "Get media attached to a message",
                RiskTier::T1Reversible,
                true,
                vec![param("message_sid", "str", true, None), param("media_sid", "str", true, None)],
            ),
            op(
                "delete_message",
                CapabilityClass::Delete,
                "Delete Message",
                "Delete a message record",
                RiskTier::T3Irreversible,
                true,
                vec![param("message_sid", "str", true, None)],
            ),
        ]
    }

    fn execute(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<ConnectorResult, ModelError> {
        let cred_key = "sms.auth_token".to_string();
        let base = self.base_url();

        let result = match operation_id {
            "send_sms" | "send_mms" => {
                let to = require_str(params, operation_id, "to")?;
                let body_text = require_str(params, operation_id, "body")?;
                let mut fields = vec![("To".to_string(), to.to_string()), ("Body".to_string(), body_text.to_string())];
                if operation_id == "send_mms" {
                    let media_url = require_str(params, operation_id, "media_url")?;
                    fields.push(("MediaUrl".to_string(), media_url.to_string()));
                }
                if let Some(sid) = self.messaging_service_sid.as_deref().filter(|s| !s.is_empty()) {
                    fields.push(("MessagingServiceSid".to_string(), sid.to_string()));
                } else if let Some(from_number) = self.from_number.as_deref().filter(|s| !s.is_empty()) {
                    fields.push(("From".to_string(), from_number.to_string()));
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "sms".into(),
                    method: HttpMethod::Post,
                    url: format!("{base}/Messages.json"),
                    headers: form_headers(),
                    body: RequestBody::Form(form_body(fields.iter().map(|(k, v)| (k.as_str(), v.clone())).collect())),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: basic_auth_metadata(true),
                }
            }
            "get_message" => {
                let sid = require_str(params, operation_id, "message_sid")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "sms".into(),
                    method: HttpMethod::Get,
                    url: format!("{base}/Messages/{sid}.json"),
                    headers: HashMap::new(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: basic_auth_metadata(false),
                }
            }
            "list_messages" => {
                let mut qs = Vec::new();
                if let Some(to) = opt_str(params, "to").filter(|s| !s.is_empty()) {
                    qs.push(format!("To={to}"));
                }
                if let Some(from_number) = opt_str(params, "from_number").filter(|s| !s.is_empty()) {
                    qs.push(format!("From={from_number}"));
                }
                if let Some(date_sent) = opt_str(params, "date_sent").filter(|s| !s.is_empty()) {
                    qs.push(format!("DateSent={date_sent}"));
                }
                let mut url = format!("{base}/Messages.json");
                if !qs.is_empty() {
                    url.push('?');
                    url.push_str(&qs.join("&"));
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "sms".into(),
                    method: HttpMethod::Get,
                    url,
                    headers: HashMap::new(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: basic_auth_metadata(false),
                }
            }
            "get_media" => {
                let message_sid = require_str(params, operation_id, "message_sid")?;
                let media_sid = require_str(params, operation_id, "media_sid")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "sms".into(),
                    method: HttpMethod::Get,
                    url: format!("{base}/Messages/{message_sid}/Media/{media_sid}.json"),
                    headers: HashMap::new(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: basic_auth_metadata(false),
                }
            }
            "delete_message" => {
                let sid = require_str(params, operation_id, "message_sid")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "sms".into(),
                    method: HttpMethod::Delete,
                    url: format!("{base}/Messages/{sid}.json"),
                    headers: HashMap::new(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: basic_auth_metadata(false),
                }
            }
            other => {
                return Err(ModelError::InvalidOperation {
                    connector_id: "sms".into(),
                    operation_id: other.into(),
                    reason: "unknown operation".into(),
                })
            }
        };
        Ok(result)
    }

    fn validate_credentials(&self, vault: &CredentialVault) -> bool {
        vault.exists("sms.account_sid") && vault.exists("sms.auth_token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn send_sms_uses_form_encoded_body() {
        let connector = SmsConnector::new("AC123", Some("+15557654321".to_string()), None);
        let result = connector
            .execute(
                "send_sms",
                &params(&[("to", json!("+15551234567")), ("body", json!("hi"))]),
            )
            .unwrap();
        match result.body {
            RequestBody::Form(s) => {
                assert!(s.contains("To=%2B15551234567"));
                assert!(s.contains("Body=hi"));
            }
            _ => panic!("expected form body"),
        }
    }

    #[test]
    fn send_sms_is_billable_and_basic_auth_composed() {
        let connector = SmsConnector::new("AC123", Some("+2".to_string()), None);
        let result = connector
            .execute("send_sms", &params(&[("to", json!("+1")), ("body", json!("hi"))]))
            .unwrap();
        assert_eq!(result.metadata.get("billable").unwrap(), &json!(true));
        assert_eq!(result.metadata.get("auth_type").unwrap(), &json!("basic_auth_composed"));
    }

    #[test]
    fn delete_message_not_billable() {
        let connector = SmsConnector::new("AC123", None, None);
        let result = connector
            .execute("delete_message", &params(&[("message_sid", json!("SM1"))]))
            .unwrap();
        assert!(result.metadata.get("billable").is_none());
    }
}
