//! WhatsApp Business Cloud API connector. `phone_number_id` and
//! `api_version` are construction-time configuration, not per-call
//! parameters — mirrors the account-scoped nature of a WABA number.

use crate::base::{opt_str, require_str, Connector, ConnectorState};
use crate::util::accept_and_content_json_headers;
use cplane_core::{
    CapabilityClass, ConnectorManifest, ConnectorOperation, ConnectorResult, ConnectorSource,
    ConnectorStatus, CredentialSpec, HttpMethod, ModelError, ParameterSpec, RequestBody, RiskTier,
};
use cplane_vault::CredentialVault;
use serde_json::json;
use std::collections::HashMap;

const DEFAULT_API_VERSION: &str = "v21.0";

pub struct WhatsAppConnector {
    state: ConnectorState,
    phone_number_id: String,
    api_version: String,
}

impl WhatsAppConnector {
    pub fn new(phone_number_id: impl Into<String>, api_version: Option<String>) -> Self {
        let manifest = ConnectorManifest {
            id: "whatsapp".into(),
            name: "WhatsApp Business Integration".into(),
            version: "1.0.0".into(),
            author: "lancelot".into(),
            source: ConnectorSource::FirstParty,
            description: "WhatsApp Business Cloud API for messaging via Meta's Graph API".into(),
            target_domains: vec!["graph.facebook.com".into()],
            required_credentials: vec![CredentialSpec {
                name: "whatsapp_access_token".into(),
                credential_type: "oauth_token".into(),
                vault_key: "whatsapp.access_token".into(),
                required: true,
                scopes: vec!["whatsapp_business_messaging".into()],
            }],
            data_reads: vec!["Media attachments".into(), "Business profile".into()],
            data_writes: vec!["Outbound text/template/media/interactive messages".into(), "Read receipts".into()],
            does_not_access: vec!["Contact lists".into(), "Group metadata".into(), "Call logs".into()],
        };
        Self {
            state: ConnectorState::new(manifest),
            phone_number_id: phone_number_id.into(),
            api_version: api_version.unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        }
    }

    fn base(&self) -> String {
        format!("https://graph.facebook.com/{}/{}", self.api_version, self.phone_number_id)
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
        connector_id: "whatsapp".into(),
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

fn parse_json_object_or_default(raw: Option<&str>) -> serde_json::Value {
    raw.and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok())
        .unwrap_or_else(|| json!({}))
}

impl Connector for WhatsAppConnector {
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
                "send_text_message",
                CapabilityClass::Write,
                "Send Text Message",
                "Send a free-form text message (requires an open 24h customer service window)",
                RiskTier::T3Irreversible,
                false,
                vec![param("to", "str", true, None), param("text", "str", true, None)],
            ),
            op(
                "send_template_message",
                CapabilityClass::Write,
                "Send Template Message",
                "Send a pre-approved message template, usable outside the service window",
                RiskTier::T2Controlled,
                false,
                vec![
                    param("to", "str", true, None),
                    param("template_name", "str", true, None),
                    param("language_code", "str", false, Some(json!("en_US"))),
                    param("components", "str", false, Some(json!(""))),
                ],
            ),
            op(
                "send_media_message",
                CapabilityClass::Write,
                "Send Media Message",
                "Send an image, video, document, or audio message",
                RiskTier::T3Irreversible,
                false,
                vec![
                    param("to", "str", true, None),
                    param("media_type", "str", true, None),
                    param("media_id", "str", true, None),
                    param("caption", "str", false, Some(json!(""))),
                ],
            ),
            op(
                "send_interactive_message",
                CapabilityClass::Write,
                "Send Interactive Message",
                "Send a button or list interactive message",
                RiskTier::T3Irreversible,
                false,
                vec![
                    param("to", "str", true, None),
                    param("interactive_type", "str", true, None),
                    param("body_text", "str", true, None),
                    param("action", "str", false, Some(json!("{}"))),
                ],
            ),
            op(
                "mark_read",
                CapabilityClass::Write,
                "Mark Read",
                "Mark an inbound message as read",
                RiskTier::T0Inert,
                false,
                vec![param("message_id", "str", true, None)],
            ),
            op(
                "get_media",
                CapabilityClass::Read,
                "Get Media",
                "Retrieve a media object's download URL",
                RiskTier::T1Reversible,
                true,
                vec![param("media_id", "str", true, None)],
            ),
            op(
                "upload_media",
                CapabilityClass::Write,
                "Upload Media",
                "Upload a media file for later use in a message",
                RiskTier::T2Controlled,
                false,
                vec![param("file_path", "str", true, None), param("mime_type", "str", true, None)],
            ),
            op(
                "get_business_profile",
                CapabilityClass::Read,
                "Get Business Profile",
                "Get the WhatsApp Business profile details",
                RiskTier::T0Inert,
                true,
                vec![],
            ),
        ]
    }

    fn execute(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<ConnectorResult, ModelError> {
        let cred_key = "whatsapp.access_token".to_string();
        let base = self.base();

        let result = match operation_id {
            "send_text_message" => {
                let to = require_str(params, operation_id, "to")?;
                let text = require_str(params, operation_id, "text")?;
                let mut metadata = HashMap::new();
                metadata.insert("requires_template_outside_window".to_string(), json!(true));
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "whatsapp".into(),
                    method: HttpMethod::Post,
                    url: format!("{base}/messages"),
                    headers: accept_and_content_json_headers(),
                    body: RequestBody::Json(json!({
                        "messaging_product": "whatsapp",
                        "to": to,
                        "type": "text",
                        "text": {"body": text},
                    })),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata,
                }
            }
            "send_template_message" => {
                let to = require_str(params, operation_id, "to")?;
                let template_name = require_str(params, operation_id, "template_name")?;
                let language_code = opt_str(params, "language_code").unwrap_or("en_US");
                let components = parse_json_object_or_default(opt_str(params, "components"));
                let mut template = json!({
                    "name": template_name,
                    "language": {"code": language_code},
                });
                if components.is_object() && !components.as_object().unwrap().is_empty() {
                    template["components"] = components;
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "whatsapp".into(),
                    method: HttpMethod::Post,
                    url: format!("{base}/messages"),
                    headers: accept_and_content_json_headers(),
                    body: RequestBody::Json(json!({
                        "messaging_product": "whatsapp",
                        "to": to,
                        "type": "template",
                        "template": template,
                    })),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "send_media_message" => {
                let to = require_str(params, operation_id, "to")?;
                let media_type = require_str(params, operation_id, "media_type")?;
                let media_id = require_str(params, operation_id, "media_id")?;
                let mut media_object = json!({"id": media_id});
                if let Some(caption) = opt_str(params, "caption").filter(|s| !s.is_empty()) {
                    media_object["caption"] = json!(caption);
                }
                let mut body = json!({
                    "messaging_product": "whatsapp",
                    "to": to,
                    "type": media_type,
                });
                body[media_type] = media_object;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "whatsapp".into(),
                    method: HttpMethod::Post,
                    url: format!("{base}/messages"),
                    headers: accept_and_content_json_headers(),
                    body: RequestBody::Json(body),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "send_interactive_message" => {
                let to = require_str(params, operation_id, "to")?;
                let interactive_type = require_str(params, operation_id, "interactive_type")?;
                let body_text = require_str(params, operation_id, "body_text")?;
                let action = parse_json_object_or_default(opt_str(params, "action"));
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "whatsapp".into(),
                    method: HttpMethod::Post,
                    url: format!("{base}/messages"),
                    headers: accept_and_content_json_headers(),
                    body: RequestBody::Json(json!({
                        "messaging_product": "whatsapp",
                        "to": to,
                        "type": "interactive",
                        "interactive": {
                            "type": interactive_type,
                            "body": {"text": body_text},
                            "action": action,
                        },
                    })),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "mark_read" => {
                let message_id = require_str(params, operation_id, "message_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "whatsapp".into(),
                    method: HttpMethod::Post,
                    url: format!("{base}/messages"),
                    headers: accept_and_content_json_headers(),
                    body: RequestBody::Json(json!({
                        "messaging_product": "whatsapp",
                        "status": "read",
                        "message_id": message_id,
                    })),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "get_media" => {
                let media_id = require_str(params, operation_id, "media_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "whatsapp".into(),
                    method: HttpMethod::Get,
                    url: format!("https://graph.facebook.com/{}/{}", self.api_version, media_id),
                    headers: accept_and_content_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "upload_media" => {
                let file_path = require_str(params, operation_id, "file_path")?;
                let mime_type = require_str(params, operation_id, "mime_type")?;
                let mut headers = accept_and_content_json_headers();
                headers.insert("Content-Type".to_string(), mime_type.to_string());
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "whatsapp".into(),
                    method: HttpMethod::Post,
                    url: format!("{base}/media"),
                    headers,
                    body: RequestBody::Json(json!({"file": file_path})),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "get_business_profile" => ConnectorResult {
                operation_id: operation_id.into(),
                connector_id: "whatsapp".into(),
                method: HttpMethod::Get,
                url: format!("{base}/whatsapp_business_profile"),
                headers: accept_and_content_json_headers(),
                body: RequestBody::Empty,
                timeout_seconds: 30,
                credential_vault_key: cred_key,
                metadata: HashMap::new(),
            },
            other => {
                return Err(ModelError::InvalidOperation {
                    connector_id: "whatsapp".into(),
                    operation_id: other.into(),
                    reason: "unknown operation".into(),
                })
            }
        };
        Ok(result)
    }

    fn validate_credentials(&self, vault: &CredentialVault) -> bool {
        vault.exists("whatsapp.access_token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn send_text_message_flags_window_requirement() {
        let connector = WhatsAppConnector::new("1234567890", None);
        let result = connector
            .execute(
                "send_text_message",
                &params(&[("to", json!("15551234567")), ("text", json!("hi"))]),
            )
            .unwrap();
        assert_eq!(
            result.metadata.get("requires_template_outside_window").unwrap(),
            &json!(true)
        );
    }

    #[test]
    fn send_media_message_nests_under_dynamic_media_type_key() {
        let connector = WhatsAppConnector::new("1234567890", None);
        let result = connector
            .execute(
                "send_media_message",
                &params(&[
                    ("to", json!("1")),
                    ("media_type", json!("image")),
                    ("media_id", json!("m1")),
                    ("caption", json!("a photo")),
                ]),
            )
            .unwrap();
        match result.body {
            RequestBody::Json(v) => {
                assert_eq!(v["image"]["id"], "m1");
                assert_eq!(v["image"]["caption"], "a photo");
            }
            _ => panic!("expected JSON body"),
        }
    }

    #[test]
    fn send_template_message_defaults_language_code() {
        let connector = WhatsAppConnector::new("1234567890", None);
        let result = connector
            .execute(
                "send_template_message",
                &params(&[("to", json!("1")), ("template_name", json!("hello_world"))]),
            )
            .unwrap();
        match result.body {
            RequestBody::Json(v) => assert_eq!(v["template"]["language"]["code"], "en_US"),
            _ => panic!("expected JSON body"),
        }
    }

    #[test]
    fn upload_media_overrides_content_type_header() {
        let connector = WhatsAppConnector::new("1234567890", None);
        let result = connector
            .execute(
                "upload_media",
                &params(&[("file_path", json!("/tmp/a.png")), ("mime_type", json!("image/png"))]),
            )
            .unwrap();
        assert_eq!(result.headers.get("Content-Type").unwrap(), "image/png");
    }

    #[test]
    fn get_media_uses_plain_graph_root_not_phone_scoped_base() {
        let connector = WhatsAppConnector::new("1234567890", None);
        let result = connector
            .execute("get_media", &params(&[("media_id", json!("m99"))]))
            .unwrap();
        assert_eq!(result.url, "https://graph.facebook.com/v21.0/m99");
    }
}
