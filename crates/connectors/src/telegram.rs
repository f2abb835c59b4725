//! Telegram Bot API connector. The bot token lives in the URL path,
//! not a header — the proxy substitutes `{token}` at execution time.

use crate::base::{opt_i64, opt_str, require_str, Connector, ConnectorState};
use cplane_core::{
    CapabilityClass, ConnectorManifest, ConnectorOperation, ConnectorResult, ConnectorSource,
    ConnectorStatus, CredentialSpec, HttpMethod, ModelError, ParameterSpec, RequestBody, RiskTier,
};
use cplane_vault::CredentialVault;
use serde_json::json;
use std::collections::HashMap;

const TG_API_BASE: &str = "https://api.telegram.org/bot";

pub struct TelegramConnector {
    state: ConnectorState,
}

impl TelegramConnector {
    pub fn new() -> Self {
        let manifest = ConnectorManifest {
            id: "telegram".into(),
            name: "Telegram Integration".into(),
            version: "1.0.0".into(),
            author: "lancelot".into(),
            source: ConnectorSource::FirstParty,
            description: "Telegram Bot API for sending and receiving messages, voice notes, photos, and documents"
                .into(),
            target_domains: vec!["api.telegram.org".into()],
            required_credentials: vec![
                CredentialSpec {
                    name: "telegram_bot_token".into(),
                    credential_type: "api_key".into(),
                    vault_key: "telegram.bot_token".into(),
                    required: true,
                    scopes: vec![],
                },
                CredentialSpec {
                    name: "telegram_chat_id".into(),
                    credential_type: "config".into(),
                    vault_key: "telegram.chat_id".into(),
                    required: false,
                    scopes: vec![],
                },
            ],
            data_reads: vec!["Messages (text, voice, photo, document)".into(), "Chat info".into(), "File downloads".into()],
            data_writes: vec!["Send messages".into(), "Send voice notes".into(), "Send photos".into()],
            does_not_access: vec![
                "Other chats unless configured".into(),
                "User profile data".into(),
                "Admin operations".into(),
            ],
        };
        Self {
            state: ConnectorState::new(manifest),
        }
    }
}

impl Default for TelegramConnector {
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
        connector_id: "telegram".into(),
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

fn url_token_metadata() -> HashMap<String, serde_json::Value> {
    let mut m = HashMap::new();
    m.insert("auth_type".to_string(), json!("url_token"));
    m
}

impl Connector for TelegramConnector {
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
                "get_updates",
                CapabilityClass::Read,
                "Get Updates",
                "Long-poll for new messages via getUpdates",
                RiskTier::T0Inert,
                true,
                vec![
                    param("offset", "int", false, Some(json!(0))),
                    param("timeout", "int", false, Some(json!(30))),
                    param("limit", "int", false, Some(json!(100))),
                ],
            ),
            op(
                "get_me",
                CapabilityClass::Read,
                "Get Bot Info",
                "Get information about the bot",
                RiskTier::T0Inert,
                true,
                vec![],
            ),
            op(
                "get_chat",
                CapabilityClass::Read,
                "Get Chat Info",
                "Get information about a chat",
                RiskTier::T0Inert,
                true,
                vec![param("chat_id", "str", true, None)],
            ),
            op(
                "get_file",
                CapabilityClass::Read,
                "Get File",
                "Get file path for downloading",
                RiskTier::T1Reversible,
                true,
                vec![param("file_id", "str", true, None)],
            ),
            op(
                "send_message",
                CapabilityClass::Write,
                "Send Message",
                "Send a text message to a chat",
                RiskTier::T1Reversible,
                false,
                vec![
                    param("chat_id", "str", true, None),
                    param("text", "str", true, None),
                    param("parse_mode", "str", false, Some(json!("Markdown"))),
                ],
            ),
            op(
                "send_voice",
                CapabilityClass::Write,
                "Send Voice",
                "Send a voice note to a chat",
                RiskTier::T1Reversible,
                false,
                vec![param("chat_id", "str", true, None), param("voice_url", "str", true, None)],
            ),
            op(
                "send_photo",
                CapabilityClass::Write,
                "Send Photo",
                "Send a photo to a chat",
                RiskTier::T1Reversible,
                false,
                vec![
                    param("chat_id", "str", true, None),
                    param("photo_url", "str", true, None),
                    param("caption", "str", false, Some(json!(""))),
                ],
            ),
            op(
                "delete_message",
                CapabilityClass::Delete,
                "Delete Message",
                "Delete a message from a chat",
                RiskTier::T3Irreversible,
                true,
                vec![param("chat_id", "str", true, None), param("message_id", "int", true, None)],
            ),
        ]
    }

    fn execute(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<ConnectorResult, ModelError> {
        let cred_key = "telegram.bot_token".to_string();
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        let result = match operation_id {
            "get_updates" => {
                let offset = opt_i64(params, "offset", 0);
                let timeout = opt_i64(params, "timeout", 30);
                let limit = opt_i64(params, "limit", 100);
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "telegram".into(),
                    method: HttpMethod::Get,
                    url: format!("{TG_API_BASE}{{token}}/getUpdates?offset={offset}&timeout={timeout}&limit={limit}"),
                    headers,
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: url_token_metadata(),
                }
            }
            "get_me" => ConnectorResult {
                operation_id: operation_id.into(),
                connector_id: "telegram".into(),
                method: HttpMethod::Get,
                url: format!("{TG_API_BASE}{{token}}/getMe"),
                headers,
                body: RequestBody::Empty,
                timeout_seconds: 30,
                credential_vault_key: cred_key,
                metadata: url_token_metadata(),
            },
            "get_chat" => {
                let chat_id = require_str(params, operation_id, "chat_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "telegram".into(),
                    method: HttpMethod::Post,
                    url: format!("{TG_API_BASE}{{token}}/getChat"),
                    headers,
                    body: RequestBody::Json(json!({"chat_id": chat_id})),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: url_token_metadata(),
                }
            }
            "get_file" => {
                let file_id = require_str(params, operation_id, "file_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "telegram".into(),
                    method: HttpMethod::Get,
                    url: format!("{TG_API_BASE}{{token}}/getFile?file_id={file_id}"),
                    headers,
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: url_token_metadata(),
                }
            }
            "send_message" => {
                let chat_id = require_str(params, operation_id, "chat_id")?;
                let text = require_str(params, operation_id, "text")?;
                let mut body = json!({"chat_id": chat_id, "text": text});
                if let Some(parse_mode) = opt_str(params, "parse_mode").filter(|s| !s.is_empty()) {
                    body["parse_mode"] = json!(parse_mode);
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "telegram".into(),
                    method: HttpMethod::Post,
                    url: format!("{TG_API_BASE}{{token}}/sendMessage"),
                    headers,
                    body: RequestBody::Json(body),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: url_token_metadata(),
                }
            }
            "send_voice" => {
                let chat_id = require_str(params, operation_id, "chat_id")?;
                let voice_url = require_str(params, operation_id, "voice_url")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "telegram".into(),
                    method: HttpMethod::Post,
                    url: format!("{TG_API_BASE}{{token}}/sendVoice"),
                    headers,
                    body: RequestBody::Json(json!({"chat_id": chat_id, "voice": voice_url})),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: url_token_metadata(),
                }
            }
            "send_photo" => {
                let chat_id = require_str(params, operation_id, "chat_id")?;
                let photo_url = require_str(params, operation_id, "photo_url")?;
                let mut body = json!({"chat_id": chat_id, "photo": photo_url});
                if let Some(caption) = opt_str(params, "caption").filter(|s| !s.is_empty()) {
                    body["caption"] = json!(caption);
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "telegram".into(),
                    method: HttpMethod::Post,
                    url: format!("{TG_API_BASE}{{token}}/sendPhoto"),
                    headers,
                    body: RequestBody::Json(body),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: url_token_metadata(),
                }
            }
            "delete_message" => {
                let chat_id = require_str(params, operation_id, "chat_id")?;
                let message_id = params
                    .get("message_id")
                    .and_then(|v| v.as_i64())
                    .ok_or_else(|| ModelError::InvalidRequestSpec {
                        operation_id: operation_id.to_string(),
                        reason: "missing required parameter 'message_id'".into(),
                    })?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "telegram".into(),
                    method: HttpMethod::Post,
                    url: format!("{TG_API_BASE}{{token}}/deleteMessage"),
                    headers,
                    body: RequestBody::Json(json!({"chat_id": chat_id, "message_id": message_id})),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: url_token_metadata(),
                }
            }
            other => {
                return Err(ModelError::InvalidOperation {
                    connector_id: "telegram".into(),
                    operation_id: other.into(),
                    reason: "unknown operation".into(),
                })
            }
        };
        Ok(result)
    }

    fn validate_credentials(&self, vault: &CredentialVault) -> bool {
        vault.exists("telegram.bot_token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn urls_carry_token_placeholder() {
        let connector = TelegramConnector::new();
        let result = connector.execute("get_me", &params(&[])).unwrap();
        assert!(result.url.contains("{token}"));
        assert_eq!(result.metadata.get("auth_type").unwrap(), &json!("url_token"));
    }

    #[test]
    fn delete_message_is_t3() {
        let connector = TelegramConnector::new();
        let op = connector
            .get_operations()
            .into_iter()
            .find(|o| o.id == "delete_message")
            .unwrap();
        assert_eq!(op.default_tier, RiskTier::T3Irreversible);
    }

    #[test]
    fn send_message_builds_optional_parse_mode() {
        let connector = TelegramConnector::new();
        let result = connector
            .execute(
                "send_message",
                &params(&[
                    ("chat_id", json!("123")),
                    ("text", json!("hi")),
                    ("parse_mode", json!("MarkdownV2")),
                ]),
            )
            .unwrap();
        match result.body {
            RequestBody::Json(v) => assert_eq!(v["parse_mode"], "MarkdownV2"),
            _ => panic!("expected JSON body"),
        }
    }
}
