//! Slack Web API connector.

use crate::base::{all_required_credentials_present, opt_i64, opt_str, require_str, Connector, ConnectorState};
use crate::util::json_headers;
use cplane_core::{
    CapabilityClass, ConnectorManifest, ConnectorOperation, ConnectorResult, ConnectorSource,
    ConnectorStatus, CredentialSpec, HttpMethod, ModelError, ParameterSpec, RequestBody, RiskTier,
};
use cplane_vault::CredentialVault;
use serde_json::json;
use std::collections::HashMap;

const SLACK_API_BASE: &str = "https://slack.com/api";

pub struct SlackConnector {
    state: ConnectorState,
}

impl SlackConnector {
    pub fn new() -> Self {
        let manifest = ConnectorManifest {
            id: "slack".into(),
            name: "Slack Integration".into(),
            version: "1.0.0".into(),
            author: "lancelot".into(),
            source: ConnectorSource::FirstParty,
            description: "Slack Web API for reading and posting messages".into(),
            target_domains: vec!["slack.com".into()],
            required_credentials: vec![CredentialSpec {
                name: "slack_bot_token".into(),
                credential_type: "oauth_token".into(),
                vault_key: "slack.bot_token".into(),
                required: true,
                scopes: vec![
                    "channels:read".into(),
                    "channels:history".into(),
                    "chat:write".into(),
                    "reactions:write".into(),
                    "files:write".into(),
                ],
            }],
            data_reads: vec!["Slack messages (text, user, timestamp)".into(), "Channel metadata".into()],
            data_writes: vec!["New messages".into(), "Emoji reactions".into()],
            does_not_access: vec!["DMs unless approved".into(), "User profiles".into(), "Admin settings".into()],
        };
        Self {
            state: ConnectorState::new(manifest),
        }
    }
}

impl Default for SlackConnector {
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
    reversible: bool,
    rollback_operation_id: &str,
    parameters: Vec<ParameterSpec>,
) -> ConnectorOperation {
    ConnectorOperation {
        id: id.into(),
        connector_id: "slack".into(),
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

fn param(name: &str, required: bool, default: Option<serde_json::Value>) -> ParameterSpec {
    ParameterSpec {
        name: name.into(),
        param_type: "str".into(),
        required,
        description: String::new(),
        default,
    }
}

impl Connector for SlackConnector {
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
                "read_channels",
                CapabilityClass::Read,
                "Read Channels",
                "List all channels",
                RiskTier::T0Inert,
                true,
                false,
                "",
                vec![],
            ),
            op(
                "read_messages",
                CapabilityClass::Read,
                "Read Messages",
                "Read message history from a channel",
                RiskTier::T1Reversible,
                true,
                false,
                "",
                vec![
                    param("channel", true, None),
                    param("limit", false, Some(json!(50))),
                    param("oldest", false, Some(json!(""))),
                ],
            ),
            op(
                "read_threads",
                CapabilityClass::Read,
                "Read Threads",
                "Read thread replies",
                RiskTier::T1Reversible,
                true,
                false,
                "",
                vec![param("channel", true, None), param("thread_ts", true, None)],
            ),
            op(
                "post_message",
                CapabilityClass::Write,
                "Post Message",
                "Post a message to a channel",
                RiskTier::T2Controlled,
                false,
                true,
                "delete_message",
                vec![
                    param("channel", true, None),
                    param("text", true, None),
                    param("thread_ts", false, Some(json!(""))),
                ],
            ),
            op(
                "add_reaction",
                CapabilityClass::Write,
                "Add Reaction",
                "Add emoji reaction to a message",
                RiskTier::T1Reversible,
                true,
                true,
                "",
                vec![
                    param("channel", true, None),
                    param("timestamp", true, None),
                    param("name", true, None),
                ],
            ),
            op(
                "upload_file",
                CapabilityClass::Write,
                "Upload File",
                "Upload file content to a channel",
                RiskTier::T2Controlled,
                false,
                false,
                "",
                vec![
                    param("channels", true, None),
                    param("content", true, None),
                    param("filename", false, Some(json!("upload.txt"))),
                    param("title", false, Some(json!(""))),
                ],
            ),
            op(
                "delete_message",
                CapabilityClass::Delete,
                "Delete Message",
                "Delete a message from a channel",
                RiskTier::T3Irreversible,
                true,
                false,
                "",
                vec![param("channel", true, None), param("ts", true, None)],
            ),
        ]
    }

    fn execute(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<ConnectorResult, ModelError> {
        let cred_key = "slack.bot_token".to_string();
        let headers = json_headers();

        let result = match operation_id {
            "read_channels" => ConnectorResult {
                operation_id: operation_id.into(),
                connector_id: "slack".into(),
                method: HttpMethod::Get,
                url: format!("{SLACK_API_BASE}/conversations.list"),
                headers,
                body: RequestBody::Empty,
                timeout_seconds: 30,
                credential_vault_key: cred_key,
                metadata: HashMap::new(),
            },
            "read_messages" => {
                let channel = require_str(params, operation_id, "channel")?;
                let limit = opt_i64(params, "limit", 50);
                let mut url = format!("{SLACK_API_BASE}/conversations.history?channel={channel}&limit={limit}");
                if let Some(oldest) = opt_str(params, "oldest").filter(|s| !s.is_empty()) {
                    url.push_str(&format!("&oldest={oldest}"));
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "slack".into(),
                    method: HttpMethod::Get,
                    url,
                    headers,
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "read_threads" => {
                let channel = require_str(params, operation_id, "channel")?;
                let ts = require_str(params, operation_id, "thread_ts")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "slack".into(),
                    method: HttpMethod::Get,
                    url: format!("{SLACK_API_BASE}/conversations.replies?channel={channel}&ts={ts}"),
                    headers,
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "post_message" => {
                let channel = require_str(params, operation_id, "channel")?;
                let text = require_str(params, operation_id, "text")?;
                let mut body = json!({"channel": channel, "text": text});
                if let Some(thread_ts) = opt_str(params, "thread_ts").filter(|s| !s.is_empty()) {
                    body["thread_ts"] = json!(thread_ts);
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "slack".into(),
                    method: HttpMethod::Post,
                    url: format!("{SLACK_API_BASE}/chat.postMessage"),
                    headers,
                    body: RequestBody::Json(body),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "add_reaction" => {
                let channel = require_str(params, operation_id, "channel")?;
                let timestamp = require_str(params, operation_id, "timestamp")?;
                let name = require_str(params, operation_id, "name")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "slack".into(),
                    method: HttpMethod::Post,
                    url: format!("{SLACK_API_BASE}/reactions.add"),
                    headers,
                    body: RequestBody::Json(json!({"channel": channel, "timestamp": timestamp, "name": name})),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "upload_file" => {
                let channels = require_str(params, operation_id, "channels")?;
                let content = require_str(params, operation_id, "content")?;
                let filename = opt_str(params, "filename").unwrap_or("upload.txt");
                let mut body = json!({"channels": channels, "content": content, "filename": filename});
                if let Some(title) = opt_str(params, "title").filter(|s| !s.is_empty()) {
                    body["title"] = json!(title);
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "slack".into(),
                    method: HttpMethod::Post,
                    url: format!("{SLACK_API_BASE}/files.upload"),
                    headers,
                    body: RequestBody::Json(body),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "delete_message" => {
                let channel = require_str(params, operation_id, "channel")?;
                let ts = require_str(params, operation_id, "ts")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "slack".into(),
                    method: HttpMethod::Post,
                    url: format!("{SLACK_API_BASE}/chat.delete"),
                    headers,
                    body: RequestBody::Json(json!({"channel": channel, "ts": ts})),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            other => {
                return Err(ModelError::InvalidOperation {
                    connector_id: "slack".into(),
                    operation_id: other.into(),
                    reason: "unknown operation".into(),
                })
            }
        };
        Ok(result)
    }

    fn validate_credentials(&self, vault: &CredentialVault) -> bool {
        all_required_credentials_present(self.manifest(), vault)
    }
}
