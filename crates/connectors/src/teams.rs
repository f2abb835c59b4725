//! Microsoft Teams connector via Microsoft Graph.

use crate::base::{all_required_credentials_present, opt_i64, opt_str_or, require_str, Connector, ConnectorState};
use crate::util::{accept_and_content_json_headers, accept_json_headers};
use cplane_core::{
    CapabilityClass, ConnectorManifest, ConnectorOperation, ConnectorResult, ConnectorSource,
    ConnectorStatus, CredentialSpec, HttpMethod, ModelError, ParameterSpec, RequestBody, RiskTier,
};
use cplane_vault::CredentialVault;
use serde_json::json;
use std::collections::HashMap;

const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

pub struct TeamsConnector {
    state: ConnectorState,
}

impl TeamsConnector {
    pub fn new() -> Self {
        let manifest = ConnectorManifest {
            id: "teams".into(),
            name: "Microsoft Teams Integration".into(),
            version: "1.0.0".into(),
            author: "lancelot".into(),
            source: ConnectorSource::FirstParty,
            description: "Microsoft Graph API for Teams channels and chats".into(),
            target_domains: vec!["graph.microsoft.com".into()],
            required_credentials: vec![CredentialSpec {
                name: "teams_access_token".into(),
                credential_type: "oauth_token".into(),
                vault_key: "teams.graph_token".into(),
                required: true,
                scopes: vec![
                    "ChannelMessage.Read.All".into(),
                    "ChannelMessage.Send".into(),
                    "Chat.Read".into(),
                    "Chat.ReadWrite".into(),
                    "Team.ReadBasic.All".into(),
                    "Channel.ReadBasic.All".into(),
                ],
            }],
            data_reads: vec!["Channel messages".into(), "Chat messages".into(), "Team/channel metadata".into()],
            data_writes: vec!["New channel messages".into(), "New chat messages".into(), "Message replies".into()],
            does_not_access: vec![
                "Email".into(),
                "Calendar".into(),
                "OneDrive files".into(),
                "User profiles beyond display name".into(),
                "Admin settings".into(),
            ],
        };
        Self {
            state: ConnectorState::new(manifest),
        }
    }
}

impl Default for TeamsConnector {
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
        connector_id: "teams".into(),
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

fn message_body(text: &str, content_type: &str) -> serde_json::Value {
    json!({"body": {"content": text, "contentType": content_type}})
}

impl Connector for TeamsConnector {
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
                "list_teams",
                CapabilityClass::Read,
                "List Joined Teams",
                "List teams the authenticated user has joined",
                RiskTier::T0Inert,
                true,
                false,
                "",
                vec![],
            ),
            op(
                "list_channels",
                CapabilityClass::Read,
                "List Channels",
                "List channels in a team",
                RiskTier::T0Inert,
                true,
                false,
                "",
                vec![param("team_id", true, None)],
            ),
            op(
                "read_messages",
                CapabilityClass::Read,
                "Read Channel Messages",
                "Read messages from a team channel",
                RiskTier::T1Reversible,
                true,
                false,
                "",
                vec![
                    param("team_id", true, None),
                    param("channel_id", true, None),
                    param("limit", false, Some(json!(50))),
                ],
            ),
            op(
                "get_message",
                CapabilityClass::Read,
                "Get Channel Message",
                "Get a single message from a team channel",
                RiskTier::T1Reversible,
                true,
                false,
                "",
                vec![
                    param("team_id", true, None),
                    param("channel_id", true, None),
                    param("message_id", true, None),
                ],
            ),
            op(
                "read_replies",
                CapabilityClass::Read,
                "Read Message Replies",
                "Read replies to a channel message",
                RiskTier::T1Reversible,
                true,
                false,
                "",
                vec![
                    param("team_id", true, None),
                    param("channel_id", true, None),
                    param("message_id", true, None),
                ],
            ),
            op(
                "read_chat_messages",
                CapabilityClass::Read,
                "Read Chat Messages",
                "Read messages from a 1:1 or group chat",
                RiskTier::T1Reversible,
                true,
                false,
                "",
                vec![param("chat_id", true, None), param("limit", false, Some(json!(50)))],
            ),
            op(
                "post_channel_message",
                CapabilityClass::Write,
                "Post Channel Message",
                "Post a new message to a team channel",
                RiskTier::T2Controlled,
                false,
                true,
                "delete_message",
                vec![
                    param("team_id", true, None),
                    param("channel_id", true, None),
                    param("text", true, None),
                    param("content_type", false, Some(json!("text"))),
                ],
            ),
            op(
                "reply_to_message",
                CapabilityClass::Write,
                "Reply to Message",
                "Reply to a channel message",
                RiskTier::T2Controlled,
                false,
                false,
                "",
                vec![
                    param("team_id", true, None),
                    param("channel_id", true, None),
                    param("message_id", true, None),
                    param("text", true, None),
                    param("content_type", false, Some(json!("text"))),
                ],
            ),
            op(
                "send_chat_message",
                CapabilityClass::Write,
                "Send Chat Message",
                "Send a message to a 1:1 or group chat",
                RiskTier::T3Irreversible,
                false,
                false,
                "",
                vec![
                    param("chat_id", true, None),
                    param("text", true, None),
                    param("content_type", false, Some(json!("text"))),
                ],
            ),
            op(
                "delete_message",
                CapabilityClass::Delete,
                "Delete Channel Message",
                "Soft-delete a message from a team channel",
                RiskTier::T3Irreversible,
                true,
                false,
                "",
                vec![
                    param("team_id", true, None),
                    param("channel_id", true, None),
                    param("message_id", true, None),
                ],
            ),
        ]
    }

    fn execute(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<ConnectorResult, ModelError> {
        let cred_key = "teams.graph_token".to_string();

        let result = match operation_id {
            "list_teams" => ConnectorResult {
                operation_id: operation_id.into(),
                connector_id: "teams".into(),
                method: HttpMethod::Get,
                url: format!("{GRAPH_API_BASE}/me/joinedTeams"),
                headers: accept_json_headers(),
                body: RequestBody::Empty,
                timeout_seconds: 30,
                credential_vault_key: cred_key,
                metadata: HashMap::new(),
            },
            "list_channels" => {
                let team_id = require_str(params, operation_id, "team_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "teams".into(),
                    method: HttpMethod::Get,
                    url: format!("{GRAPH_API_BASE}/teams/{team_id}/channels"),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "read_messages" => {
                let team_id = require_str(params, operation_id, "team_id")?;
                let channel_id = require_str(params, operation_id, "channel_id")?;
                let limit = opt_i64(params, "limit", 50);
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "teams".into(),
                    method: HttpMethod::Get,
                    url: format!("{GRAPH_API_BASE}/teams/{team_id}/channels/{channel_id}/messages?$top={limit}"),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "get_message" => {
                let team_id = require_str(params, operation_id, "team_id")?;
                let channel_id = require_str(params, operation_id, "channel_id")?;
                let message_id = require_str(params, operation_id, "message_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "teams".into(),
                    method: HttpMethod::Get,
                    url: format!("{GRAPH_API_BASE}/teams/{team_id}/channels/{channel_id}/messages/{message_id}"),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "read_replies" => {
                let team_id = require_str(params, operation_id, "team_id")?;
                let channel_id = require_str(params, operation_id, "channel_id")?;
                let message_id = require_str(params, operation_id, "message_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "teams".into(),
                    method: HttpMethod::Get,
                    url: format!(
                        "{GRAPH_API_BASE}/teams/{team_id}/channels/{channel_id}/messages/{message_id}/replies"
                    ),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "read_chat_messages" => {
                let chat_id = require_str(params, operation_id, "chat_id")?;
                let limit = opt_i64(params, "limit", 50);
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "teams".into(),
                    method: HttpMethod::Get,
                    url: format!("{GRAPH_API_BASE}/chats/{chat_id}/messages?$top={limit}"),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "post_channel_message" => {
                let team_id = require_str(params, operation_id, "team_id")?;
                let channel_id = require_str(params, operation_id, "channel_id")?;
                let text = require_str(params, operation_id, "text")?;
                let content_type = opt_str_or(params, "content_type", "text");
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "teams".into(),
                    method: HttpMethod::Post,
                    url: format!("{GRAPH_API_BASE}/teams/{team_id}/channels/{channel_id}/messages"),
                    headers: accept_and_content_json_headers(),
                    body: RequestBody::Json(message_body(text, content_type)),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "reply_to_message" => {
                let team_id = require_str(params, operation_id, "team_id")?;
                let channel_id = require_str(params, operation_id, "channel_id")?;
                let message_id = require_str(params, operation_id, "message_id")?;
                let text = require_str(params, operation_id, "text")?;
                let content_type = opt_str_or(params, "content_type", "text");
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "teams".into(),
                    method: HttpMethod::Post,
                    url: format!(
                        "{GRAPH_API_BASE}/teams/{team_id}/channels/{channel_id}/messages/{message_id}/replies"
                    ),
                    headers: accept_and_content_json_headers(),
                    body: RequestBody::Json(message_body(text, content_type)),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "send_chat_message" => {
                let chat_id = require_str(params, operation_id, "chat_id")?;
                let text = require_str(params, operation_id, "text")?;
                let content_type = opt_str_or(params, "content_type", "text");
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "teams".into(),
                    method: HttpMethod::Post,
                    url: format!("{GRAPH_API_BASE}/chats/{chat_id}/messages"),
                    headers: accept_and_content_json_headers(),
                    body: RequestBody::Json(message_body(text, content_type)),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "delete_message" => {
                let team_id = require_str(params, operation_id, "team_id")?;
                let channel_id = require_str(params, operation_id, "channel_id")?;
                let message_id = require_str(params, operation_id, "message_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "teams".into(),
                    method: HttpMethod::Delete,
                    url: format!("{GRAPH_API_BASE}/teams/{team_id}/channels/{channel_id}/messages/{message_id}"),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            other => {
                return Err(ModelError::InvalidOperation {
                    connector_id: "teams".into(),
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

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn send_chat_message_is_t3() {
        let connector = TeamsConnector::new();
        let op = connector
            .get_operations()
            .into_iter()
            .find(|o| o.id == "send_chat_message")
            .unwrap();
        assert_eq!(op.default_tier, RiskTier::T3Irreversible);
    }

    #[test]
    fn post_channel_message_nests_body_content_type() {
        let connector = TeamsConnector::new();
        let result = connector
            .execute(
                "post_channel_message",
                &params(&[
                    ("team_id", json!("t1")),
                    ("channel_id", json!("c1")),
                    ("text", json!("hello")),
                ]),
            )
            .unwrap();
        match result.body {
            RequestBody::Json(v) => {
                assert_eq!(v["body"]["content"], "hello");
                assert_eq!(v["body"]["contentType"], "text");
            }
            _ => panic!("expected JSON body"),
        }
    }

    #[test]
    fn read_messages_uses_graph_top_query_param() {
        let connector = TeamsConnector::new();
        let result = connector
            .execute(
                "read_messages",
                &params(&[("team_id", json!("t1")), ("channel_id", json!("c1"))]),
            )
            .unwrap();
        assert!(result.url.contains("$top=50"));
    }
}
