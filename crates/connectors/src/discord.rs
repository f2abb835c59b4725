//! Discord REST API v10 connector. Auth is `Authorization: Bot {token}`.

use crate::base::{all_required_credentials_present, opt_i64, require_str, Connector, ConnectorState};
use crate::util::{accept_and_content_json_headers, accept_json_headers, encode_path_segment};
use cplane_core::{
    CapabilityClass, ConnectorManifest, ConnectorOperation, ConnectorResult, ConnectorSource,
    ConnectorStatus, CredentialSpec, HttpMethod, ModelError, ParameterSpec, RequestBody, RiskTier,
};
use cplane_vault::CredentialVault;
use serde_json::json;
use std::collections::HashMap;

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

pub struct DiscordConnector {
    state: ConnectorState,
}

impl DiscordConnector {
    pub fn new() -> Self {
        let manifest = ConnectorManifest {
            id: "discord".into(),
            name: "Discord Integration".into(),
            version: "1.0.0".into(),
            author: "lancelot".into(),
            source: ConnectorSource::FirstParty,
            description: "Discord REST API for reading and posting messages".into(),
            target_domains: vec!["discord.com".into()],
            required_credentials: vec![CredentialSpec {
                name: "discord_bot_token".into(),
                // Carries `Authorization: Bot {token}`, not `X-API-Key` — see the
                // proxy's credential-injection table for why this type matters.
                credential_type: "bot_token".into(),
                vault_key: "discord.bot_token".into(),
                required: true,
                scopes: vec![],
            }],
            data_reads: vec![
                "Channel messages".into(),
                "Guild/server metadata".into(),
                "Channel metadata".into(),
            ],
            data_writes: vec!["New messages".into(), "Reactions".into(), "Message edits".into()],
            does_not_access: vec![
                "DMs unless channel ID provided".into(),
                "User private data".into(),
                "Server settings".into(),
                "Role management".into(),
                "Voice channels".into(),
            ],
        };
        Self {
            state: ConnectorState::new(manifest),
        }
    }
}

impl Default for DiscordConnector {
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
        connector_id: "discord".into(),
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

fn rate_limit_group(channel_id: &str, bucket: &str) -> HashMap<String, serde_json::Value> {
    let mut m = HashMap::new();
    m.insert(
        "rate_limit_group".to_string(),
        json!(format!("discord.channels.{channel_id}.{bucket}")),
    );
    m
}

impl Connector for DiscordConnector {
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
                "list_guilds",
                CapabilityClass::Read,
                "List Guilds",
                "List guilds (servers) the bot has joined",
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
                "List channels in a guild",
                RiskTier::T0Inert,
                true,
                false,
                "",
                vec![param("guild_id", true, None)],
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
                vec![param("channel_id", true, None), param("limit", false, Some(json!(50)))],
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
                vec![param("channel_id", true, None), param("message_id", true, None)],
            ),
            op(
                "post_message",
                CapabilityClass::Write,
                "Post Message",
                "Post a new message to a channel",
                RiskTier::T2Controlled,
                false,
                true,
                "delete_message",
                vec![param("channel_id", true, None), param("text", true, None)],
            ),
            op(
                "edit_message",
                CapabilityClass::Write,
                "Edit Message",
                "Edit an existing message",
                RiskTier::T2Controlled,
                true,
                true,
                "edit_message",
                vec![
                    param("channel_id", true, None),
                    param("message_id", true, None),
                    param("text", true, None),
                ],
            ),
            op(
                "add_reaction",
                CapabilityClass::Write,
                "Add Reaction",
                "Add an emoji reaction to a message",
                RiskTier::T1Reversible,
                true,
                true,
                "remove_reaction",
                vec![
                    param("channel_id", true, None),
                    param("message_id", true, None),
                    param("emoji", true, None),
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
                vec![param("channel_id", true, None), param("message_id", true, None)],
            ),
            op(
                "remove_reaction",
                CapabilityClass::Delete,
                "Remove Reaction",
                "Remove own emoji reaction from a message",
                RiskTier::T1Reversible,
                true,
                false,
                "",
                vec![
                    param("channel_id", true, None),
                    param("message_id", true, None),
                    param("emoji", true, None),
                ],
            ),
        ]
    }

    fn execute(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<ConnectorResult, ModelError> {
        let cred_key = "discord.bot_token".to_string();

        let result = match operation_id {
            "list_guilds" => ConnectorResult {
                operation_id: operation_id.into(),
                connector_id: "discord".into(),
                method: HttpMethod::Get,
                url: format!("{DISCORD_API_BASE}/users/@me/guilds"),
                headers: accept_json_headers(),
                body: RequestBody::Empty,
                timeout_seconds: 30,
                credential_vault_key: cred_key,
                metadata: HashMap::new(),
            },
            "list_channels" => {
                let guild_id = require_str(params, operation_id, "guild_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "discord".into(),
                    method: HttpMethod::Get,
                    url: format!("{DISCORD_API_BASE}/guilds/{guild_id}/channels"),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "read_messages" => {
                let channel_id = require_str(params, operation_id, "channel_id")?;
                let limit = opt_i64(params, "limit", 50);
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "discord".into(),
                    method: HttpMethod::Get,
                    url: format!("{DISCORD_API_BASE}/channels/{channel_id}/messages?limit={limit}"),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: rate_limit_group(channel_id, "messages"),
                }
            }
            "get_message" => {
                let channel_id = require_str(params, operation_id, "channel_id")?;
                let message_id = require_str(params, operation_id, "message_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "discord".into(),
                    method: HttpMethod::Get,
                    url: format!("{DISCORD_API_BASE}/channels/{channel_id}/messages/{message_id}"),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: rate_limit_group(channel_id, "messages"),
                }
            }
            "post_message" => {
                let channel_id = require_str(params, operation_id, "channel_id")?;
                let text = require_str(params, operation_id, "text")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "discord".into(),
                    method: HttpMethod::Post,
                    url: format!("{DISCORD_API_BASE}/channels/{channel_id}/messages"),
                    headers: accept_and_content_json_headers(),
                    body: RequestBody::Json(json!({"content": text})),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: rate_limit_group(channel_id, "messages"),
                }
            }
            "edit_message" => {
                let channel_id = require_str(params, operation_id, "channel_id")?;
                let message_id = require_str(params, operation_id, "message_id")?;
                let text = require_str(params, operation_id, "text")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "discord".into(),
                    method: HttpMethod::Patch,
                    url: format!("{DISCORD_API_BASE}/channels/{channel_id}/messages/{message_id}"),
                    headers: accept_and_content_json_headers(),
                    body: RequestBody::Json(json!({"content": text})),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: rate_limit_group(channel_id, "messages"),
                }
            }
            "add_reaction" => {
                let channel_id = require_str(params, operation_id, "channel_id")?;
                let message_id = require_str(params, operation_id, "message_id")?;
                let emoji = encode_path_segment(require_str(params, operation_id, "emoji")?);
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "discord".into(),
                    method: HttpMethod::Put,
                    url: format!("{DISCORD_API_BASE}/channels/{channel_id}/messages/{message_id}/reactions/{emoji}/@me"),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: rate_limit_group(channel_id, "reactions"),
                }
            }
            "delete_message" => {
                let channel_id = require_str(params, operation_id, "channel_id")?;
                let message_id = require_str(params, operation_id, "message_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "discord".into(),
                    method: HttpMethod::Delete,
                    url: format!("{DISCORD_API_BASE}/channels/{channel_id}/messages/{message_id}"),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: rate_limit_group(channel_id, "messages"),
                }
            }
            "remove_reaction" => {
                let channel_id = require_str(params, operation_id, "channel_id")?;
                let message_id = require_str(params, operation_id, "message_id")?;
                let emoji = encode_path_segment(require_str(params, operation_id, "emoji")?);
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "discord".into(),
                    method: HttpMethod::Delete,
                    url: format!("{DISCORD_API_BASE}/channels/{channel_id}/messages/{message_id}/reactions/{emoji}/@me"),
                    headers: accept_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: rate_limit_group(channel_id, "reactions"),
                }
            }
            other => {
                return Err(ModelError::InvalidOperation {
                    connector_id: "discord".into(),
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
    fn credential_type_is_bot_token_not_api_key() {
        let connector = DiscordConnector::new();
        assert_eq!(connector.manifest().required_credentials[0].credential_type, "bot_token");
    }

    #[test]
    fn add_reaction_percent_encodes_emoji() {
        let connector = DiscordConnector::new();
        let result = connector
            .execute(
                "add_reaction",
                &params(&[
                    ("channel_id", json!("c1")),
                    ("message_id", json!("m1")),
                    ("emoji", json!("👍")),
                ]),
            )
            .unwrap();
        assert!(result.url.contains("/reactions/"));
        assert!(!result.url.contains('👍'));
    }

    #[test]
    fn read_messages_carries_per_channel_rate_limit_group() {
        let connector = DiscordConnector::new();
        let result = connector
            .execute("read_messages", &params(&[("channel_id", json!("c1"))]))
            .unwrap();
        assert_eq!(
            result.metadata.get("rate_limit_group").unwrap(),
            &json!("discord.channels.c1.messages")
        );
    }

    #[test]
    fn post_message_is_t2() {
        let connector = DiscordConnector::new();
        let op = connector
            .get_operations()
            .into_iter()
            .find(|o| o.id == "post_message")
            .unwrap();
        assert_eq!(op.default_tier, RiskTier::T2Controlled);
    }
}
