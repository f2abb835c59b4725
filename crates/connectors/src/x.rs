//! X (Twitter) API v2 connector. Auth is OAuth 1.0a — the governed
//! proxy signs requests from the four `oauth_*` vault keys named in
//! each result's metadata.

use crate::base::{opt_str, require_str, Connector, ConnectorState};
use cplane_core::{
    CapabilityClass, ConnectorManifest, ConnectorOperation, ConnectorResult, ConnectorSource,
    ConnectorStatus, CredentialSpec, HttpMethod, ModelError, ParameterSpec, RequestBody, RiskTier,
};
use cplane_vault::CredentialVault;
use serde_json::json;
use std::collections::HashMap;

const X_API_BASE: &str = "https://api.x.com/2";
const DEFAULT_USER_FIELDS: &str = "id,name,username,description,profile_image_url";

pub struct XConnector {
    state: ConnectorState,
}

impl XConnector {
    pub fn new() -> Self {
        let manifest = ConnectorManifest {
            id: "x".into(),
            name: "X (Twitter) Integration".into(),
            version: "1.0.0".into(),
            author: "lancelot".into(),
            source: ConnectorSource::FirstParty,
            description: "X API v2 for posting tweets, deleting tweets, and reading account info".into(),
            target_domains: vec!["api.x.com".into()],
            required_credentials: vec![
                CredentialSpec {
                    name: "x_api_key".into(),
                    credential_type: "api_key".into(),
                    vault_key: "x.api_key".into(),
                    required: true,
                    scopes: vec![],
                },
                CredentialSpec {
                    name: "x_api_key_secret".into(),
                    credential_type: "api_key".into(),
                    vault_key: "x.api_key_secret".into(),
                    required: true,
                    scopes: vec![],
                },
                CredentialSpec {
                    name: "x_access_token".into(),
                    credential_type: "api_key".into(),
                    vault_key: "x.access_token".into(),
                    required: true,
                    scopes: vec![],
                },
                CredentialSpec {
                    name: "x_access_token_secret".into(),
                    credential_type: "api_key".into(),
                    vault_key: "x.access_token_secret".into(),
                    required: true,
                    scopes: vec![],
                },
            ],
            data_reads: vec!["Account info (username, display name, ID)".into()],
            data_writes: vec!["Post tweets".into(), "Delete tweets".into()],
            does_not_access: vec![
                "Direct messages".into(),
                "Follower lists".into(),
                "Likes and bookmarks".into(),
                "User search".into(),
                "Spaces".into(),
            ],
        };
        Self {
            state: ConnectorState::new(manifest),
        }
    }
}

impl Default for XConnector {
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
        connector_id: "x".into(),
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

fn param(name: &str, required: bool, description: &str, default: Option<serde_json::Value>) -> ParameterSpec {
    ParameterSpec {
        name: name.into(),
        param_type: "str".into(),
        required,
        description: description.into(),
        default,
    }
}

fn oauth1_metadata() -> HashMap<String, serde_json::Value> {
    let mut m = HashMap::new();
    m.insert("auth_type".to_string(), json!("oauth1"));
    m.insert("oauth_consumer_key".to_string(), json!("x.api_key"));
    m.insert("oauth_consumer_secret".to_string(), json!("x.api_key_secret"));
    m.insert("oauth_token_key".to_string(), json!("x.access_token"));
    m.insert("oauth_token_secret".to_string(), json!("x.access_token_secret"));
    m
}

fn content_json_headers() -> HashMap<String, String> {
    let mut h = HashMap::new();
    h.insert("Content-Type".to_string(), "application/json".to_string());
    h
}

impl Connector for XConnector {
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
                "get_me",
                CapabilityClass::Read,
                "Get Account Info",
                "Get authenticated user's account information",
                RiskTier::T0Inert,
                true,
                false,
                "",
                vec![param(
                    "user_fields",
                    false,
                    "Comma-separated list of user fields to return",
                    Some(json!(DEFAULT_USER_FIELDS)),
                )],
            ),
            op(
                "post_tweet",
                CapabilityClass::Write,
                "Post Tweet",
                "Post a new tweet (max 280 characters)",
                RiskTier::T1Reversible,
                false,
                true,
                "delete_tweet",
                vec![
                    param("text", true, "Tweet text (max 280 characters)", None),
                    param("reply_to", false, "Tweet ID to reply to", Some(json!(""))),
                    param("quote_tweet_id", false, "Tweet ID to quote", Some(json!(""))),
                ],
            ),
            op(
                "delete_tweet",
                CapabilityClass::Delete,
                "Delete Tweet",
                "Delete a tweet by ID (irreversible)",
                RiskTier::T3Irreversible,
                true,
                false,
                "",
                vec![param("tweet_id", true, "ID of the tweet to delete", None)],
            ),
        ]
    }

    fn execute(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<ConnectorResult, ModelError> {
        let cred_key = "x.api_key".to_string();

        let result = match operation_id {
            "get_me" => {
                let user_fields = opt_str(params, "user_fields").unwrap_or(DEFAULT_USER_FIELDS);
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "x".into(),
                    method: HttpMethod::Get,
                    url: format!("{X_API_BASE}/users/me?user.fields={user_fields}"),
                    headers: content_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: oauth1_metadata(),
                }
            }
            "post_tweet" => {
                let text = require_str(params, operation_id, "text")?;
                let mut body = json!({"text": text});
                if let Some(reply_to) = opt_str(params, "reply_to").filter(|s| !s.is_empty()) {
                    body["reply"] = json!({"in_reply_to_tweet_id": reply_to});
                }
                if let Some(quote_tweet_id) = opt_str(params, "quote_tweet_id").filter(|s| !s.is_empty()) {
                    body["quote_tweet_id"] = json!(quote_tweet_id);
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "x".into(),
                    method: HttpMethod::Post,
                    url: format!("{X_API_BASE}/tweets"),
                    headers: content_json_headers(),
                    body: RequestBody::Json(body),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: oauth1_metadata(),
                }
            }
            "delete_tweet" => {
                let tweet_id = require_str(params, operation_id, "tweet_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "x".into(),
                    method: HttpMethod::Delete,
                    url: format!("{X_API_BASE}/tweets/{tweet_id}"),
                    headers: content_json_headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: oauth1_metadata(),
                }
            }
            other => {
                return Err(ModelError::InvalidOperation {
                    connector_id: "x".into(),
                    operation_id: other.into(),
                    reason: "unknown operation".into(),
                })
            }
        };
        Ok(result)
    }

    fn validate_credentials(&self, vault: &CredentialVault) -> bool {
        vault.exists("x.api_key")
            && vault.exists("x.api_key_secret")
            && vault.exists("x.access_token")
            && vault.exists("x.access_token_secret")
    }
}
