//! Google Calendar API connector.

use crate::base::{opt_i64, opt_str, opt_str_or, require_str, Connector, ConnectorState};
use cplane_core::{
    CapabilityClass, ConnectorManifest, ConnectorOperation, ConnectorResult, ConnectorSource,
    ConnectorStatus, CredentialSpec, HttpMethod, ModelError, ParameterSpec, RequestBody, RiskTier,
};
use cplane_vault::CredentialVault;
use serde_json::json;
use std::collections::HashMap;

const GCAL_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

pub struct CalendarConnector {
    state: ConnectorState,
}

impl CalendarConnector {
    pub fn new() -> Self {
        let manifest = ConnectorManifest {
            id: "calendar".into(),
            name: "Calendar Integration".into(),
            version: "1.0.0".into(),
            author: "lancelot".into(),
            source: ConnectorSource::FirstParty,
            description: "Google Calendar API for events and scheduling".into(),
            target_domains: vec!["www.googleapis.com".into()],
            required_credentials: vec![CredentialSpec {
                name: "google_calendar_token".into(),
                credential_type: "oauth_token".into(),
                vault_key: "calendar.google_token".into(),
                required: true,
                scopes: vec!["calendar.readonly".into(), "calendar.events".into()],
            }],
            data_reads: vec!["Calendar events (title, time, attendees)".into()],
            data_writes: vec!["New events, event updates, invitations".into()],
            does_not_access: vec!["Other users' calendars".into(), "Calendar settings".into()],
        };
        Self {
            state: ConnectorState::new(manifest),
        }
    }
}

impl Default for CalendarConnector {
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
        connector_id: "calendar".into(),
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

fn param(name: &str, param_type: &str, required: bool, default: Option<serde_json::Value>) -> ParameterSpec {
    ParameterSpec {
        name: name.into(),
        param_type: param_type.into(),
        required,
        description: String::new(),
        default,
    }
}

fn headers() -> HashMap<String, String> {
    let mut h = HashMap::new();
    h.insert("Accept".to_string(), "application/json".to_string());
    h.insert("Content-Type".to_string(), "application/json".to_string());
    h
}

fn attendees_from(params: &HashMap<String, serde_json::Value>) -> Vec<serde_json::Value> {
    params
        .get("attendees")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(|email| json!({"email": email}))
                .collect()
        })
        .unwrap_or_default()
}

impl Connector for CalendarConnector {
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
                "read_events",
                CapabilityClass::Read,
                "Read Events",
                "List events from a calendar",
                RiskTier::T0Inert,
                true,
                false,
                "",
                vec![
                    param("calendar_id", "str", false, Some(json!("primary"))),
                    param("time_min", "str", false, None),
                    param("time_max", "str", false, None),
                    param("max_results", "int", false, Some(json!(50))),
                ],
            ),
            op(
                "read_availability",
                CapabilityClass::Read,
                "Read Availability",
                "Check free/busy status",
                RiskTier::T0Inert,
                true,
                false,
                "",
                vec![
                    param("calendar_id", "str", false, Some(json!("primary"))),
                    param("time_min", "str", true, None),
                    param("time_max", "str", true, None),
                ],
            ),
            op(
                "create_event",
                CapabilityClass::Write,
                "Create Event",
                "Create a new calendar event",
                RiskTier::T2Controlled,
                false,
                true,
                "delete_event",
                vec![
                    param("calendar_id", "str", false, Some(json!("primary"))),
                    param("summary", "str", true, None),
                    param("start", "str", true, None),
                    param("end", "str", true, None),
                    param("description", "str", false, Some(json!(""))),
                    param("attendees", "list[str]", false, None),
                ],
            ),
            op(
                "update_event",
                CapabilityClass::Write,
                "Update Event",
                "Update an existing calendar event",
                RiskTier::T2Controlled,
                true,
                true,
                "",
                vec![
                    param("calendar_id", "str", false, Some(json!("primary"))),
                    param("event_id", "str", true, None),
                    param("summary", "str", false, None),
                    param("start", "str", false, None),
                    param("end", "str", false, None),
                    param("description", "str", false, None),
                ],
            ),
            op(
                "delete_event",
                CapabilityClass::Delete,
                "Delete Event",
                "Delete a calendar event",
                RiskTier::T3Irreversible,
                true,
                false,
                "",
                vec![
                    param("calendar_id", "str", false, Some(json!("primary"))),
                    param("event_id", "str", true, None),
                ],
            ),
            op(
                "send_invite",
                CapabilityClass::Write,
                "Send Invite",
                "Create event with attendee notifications",
                RiskTier::T3Irreversible,
                false,
                false,
                "",
                vec![
                    param("calendar_id", "str", false, Some(json!("primary"))),
                    param("summary", "str", true, None),
                    param("start", "str", true, None),
                    param("end", "str", true, None),
                    param("attendees", "list[str]", true, None),
                    param("description", "str", false, Some(json!(""))),
                ],
            ),
        ]
    }

    fn execute(
        &self,
        operation_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<ConnectorResult, ModelError> {
        let cred_key = "calendar.google_token".to_string();
        let cal_id = opt_str_or(params, "calendar_id", "primary");

        let result = match operation_id {
            "read_events" => {
                let max_results = opt_i64(params, "max_results", 50);
                let mut qs = vec![format!("maxResults={max_results}")];
                if let Some(time_min) = opt_str(params, "time_min") {
                    qs.push(format!("timeMin={time_min}"));
                }
                if let Some(time_max) = opt_str(params, "time_max") {
                    qs.push(format!("timeMax={time_max}"));
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "calendar".into(),
                    method: HttpMethod::Get,
                    url: format!("{GCAL_API_BASE}/calendars/{cal_id}/events?{}", qs.join("&")),
                    headers: headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "read_availability" => {
                let time_min = require_str(params, operation_id, "time_min")?;
                let time_max = require_str(params, operation_id, "time_max")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "calendar".into(),
                    method: HttpMethod::Post,
                    url: format!("{GCAL_API_BASE}/freeBusy"),
                    headers: headers(),
                    body: RequestBody::Json(json!({
                        "timeMin": time_min,
                        "timeMax": time_max,
                        "items": [{"id": cal_id}],
                    })),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "create_event" => {
                let summary = require_str(params, operation_id, "summary")?;
                let start = require_str(params, operation_id, "start")?;
                let end = require_str(params, operation_id, "end")?;
                let mut body = json!({
                    "summary": summary,
                    "start": {"dateTime": start},
                    "end": {"dateTime": end},
                });
                if let Some(description) = opt_str(params, "description").filter(|s| !s.is_empty()) {
                    body["description"] = json!(description);
                }
                let attendees = attendees_from(params);
                if !attendees.is_empty() {
                    body["attendees"] = json!(attendees);
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "calendar".into(),
                    method: HttpMethod::Post,
                    url: format!("{GCAL_API_BASE}/calendars/{cal_id}/events"),
                    headers: headers(),
                    body: RequestBody::Json(body),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "update_event" => {
                let event_id = require_str(params, operation_id, "event_id")?;
                let mut body = json!({});
                if let Some(summary) = opt_str(params, "summary") {
                    body["summary"] = json!(summary);
                }
                if let Some(start) = opt_str(params, "start") {
                    body["start"] = json!({"dateTime": start});
                }
                if let Some(end) = opt_str(params, "end") {
                    body["end"] = json!({"dateTime": end});
                }
                if let Some(description) = opt_str(params, "description") {
                    body["description"] = json!(description);
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "calendar".into(),
                    method: HttpMethod::Put,
                    url: format!("{GCAL_API_BASE}/calendars/{cal_id}/events/{event_id}"),
                    headers: headers(),
                    body: RequestBody::Json(body),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "delete_event" => {
                let event_id = require_str(params, operation_id, "event_id")?;
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "calendar".into(),
                    method: HttpMethod::Delete,
                    url: format!("{GCAL_API_BASE}/calendars/{cal_id}/events/{event_id}"),
                    headers: headers(),
                    body: RequestBody::Empty,
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            "send_invite" => {
                let summary = require_str(params, operation_id, "summary")?;
                let start = require_str(params, operation_id, "start")?;
                let end = require_str(params, operation_id, "end")?;
                let attendees = attendees_from(params);
                if attendees.is_empty() {
                    return Err(ModelError::InvalidRequestSpec {
                        operation_id: operation_id.to_string(),
                        reason: "missing required parameter 'attendees'".into(),
                    });
                }
                let mut body = json!({
                    "summary": summary,
                    "start": {"dateTime": start},
                    "end": {"dateTime": end},
                    "attendees": attendees,
                });
                if let Some(description) = opt_str(params, "description").filter(|s| !s.is_empty()) {
                    body["description"] = json!(description);
                }
                ConnectorResult {
                    operation_id: operation_id.into(),
                    connector_id: "calendar".into(),
                    method: HttpMethod::Post,
                    url: format!("{GCAL_API_BASE}/calendars/{cal_id}/events?sendUpdates=all"),
                    headers: headers(),
                    body: RequestBody::Json(body),
                    timeout_seconds: 30,
                    credential_vault_key: cred_key,
                    metadata: HashMap::new(),
                }
            }
            other => {
                return Err(ModelError::InvalidOperation {
                    connector_id: "calendar".into(),
                    operation_id: other.into(),
                    reason: "unknown operation".into(),
                })
            }
        };
        Ok(result)
    }

    fn validate_credentials(&self, vault: &CredentialVault) -> bool {
        vault.exists("calendar.google_token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn create_event_declares_rollback_to_delete() {
        let connector = CalendarConnector::new();
        let op = connector
            .get_operations()
            .into_iter()
            .find(|o| o.id == "create_event")
            .unwrap();
        assert_eq!(op.rollback_operation_id, "delete_event");
    }

    #[test]
    fn send_invite_requires_attendees() {
        let connector = CalendarConnector::new();
        let result = connector.execute(
            "send_invite",
            &params(&[
                ("summary", json!("standup")),
                ("start", json!("2026-01-01T10:00:00Z")),
                ("end", json!("2026-01-01T10:30:00Z")),
            ]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn send_invite_appends_send_updates_query_param() {
        let connector = CalendarConnector::new();
        let result = connector
            .execute(
                "send_invite",
                &params(&[
                    ("summary", json!("standup")),
                    ("start", json!("2026-01-01T10:00:00Z")),
                    ("end", json!("2026-01-01T10:30:00Z")),
                    ("attendees", json!(["a@example.com"])),
                ]),
            )
            .unwrap();
        assert!(result.url.ends_with("?sendUpdates=all"));
    }

    #[test]
    fn read_events_defaults_calendar_id_to_primary() {
        let connector = CalendarConnector::new();
        let result = connector.execute("read_events", &params(&[])).unwrap();
        assert!(result.url.contains("/calendars/primary/events"));
    }
}
