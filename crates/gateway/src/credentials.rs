//! The four credential-management endpoints nested under `/connectors`.
//! Every response is JSON; credential values never appear in a response
//! body, only `present`/`valid` booleans.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use cplane_core::RegistryError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SharedState;

#[derive(Deserialize)]
pub struct StoreCredentialRequest {
    pub vault_key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub credential_type: String,
}

#[derive(Serialize)]
pub struct StoreCredentialResponse {
    pub vault_key: String,
    pub stored: bool,
}

pub async fn store_credential(
    State(state): State<SharedState>,
    Path(connector_id): Path<String>,
    Json(body): Json<StoreCredentialRequest>,
) -> Result<Json<StoreCredentialResponse>, (StatusCode, Json<Value>)> {
    let manifest = resolve_manifest(&state, &connector_id)?;

    let declared = manifest
        .required_credentials
        .iter()
        .any(|spec| spec.vault_key == body.vault_key);
    if !declared {
        return Err(error(
            StatusCode::BAD_REQUEST,
            format!(
                "vault key '{}' is not declared by connector '{connector_id}'",
                body.vault_key
            ),
        ));
    }

    state.vault.store(&body.vault_key, &body.value, &body.credential_type);
    state.vault.grant_connector_access(&connector_id, &manifest);

    Ok(Json(StoreCredentialResponse {
        vault_key: body.vault_key,
        stored: true,
    }))
}

#[derive(Serialize)]
pub struct CredentialStatusEntry {
    pub name: String,
    pub vault_key: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub required: bool,
    pub present: bool,
}

#[derive(Serialize)]
pub struct CredentialStatusResponse {
    pub connector_id: String,
    pub credentials: Vec<CredentialStatusEntry>,
}

pub async fn credential_status(
    State(state): State<SharedState>,
    Path(connector_id): Path<String>,
) -> Result<Json<CredentialStatusResponse>, (StatusCode, Json<Value>)> {
    let manifest = resolve_manifest(&state, &connector_id)?;

    let credentials = manifest
        .required_credentials
        .iter()
        .map(|spec| CredentialStatusEntry {
            name: spec.name.clone(),
            vault_key: spec.vault_key.clone(),
            credential_type: spec.credential_type.clone(),
            required: spec.required,
            present: state.vault.exists(&spec.vault_key),
        })
        .collect();

    Ok(Json(CredentialStatusResponse {
        connector_id,
        credentials,
    }))
}

#[derive(Serialize)]
pub struct DeleteCredentialResponse {
    pub vault_key: String,
    pub deleted: bool,
}

pub async fn delete_credential(
    State(state): State<SharedState>,
    Path((connector_id, vault_key)): Path<(String, String)>,
) -> Result<Json<DeleteCredentialResponse>, (StatusCode, Json<Value>)> {
    resolve_manifest(&state, &connector_id)?;

    let deleted = state.vault.delete(&vault_key);
    if deleted {
        state.vault.revoke_grant(&connector_id, &vault_key);
    }

    Ok(Json(DeleteCredentialResponse { vault_key, deleted }))
}

#[derive(Serialize)]
pub struct ValidateCredentialsResponse {
    pub connector_id: String,
    pub valid: bool,
    pub missing: Vec<String>,
}

pub async fn validate_credentials(
    State(state): State<SharedState>,
    Path(connector_id): Path<String>,
) -> Result<Json<ValidateCredentialsResponse>, (StatusCode, Json<Value>)> {
    let manifest = resolve_manifest(&state, &connector_id)?;

    let missing: Vec<String> = manifest
        .required_credentials
        .iter()
        .filter(|spec| spec.required && !state.vault.exists(&spec.vault_key))
        .map(|spec| spec.vault_key.clone())
        .collect();

    let valid = state
        .registry
        .with_connector(&connector_id, |c| c.validate_credentials(&state.vault))
        .map_err(registry_error_response)?;

    Ok(Json(ValidateCredentialsResponse {
        connector_id,
        valid,
        missing,
    }))
}

fn resolve_manifest(
    state: &SharedState,
    connector_id: &str,
) -> Result<cplane_core::ConnectorManifest, (StatusCode, Json<Value>)> {
    state
        .registry
        .with_connector(connector_id, |c| c.manifest().clone())
        .map_err(registry_error_response)
}

fn registry_error_response(err: RegistryError) -> (StatusCode, Json<Value>) {
    error(StatusCode::NOT_FOUND, err.to_string())
}

fn error(status: StatusCode, message: String) -> (StatusCode, Json<Value>) {
    (status, Json(serde_json::json!({ "error": message })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use cplane_connectors::EchoConnector;
    use tower::ServiceExt;

    #[tokio::test]
    async fn credential_status_lists_nothing_for_echo() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(vec![Box::new(EchoConnector::new())], dir.path());
        let app = crate::build_router(state);

        let req = Request::builder()
            .uri("/connectors/echo/credentials/status")
            .header("Authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_connector_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(vec![], dir.path());
        let app = crate::build_router(state);

        let req = Request::builder()
            .uri("/connectors/nope/credentials/status")
            .header("Authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
