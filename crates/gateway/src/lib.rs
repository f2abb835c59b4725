//! Thin HTTP surface over the credential vault (C10).
//!
//! Exposes exactly the four endpoints the rest of the plane needs an
//! external collaborator to serve: store/status/delete/validate for a
//! connector's declared credentials, plus a health check. Built on
//! Axum, bearer-gated, same shape as a typical internal admin API.

pub mod credentials;

#[cfg(test)]
mod tests_support;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::{self, Next},
    response::Json,
    routing::{delete, get, post},
};
use cplane_config::GatewaySection;
use cplane_proxy::ConnectorRegistry;
use cplane_vault::CredentialVault;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared state every handler reads from. No interior mutability needed
/// beyond what the registry and vault already provide internally.
pub struct GatewayState {
    pub registry: Arc<ConnectorRegistry>,
    pub vault: Arc<CredentialVault>,
    pub bearer_token: Option<String>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router: `/health` unauthenticated, `/connectors/*`
/// behind bearer auth.
pub fn build_router(state: SharedState) -> Router {
    let credential_routes = Router::new()
        .route(
            "/connectors/{connector_id}/credentials",
            post(credentials::store_credential),
        )
        .route(
            "/connectors/{connector_id}/credentials/status",
            get(credentials::credential_status),
        )
        .route(
            "/connectors/{connector_id}/credentials/validate",
            post(credentials::validate_credentials),
        )
        .route(
            "/connectors/{connector_id}/credentials/{vault_key}",
            delete(credentials::delete_credential),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::exact(
            "http://localhost:8080".parse().unwrap(),
        ))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .merge(credential_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Resolve the gateway's bearer token and bind + serve the router.
/// `registry`/`vault` are built once by the caller (the CLI's `serve`
/// command) and shared with whatever else needs them.
pub async fn serve(
    gateway_config: &GatewaySection,
    registry: Arc<ConnectorRegistry>,
    vault: Arc<CredentialVault>,
) -> std::io::Result<()> {
    let bearer_token = resolve_bearer_token(gateway_config);
    let state: SharedState = Arc::new(GatewayState {
        registry,
        vault,
        bearer_token,
    });
    let app = build_router(state);

    let addr = format!("{}:{}", gateway_config.host, gateway_config.port);
    info!(addr = %addr, "gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}

fn resolve_bearer_token(gateway_config: &GatewaySection) -> Option<String> {
    if !gateway_config.require_bearer_auth {
        return None;
    }
    match &gateway_config.bearer_token_seed_path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(contents) => Some(contents.trim().to_string()),
            Err(e) => {
                warn!(
                    error = %e,
                    path = %path.display(),
                    "failed to read bearer token seed, generating an ephemeral token"
                );
                Some(generate_token())
            }
        },
        None => {
            let token = generate_token();
            info!(token = %token, "no bearer_token_seed_path configured, generated an ephemeral gateway bearer token");
            Some(token)
        }
    }
}

fn generate_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Requires a matching `Authorization: Bearer <token>` header whenever
/// the gateway was configured with a token. A `None` token means
/// `require_bearer_auth` was turned off — every request passes through.
async fn auth_middleware(
    State(state): State<SharedState>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    let Some(expected) = &state.bearer_token else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => Ok(next.run(req).await),
        _ => {
            warn!("unauthorized request to gateway credential API");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint_needs_no_auth() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(vec![], dir.path());
        let app = build_router(state);

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn credential_route_without_bearer_token_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(vec![], dir.path());
        let app = build_router(state);

        let req = Request::builder()
            .uri("/connectors/echo/credentials/status")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn credential_route_with_wrong_bearer_token_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(vec![], dir.path());
        let app = build_router(state);

        let req = Request::builder()
            .uri("/connectors/echo/credentials/status")
            .header("Authorization", "Bearer wrong-token")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
