//! Error taxonomy for the governed connector plane.
//!
//! Uses `thiserror` for ergonomic error definitions. Each bounded context
//! gets its own error enum; the top-level `Error` composes them with
//! `#[from]` so call sites can use `?` across crate boundaries.

use thiserror::Error;

/// The top-level error type for all connector-plane operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("proxy error: {0}")]
    Proxy(#[from] ProxyError),

    #[error("connector model error: {0}")]
    Model(#[from] ModelError),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Construction-time invariant violations. These are programmer errors —
/// they escape loudly rather than being folded into a response, per the
/// propagation policy: "Construction-time invariant violations ... DO
/// escape: they are programmer errors and must fail loudly at startup."
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("invalid manifest '{id}': {reason}")]
    InvalidManifest { id: String, reason: String },

    #[error("invalid operation '{operation_id}' on connector '{connector_id}': {reason}")]
    InvalidOperation {
        connector_id: String,
        operation_id: String,
        reason: String,
    },

    #[error("invalid request spec for operation '{operation_id}': {reason}")]
    InvalidRequestSpec {
        operation_id: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("connector '{0}' not found")]
    ConnectorNotFound(String),

    #[error("operation '{operation_id}' not found on connector '{connector_id}'")]
    OperationNotFound {
        connector_id: String,
        operation_id: String,
    },

    #[error("connector '{0}' is already registered")]
    DuplicateConnector(String),

    #[error("connector registration is disabled by feature flag")]
    FeatureDisabled,
}

#[derive(Debug, Clone, Error)]
pub enum VaultError {
    #[error("vault key '{0}' not found")]
    KeyNotFound(String),

    #[error("permission denied for connector '{connector_id}' on key '{key}'")]
    PermissionDenied { connector_id: String, key: String },

    #[error("vault I/O error: {0}")]
    Io(String),

    #[error("vault encryption error: {0}")]
    Crypto(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    #[error("rate limited")]
    RateLimited,

    #[error("domain '{host}' is not in the connector's allowlist")]
    DomainNotAllowed { host: String },

    #[error("OAuth signing failed: {0}")]
    OAuthSigningError(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("unknown protocol action '{0}'")]
    ProtocolActionUnknown(String),

    #[error("policy denied: {0}")]
    PolicyDenied(String),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_permission_denied_displays_key_and_connector() {
        let err = VaultError::PermissionDenied {
            connector_id: "evil_connector".into(),
            key: "slack.bot_token".into(),
        };
        let s = err.to_string();
        assert!(s.contains("evil_connector"));
        assert!(s.contains("slack.bot_token"));
    }

    #[test]
    fn proxy_error_wraps_vault_error() {
        let err: ProxyError = VaultError::KeyNotFound("x".into()).into();
        assert!(matches!(err, ProxyError::Vault(_)));
    }

    #[test]
    fn domain_not_allowed_names_host() {
        let err = ProxyError::DomainNotAllowed {
            host: "evil.example.com".into(),
        };
        assert!(err.to_string().contains("evil.example.com"));
    }
}
