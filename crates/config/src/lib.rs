//! Configuration loading, validation, and management for the governed
//! connector plane.
//!
//! Four independent documents: the service config (TOML, same loader
//! style as a typical app config — missing file falls back to
//! defaults, validation runs after parse), and three YAML documents
//! (governance, connector catalog, vault) loaded the same way.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------
// Service config (config.toml)
// ---------------------------------------------------------------------

/// The root service configuration. Maps to `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub config: ConfigPaths,

    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub require_bearer_auth: bool,

    /// Path to a file holding the seed used to derive the bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token_seed_path: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8443
}
fn default_true() -> bool {
    true
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            require_bearer_auth: true,
            bearer_token_seed_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigPaths {
    #[serde(default = "default_governance_path")]
    pub governance_path: PathBuf,

    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    #[serde(default = "default_vault_config_path")]
    pub vault_config_path: PathBuf,
}

fn default_governance_path() -> PathBuf {
    PathBuf::from("governance.yaml")
}
fn default_catalog_path() -> PathBuf {
    PathBuf::from("catalog.yaml")
}
fn default_vault_config_path() -> PathBuf {
    PathBuf::from("vault.yaml")
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self {
            governance_path: default_governance_path(),
            catalog_path: default_catalog_path(),
            vault_config_path: default_vault_config_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSection {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".into()
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            gateway: GatewaySection::default(),
            config: ConfigPaths::default(),
            log: LogSection::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from a specific TOML file path. Missing file → defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("no service config found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.port must be nonzero".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Governance config (governance.yaml)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    #[serde(default)]
    pub risk_classification: RiskClassificationSection,

    #[serde(default)]
    pub trust_ledger: TrustLedgerSection,

    #[serde(default)]
    pub batch_receipts: BatchReceiptsSection,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicySection>,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            risk_classification: RiskClassificationSection::default(),
            trust_ledger: TrustLedgerSection::default(),
            batch_receipts: BatchReceiptsSection::default(),
            policy: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskClassificationSection {
    /// Capability id -> default tier rank (0..=3).
    #[serde(default)]
    pub defaults: HashMap<String, i64>,

    #[serde(default)]
    pub scope_escalations: Vec<ScopeEscalation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeEscalation {
    pub capability: String,
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub escalate_to: i64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustLedgerSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_graduation_threshold")]
    pub graduation_threshold: u64,

    #[serde(default)]
    pub feature_flag_enabled: bool,
}

fn default_graduation_threshold() -> u64 {
    100
}

impl Default for TrustLedgerSection {
    fn default() -> Self {
        Self {
            enabled: false,
            graduation_threshold: default_graduation_threshold(),
            feature_flag_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReceiptsSection {
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    #[serde(default = "default_flush_interval")]
    pub flush_interval_seconds: u64,
}

fn default_buffer_size() -> usize {
    256
}
fn default_flush_interval() -> u64 {
    30
}

impl Default for BatchReceiptsSection {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            flush_interval_seconds: default_flush_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySection {
    #[serde(default)]
    pub rules: Vec<PolicyRuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRuleConfig {
    pub capability_pattern: String,
    pub max_risk_level: String,
    #[serde(default = "default_policy_action")]
    pub action: String,
}

fn default_policy_action() -> String {
    "allow".into()
}

impl GovernanceConfig {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("no governance config found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (cap, tier) in &self.risk_classification.defaults {
            if !(0..=3).contains(tier) {
                return Err(ConfigError::ValidationError(format!(
                    "risk_classification.defaults[{cap}] = {tier} is out of range 0..=3"
                )));
            }
        }
        for esc in &self.risk_classification.scope_escalations {
            if !(0..=3).contains(&esc.escalate_to) {
                return Err(ConfigError::ValidationError(format!(
                    "scope_escalations entry for '{}' has escalate_to {} out of range 0..=3",
                    esc.capability, esc.escalate_to
                )));
            }
        }
        if self.batch_receipts.buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "batch_receipts.buffer_size must be nonzero".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Connector catalog (catalog.yaml)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub settings: CatalogSettings,

    #[serde(default)]
    pub rate_limits: RateLimitsSection,

    #[serde(default)]
    pub connectors: HashMap<String, ConnectorCatalogEntry>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            settings: CatalogSettings::default(),
            rate_limits: RateLimitsSection::default(),
            connectors: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: u32,

    #[serde(default = "default_timeout_seconds")]
    pub default_timeout_seconds: u64,

    #[serde(default = "default_retry_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_seconds: u64,

    /// Global kill switch for connector registration. The registry
    /// refuses every `register()` call while this is false.
    #[serde(default = "default_true")]
    pub connectors_enabled: bool,
}

fn default_max_concurrent() -> u32 {
    20
}
fn default_timeout_seconds() -> u64 {
    30
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_backoff() -> u64 {
    2
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            default_timeout_seconds: default_timeout_seconds(),
            retry_max_attempts: default_retry_attempts(),
            retry_backoff_seconds: default_retry_backoff(),
            connectors_enabled: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitsSection {
    #[serde(default)]
    pub default: RateLimitSpec,

    #[serde(default)]
    pub per_connector: HashMap<String, RateLimitSpec>,
}

impl Default for RateLimitsSection {
    fn default() -> Self {
        Self {
            default: RateLimitSpec::default(),
            per_connector: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSpec {
    #[serde(default = "default_rpm")]
    pub requests_per_minute: u32,

    #[serde(default = "default_burst")]
    pub burst: u32,
}

fn default_rpm() -> u32 {
    60
}
fn default_burst() -> u32 {
    10
}

impl Default for RateLimitSpec {
    fn default() -> Self {
        Self {
            requests_per_minute: default_rpm(),
            burst: default_burst(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorCatalogEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Free-form overrides, including GenericREST endpoint declarations.
    #[serde(default, flatten)]
    pub overrides: HashMap<String, serde_json::Value>,
}

impl CatalogConfig {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("no catalog file found at {}, using empty catalog", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(config)
    }
}

// ---------------------------------------------------------------------
// Vault config (vault.yaml)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub storage: VaultStorageSection,

    #[serde(default)]
    pub encryption: VaultEncryptionSection,

    #[serde(default)]
    pub audit: VaultAuditSection,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            storage: VaultStorageSection::default(),
            encryption: VaultEncryptionSection::default(),
            audit: VaultAuditSection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultStorageSection {
    #[serde(default = "default_vault_path")]
    pub path: PathBuf,

    #[serde(default = "default_vault_backup_path")]
    pub backup_path: PathBuf,
}

fn default_vault_path() -> PathBuf {
    PathBuf::from("vault.db")
}
fn default_vault_backup_path() -> PathBuf {
    PathBuf::from("vault.db.bak")
}

impl Default for VaultStorageSection {
    fn default() -> Self {
        Self {
            path: default_vault_path(),
            backup_path: default_vault_backup_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultEncryptionSection {
    #[serde(default = "default_key_env_var")]
    pub key_env_var: String,
}

fn default_key_env_var() -> String {
    "CPLANE_VAULT_KEY".into()
}

impl Default for VaultEncryptionSection {
    fn default() -> Self {
        Self {
            key_env_var: default_key_env_var(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultAuditSection {
    #[serde(default = "default_true")]
    pub log_access: bool,

    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("vault-audit.log")
}

impl Default for VaultAuditSection {
    fn default() -> Self {
        Self {
            log_access: true,
            log_path: default_audit_log_path(),
        }
    }
}

impl VaultConfig {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("no vault config found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(config)
    }
}

// ---------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("failed to parse TOML config at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("failed to parse YAML config at {path}: {reason}")]
    YamlError { path: PathBuf, reason: String },

    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for cplane_core::Error {
    fn from(e: ConfigError) -> Self {
        cplane_core::Error::Config {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_service_config_is_valid() {
        let config = ServiceConfig::default();
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.gateway.port, 8443);
        assert!(config.gateway.require_bearer_auth);
    }

    #[test]
    fn missing_service_config_returns_defaults() {
        let result = ServiceConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
    }

    #[test]
    fn service_config_roundtrip_toml() {
        let config = ServiceConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ServiceConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn governance_config_rejects_out_of_range_tier() {
        let mut config = GovernanceConfig::default();
        config
            .risk_classification
            .defaults
            .insert("connector.slack.post_message".into(), 9);
        assert!(config.validate().is_err());
    }

    #[test]
    fn governance_config_parses_scope_escalations() {
        let yaml = r#"
risk_classification:
  defaults:
    connector.slack.post_message: 2
  scope_escalations:
    - capability: connector.slack.post_message
      scope: external
      escalate_to: 3
      reason: "external workspace scope"
trust_ledger:
  enabled: true
  graduation_threshold: 100
  feature_flag_enabled: true
batch_receipts:
  buffer_size: 128
  flush_interval_seconds: 10
"#;
        let config: GovernanceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.risk_classification.scope_escalations.len(), 1);
        assert_eq!(config.trust_ledger.graduation_threshold, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_catalog_returns_empty_catalog() {
        let config = CatalogConfig::load_from(Path::new("/nonexistent/catalog.yaml")).unwrap();
        assert!(config.connectors.is_empty());
    }

    #[test]
    fn catalog_config_parses_rate_limits() {
        let yaml = r#"
settings:
  max_concurrent_requests: 10
  default_timeout_seconds: 15
  retry_max_attempts: 2
  retry_backoff_seconds: 1
rate_limits:
  default:
    requests_per_minute: 60
    burst: 10
  per_connector:
    slack:
      requests_per_minute: 50
      burst: 5
connectors:
  slack:
    enabled: true
"#;
        let config: CatalogConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.rate_limits.per_connector["slack"].requests_per_minute, 50);
        assert!(config.connectors["slack"].enabled);
    }

    #[test]
    fn vault_config_defaults() {
        let config = VaultConfig::default();
        assert_eq!(config.encryption.key_env_var, "CPLANE_VAULT_KEY");
        assert!(config.audit.log_access);
    }

    #[test]
    fn vault_config_parses_paths() {
        let yaml = r#"
storage:
  path: /var/lib/cplane/vault.db
  backup_path: /var/lib/cplane/vault.db.bak
encryption:
  key_env_var: MY_VAULT_KEY
audit:
  log_access: true
  log_path: /var/log/cplane/vault-audit.log
"#;
        let config: VaultConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.storage.path, PathBuf::from("/var/lib/cplane/vault.db"));
        assert_eq!(config.encryption.key_env_var, "MY_VAULT_KEY");
    }
}
