//! Encrypted credential storage with scoped per-connector access grants.
//!
//! Credentials are encrypted at rest with AES-256-GCM (`cplane-security`'s
//! `SecretsManager`) and saved atomically: the new blob is written to a
//! temp file beside the target path, then renamed into place, so a crash
//! mid-write never leaves a half-written vault file. A prior blob is
//! copied to `storage.backup_path` before the rename.

use chrono::{DateTime, Utc};
use cplane_config::VaultConfig;
use cplane_core::CredentialSpec;
use cplane_security::SecretsManager;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

/// A single credential stored in the vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultEntry {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub accessed_by: Vec<String>,
}

/// What [`CredentialVault::describe`] exposes without reaching into the
/// vault's private state: type and timestamps, never the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultEntryDescription {
    pub credential_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scoped access control: each vault key can be granted to specific
/// connector ids. Connectors can only retrieve credentials they've been
/// granted access to.
#[derive(Debug, Default)]
pub struct VaultAccessPolicy {
    grants: HashMap<String, HashSet<String>>,
}

impl VaultAccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, connector_id: &str, vault_key: &str) {
        self.grants
            .entry(vault_key.to_string())
            .or_default()
            .insert(connector_id.to_string());
    }

    pub fn revoke(&mut self, connector_id: &str, vault_key: &str) {
        if let Some(ids) = self.grants.get_mut(vault_key) {
            ids.remove(connector_id);
        }
    }

    pub fn revoke_all(&mut self, connector_id: &str) {
        for ids in self.grants.values_mut() {
            ids.remove(connector_id);
        }
    }

    pub fn is_allowed(&self, connector_id: &str, vault_key: &str) -> bool {
        self.grants
            .get(vault_key)
            .map(|ids| ids.contains(connector_id))
            .unwrap_or(false)
    }

    pub fn list_grants(&self, connector_id: &str) -> Vec<String> {
        self.grants
            .iter()
            .filter(|(_, ids)| ids.contains(connector_id))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

/// Encrypted credential storage with scoped access grants and audit
/// logging.
pub struct CredentialVault {
    storage_path: PathBuf,
    backup_path: PathBuf,
    audit_path: PathBuf,
    audit_enabled: bool,
    secrets: SecretsManager,
    entries: Mutex<HashMap<String, VaultEntry>>,
    access_policy: Mutex<VaultAccessPolicy>,
}

impl CredentialVault {
    /// Construct a vault from its configuration, reading the encryption
    /// key from the configured environment variable. Missing env var: a
    /// warning is logged and an ephemeral key is generated — credentials
    /// will not survive a restart.
    pub fn new(config: &VaultConfig) -> Self {
        let key_env_var = &config.encryption.key_env_var;
        let secrets = match std::env::var(key_env_var) {
            Ok(key_str) if !key_str.is_empty() => SecretsManager::new(&key_str),
            _ => {
                tracing::warn!(
                    env_var = %key_env_var,
                    "vault encryption key not set — generated ephemeral key; \
                     credentials will NOT survive restarts without setting this env var"
                );
                SecretsManager::new(&uuid::Uuid::new_v4().to_string())
            }
        };

        let vault = Self {
            storage_path: config.storage.path.clone(),
            backup_path: config.storage.backup_path.clone(),
            audit_path: config.audit.log_path.clone(),
            audit_enabled: config.audit.log_access,
            secrets,
            entries: Mutex::new(HashMap::new()),
            access_policy: Mutex::new(VaultAccessPolicy::new()),
        };
        vault.load();
        vault
    }

    /// Store or update a credential. Returns the resulting entry.
    pub fn store(&self, key: &str, value: &str, credential_type: &str) -> VaultEntry {
        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap();
        let entry = match entries.get(key) {
            Some(existing) => VaultEntry {
                key: key.to_string(),
                value: value.to_string(),
                credential_type: credential_type.to_string(),
                created_at: existing.created_at,
                updated_at: now,
                accessed_by: existing.accessed_by.clone(),
            },
            None => VaultEntry {
                key: key.to_string(),
                value: value.to_string(),
                credential_type: credential_type.to_string(),
                created_at: now,
                updated_at: now,
                accessed_by: vec![],
            },
        };
        entries.insert(key.to_string(), entry.clone());
        self.save(&entries);
        drop(entries);
        self.audit_log("store", key, "");
        entry
    }

    /// Retrieve a decrypted credential value. `accessor_id: None` is
    /// admin access and bypasses the grant policy; `Some(id)` checks it.
    pub fn retrieve(&self, key: &str, accessor_id: Option<&str>) -> Result<String, cplane_core::VaultError> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get(key)
            .ok_or_else(|| cplane_core::VaultError::KeyNotFound(key.to_string()))?;

        if let Some(id) = accessor_id {
            let policy = self.access_policy.lock().unwrap();
            if !policy.is_allowed(id, key) {
                return Err(cplane_core::VaultError::PermissionDenied {
                    connector_id: id.to_string(),
                    key: key.to_string(),
                });
            }
        }

        let value = entry.value.clone();
        if let Some(id) = accessor_id {
            if let Some(entry) = entries.get_mut(key) {
                if !entry.accessed_by.iter().any(|a| a == id) {
                    entry.accessed_by.push(id.to_string());
                }
            }
        }
        drop(entries);
        self.audit_log("retrieve", key, accessor_id.unwrap_or(""));
        Ok(value)
    }

    /// Delete a credential. Returns `true` if it existed.
    pub fn delete(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let existed = entries.remove(key).is_some();
        if existed {
            self.save(&entries);
            drop(entries);
            self.audit_log("delete", key, "");
        }
        existed
    }

    pub fn exists(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn list_keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }

    /// Type and timestamps for a key, without exposing the value —
    /// replaces reaching into `_entries[key].type` directly.
    pub fn describe(&self, key: &str) -> Option<VaultEntryDescription> {
        self.entries.lock().unwrap().get(key).map(|e| VaultEntryDescription {
            credential_type: e.credential_type.clone(),
            created_at: e.created_at,
            updated_at: e.updated_at,
        })
    }

    pub fn grant_connector_access(&self, connector_id: &str, manifest: &cplane_core::ConnectorManifest) {
        let mut policy = self.access_policy.lock().unwrap();
        for spec in &manifest.required_credentials {
            policy.grant(connector_id, &spec.vault_key);
        }
    }

    pub fn revoke_connector_access(&self, connector_id: &str) {
        self.access_policy.lock().unwrap().revoke_all(connector_id);
    }

    pub fn revoke_grant(&self, connector_id: &str, vault_key: &str) {
        self.access_policy.lock().unwrap().revoke(connector_id, vault_key);
    }

    /// Which of `specs` currently exist in the vault.
    pub fn check_requirements(&self, specs: &[CredentialSpec]) -> HashMap<String, bool> {
        specs
            .iter()
            .map(|spec| (spec.vault_key.clone(), self.exists(&spec.vault_key)))
            .collect()
    }

    fn save(&self, entries: &HashMap<String, VaultEntry>) {
        if let Some(parent) = self.storage_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::error!(error = %e, "failed to create vault storage directory");
                return;
            }
        }

        if self.storage_path.exists() {
            if let Err(e) = std::fs::copy(&self.storage_path, &self.backup_path) {
                tracing::warn!(error = %e, "failed to back up prior vault blob");
            }
        }

        let plaintext = match serde_json::to_vec(entries) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize vault entries");
                return;
            }
        };
        let encrypted = self.secrets.encrypt(&String::from_utf8_lossy(&plaintext));
        let blob = match serde_json::to_vec(&encrypted) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize encrypted vault blob");
                return;
            }
        };

        let tmp_path = self.storage_path.with_extension("tmp");
        if let Err(e) = std::fs::write(&tmp_path, &blob) {
            tracing::error!(error = %e, "failed to write vault temp file");
            return;
        }
        if let Err(e) = std::fs::rename(&tmp_path, &self.storage_path) {
            tracing::error!(error = %e, "failed to atomically rename vault temp file into place");
        }
    }

    fn load(&self) {
        if !self.storage_path.exists() {
            return;
        }
        let result: Result<HashMap<String, VaultEntry>, String> = (|| {
            let blob = std::fs::read(&self.storage_path).map_err(|e| e.to_string())?;
            let encrypted: cplane_security::EncryptedValue =
                serde_json::from_slice(&blob).map_err(|e| e.to_string())?;
            let plaintext = self.secrets.decrypt(&encrypted).map_err(|e| e.to_string())?;
            serde_json::from_str(&plaintext).map_err(|e| e.to_string())
        })();

        match result {
            Ok(entries) => *self.entries.lock().unwrap() = entries,
            Err(e) => {
                tracing::error!(error = %e, "failed to load vault, starting empty");
            }
        }
    }

    fn audit_log(&self, action: &str, key: &str, accessor: &str) {
        if !self.audit_enabled {
            return;
        }
        if let Some(parent) = self.audit_path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let line = format!("{} | {} | {} | accessor={}\n", Utc::now().to_rfc3339(), action, key, accessor);
        use std::io::Write;
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_path)
            .and_then(|mut f| f.write_all(line.as_bytes()));
        if let Err(e) = result {
            tracing::warn!(error = %e, "audit log write failed");
        }
    }
}
