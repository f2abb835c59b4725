//! Audit logging — structured security event logging.
//!
//! Records security-relevant events for monitoring and compliance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
    pub actor: String,
    pub target: String,
    pub outcome: AuditOutcome,
    pub details: Option<String>,
}

/// Types of auditable security events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Authentication/authorization failure against the gateway
    AuthFailure,
    /// A vault credential was stored, retrieved, or deleted
    VaultAccess { action: String, key: String },
    /// A connector's access grant to a vault key changed
    GrantChange { connector_id: String, key: String },
    /// Endpoint access was denied (SSRF prevention)
    EndpointDenied { url: String },
    /// Governance policy denied an operation
    PolicyDenied { capability: String },
    /// Rate limiter denied a request
    RateLimited { connector_id: String },
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

/// Trait for audit log sinks (where events are written).
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// In-memory audit logger that stores entries in a vector.
/// Useful for testing and small deployments.
pub struct AuditLogger {
    entries: std::sync::Mutex<Vec<AuditEntry>>,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.lock().unwrap().len();
        f.debug_struct("AuditLogger")
            .field("entry_count", &count)
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger {
    /// Create a new audit logger with no sinks.
    pub fn new() -> Self {
        Self {
            entries: std::sync::Mutex::new(Vec::new()),
            sinks: Vec::new(),
        }
    }

    /// Create a new audit logger with the given sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            entries: std::sync::Mutex::new(Vec::new()),
            sinks,
        }
    }

    /// Record an audit event.
    pub fn log(&self, event: AuditEvent, actor: &str, target: &str, outcome: AuditOutcome, details: Option<String>) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event,
            actor: actor.into(),
            target: target.into(),
            outcome,
            details,
        };

        // Store in memory
        self.entries.lock().unwrap().push(entry.clone());

        // Forward to sinks
        for sink in &self.sinks {
            sink.record(&entry);
        }
    }

    /// Get all recorded entries.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Get entries filtered by event type.
    pub fn entries_by_outcome(&self, outcome: &AuditOutcome) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| &e.outcome == outcome)
            .cloned()
            .collect()
    }

    /// Clear all stored entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Count of stored entries.
    pub fn count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// A tracing-based audit sink that logs entries via `tracing::info!`.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        tracing::info!(
            event = ?entry.event,
            actor = %entry.actor,
            target = %entry.target,
            outcome = ?entry.outcome,
            details = ?entry.details,
            "AUDIT"
        );
    }
}

/// An append-only file sink, one line per event:
/// `<ISO-8601 timestamp> | <action> | <key> | accessor=<id>`.
///
/// Writes are best-effort: a failed write is logged via `tracing::warn!`
/// and does not propagate, matching the source's "audit logging must
/// never block or fail the credential operation it records" behavior.
pub struct FileAuditSink {
    path: std::path::PathBuf,
}

impl FileAuditSink {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn action_and_key(entry: &AuditEntry) -> (String, String) {
        match &entry.event {
            AuditEvent::VaultAccess { action, key } => (action.clone(), key.clone()),
            AuditEvent::GrantChange { connector_id, key } => {
                ("grant_change".into(), format!("{connector_id}:{key}"))
            }
            AuditEvent::AuthFailure => ("auth_failure".into(), String::new()),
            AuditEvent::EndpointDenied { url } => ("endpoint_denied".into(), url.clone()),
            AuditEvent::PolicyDenied { capability } => ("policy_denied".into(), capability.clone()),
            AuditEvent::RateLimited { connector_id } => ("rate_limited".into(), connector_id.clone()),
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, entry: &AuditEntry) {
        let (action, key) = Self::action_and_key(entry);
        let line = format!(
            "{} | {} | {} | accessor={}\n",
            entry.timestamp.to_rfc3339(),
            action,
            key,
            entry.actor,
        );
        use std::io::Write;
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(line.as_bytes()));
        if let Err(e) = result {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to write audit log line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_and_retrieve_entries() {
        let logger = AuditLogger::new();
        logger.log(
            AuditEvent::VaultAccess { action: "store".into(), key: "slack.bot_token".into() },
            "admin",
            "vault",
            AuditOutcome::Success,
            None,
        );
        logger.log(
            AuditEvent::AuthFailure,
            "attacker",
            "system",
            AuditOutcome::Denied,
            Some("wrong token".into()),
        );

        assert_eq!(logger.count(), 2);
        let entries = logger.entries();
        assert_eq!(entries[0].actor, "admin");
        assert_eq!(entries[1].actor, "attacker");
    }

    #[test]
    fn filter_by_outcome() {
        let logger = AuditLogger::new();
        logger.log(
            AuditEvent::VaultAccess { action: "store".into(), key: "k1".into() },
            "user1",
            "vault",
            AuditOutcome::Success,
            None,
        );
        logger.log(
            AuditEvent::AuthFailure,
            "user2",
            "system",
            AuditOutcome::Denied,
            None,
        );
        logger.log(
            AuditEvent::VaultAccess { action: "retrieve".into(), key: "k1".into() },
            "user1",
            "vault",
            AuditOutcome::Success,
            None,
        );

        let successes = logger.entries_by_outcome(&AuditOutcome::Success);
        assert_eq!(successes.len(), 2);

        let denied = logger.entries_by_outcome(&AuditOutcome::Denied);
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].actor, "user2");
    }

    #[test]
    fn clear_entries() {
        let logger = AuditLogger::new();
        logger.log(
            AuditEvent::VaultAccess { action: "store".into(), key: "k".into() },
            "user",
            "vault",
            AuditOutcome::Success,
            None,
        );
        assert_eq!(logger.count(), 1);
        logger.clear();
        assert_eq!(logger.count(), 0);
    }

    #[test]
    fn audit_entry_serialization() {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event: AuditEvent::VaultAccess { action: "delete".into(), key: "slack.bot_token".into() },
            actor: "admin".into(),
            target: "vault".into(),
            outcome: AuditOutcome::Success,
            details: None,
        };

        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.actor, "admin");
        assert_eq!(deserialized.outcome, AuditOutcome::Success);
    }

    #[test]
    fn audit_event_variants_serialize() {
        let events = vec![
            AuditEvent::AuthFailure,
            AuditEvent::VaultAccess { action: "store".into(), key: "k".into() },
            AuditEvent::GrantChange { connector_id: "slack".into(), key: "k".into() },
            AuditEvent::EndpointDenied { url: "http://169.254.169.254".into() },
            AuditEvent::PolicyDenied { capability: "connector.slack.post_message".into() },
            AuditEvent::RateLimited { connector_id: "slack".into() },
        ];

        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            let round_tripped: AuditEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(round_tripped, event);
        }
    }

    #[test]
    fn custom_sink_receives_events() {
        use std::sync::{Arc, Mutex};

        struct TestSink {
            received: Arc<Mutex<Vec<String>>>,
        }

        impl AuditSink for TestSink {
            fn record(&self, entry: &AuditEntry) {
                self.received.lock().unwrap().push(entry.actor.clone());
            }
        }

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = TestSink { received: received.clone() };
        let logger = AuditLogger::with_sinks(vec![Box::new(sink)]);

        logger.log(
            AuditEvent::VaultAccess { action: "store".into(), key: "k".into() },
            "user@test",
            "vault",
            AuditOutcome::Success,
            None,
        );

        let sink_entries = received.lock().unwrap();
        assert_eq!(sink_entries.len(), 1);
        assert_eq!(sink_entries[0], "user@test");
    }

    #[test]
    fn file_sink_writes_expected_line_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault-audit.log");
        let sink = FileAuditSink::new(&path);

        let entry = AuditEntry {
            timestamp: Utc::now(),
            event: AuditEvent::VaultAccess { action: "store".into(), key: "slack.bot_token".into() },
            actor: "admin".into(),
            target: "vault".into(),
            outcome: AuditOutcome::Success,
            details: None,
        };
        sink.record(&entry);

        let contents = std::fs::read_to_string(&path).unwrap();
        let line = contents.lines().next().unwrap();
        let parts: Vec<&str> = line.split(" | ").collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[1], "store");
        assert_eq!(parts[2], "slack.bot_token");
        assert_eq!(parts[3], "accessor=admin");
    }

    #[test]
    fn default_logger() {
        let logger = AuditLogger::default();
        assert_eq!(logger.count(), 0);
    }

    #[test]
    fn debug_format() {
        let logger = AuditLogger::new();
        let debug_str = format!("{logger:?}");
        assert!(debug_str.contains("AuditLogger"));
        assert!(debug_str.contains("entry_count"));
    }
}
