//! Encryption, SSRF-safe domain allowlisting, and audit logging for the
//! governed connector plane.
//!
//! - **Secrets**: AES-256-GCM encryption of vault-at-rest credentials
//! - **Domain**: exact-match host allowlisting and CIDR-precise private
//!   address rejection (SSRF prevention for GenericREST and the proxy)
//! - **Audit logging**: structured security event logging with
//!   pluggable sinks, including an append-only file sink

pub mod audit;
pub mod domain;
pub mod secrets;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, FileAuditSink, TracingSink};
pub use domain::{check_domain, extract_host, is_domain_allowed, is_private_host, is_private_url, DomainCheckResult};
pub use secrets::{EncryptedValue, SecretsManager};
