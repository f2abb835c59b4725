//! # cplane-proxy
//!
//! The connector registry (C5), the SMTP/IMAP protocol adapter (C6),
//! the outbound HTTP proxy (C7), RFC 5849 OAuth 1.0a signing, and the
//! governed execution pipeline (C9) that wires registry + proxy +
//! `cplane-governance` into a single entry point.

pub mod governed_proxy;
pub mod oauth1;
pub mod protocol_adapter;
pub mod proxy;
pub mod registry;

pub use governed_proxy::GovernedConnectorProxy;
pub use protocol_adapter::{ProtocolAdapter, ProtocolAdapterConfig};
pub use proxy::{ConnectorProxy, DomainValidator};
pub use registry::{ConnectorEntry, ConnectorRegistry};
