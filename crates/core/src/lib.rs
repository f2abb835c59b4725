//! # cplane-core
//!
//! Shared domain types for the governed connector plane: the error
//! taxonomy, the risk tier enum, and the capability identifier. This
//! crate has **zero framework dependencies** beyond serialization and
//! error-derive — every other crate in the workspace depends on it.

pub mod capability;
pub mod error;
pub mod model;
pub mod risk;

pub use capability::{Capability, Scope};
pub use error::{Error, ModelError, ProxyError, RegistryError, Result, VaultError};
pub use model::{
    CapabilityClass, ConnectorManifest, ConnectorOperation, ConnectorResponse, ConnectorResult,
    ConnectorSource, ConnectorStatus, CredentialSpec, HttpMethod, ParameterSpec, RequestBody,
    ResponseBody,
};
pub use risk::RiskTier;
