//! Capability identifiers — the dotted key used throughout governance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A dotted capability identifier, e.g. `connector.slack.post_message`.
///
/// Used as the classification key in the risk classifier and as the
/// accounting key in the trust ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Capability(pub String);

impl Capability {
    /// Build the full capability id for a connector operation:
    /// `"connector." + connector_id + "." + operation_id`.
    pub fn for_operation(connector_id: &str, operation_id: &str) -> Self {
        Self(format!("connector.{connector_id}.{operation_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Capability {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The blast-radius qualifier on a capability. See GLOSSARY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Workspace,
    External,
    Network,
    System,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Workspace => "workspace",
            Self::External => "external",
            Self::Network => "network",
            Self::System => "system",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_capability_id_format() {
        let cap = Capability::for_operation("slack", "post_message");
        assert_eq!(cap.as_str(), "connector.slack.post_message");
    }
}
