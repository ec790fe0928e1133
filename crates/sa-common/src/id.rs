//! Identifier types for calls, agents, and refresh attempts.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique call identifier as it appears in the raw calls source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CallId(pub String);

/// Agent identifier; the join key between calls and agent metadata.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AgentId(pub String);

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                $ty(s.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                $ty(s)
            }
        }
    };
}

string_id!(CallId);
string_id!(AgentId);

/// Identifier for a single refresh attempt.
///
/// Format: `refresh-<date>-<time>-<random>`
/// Example: `refresh-20251127-143022-ab12c3`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RefreshId(pub String);

impl RefreshId {
    /// Generate a new refresh ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let random: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(6)
            .collect();
        RefreshId(format!("refresh-{}-{}", now.format("%Y%m%d-%H%M%S"), random))
    }
}

impl Default for RefreshId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RefreshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_id_format() {
        let id = RefreshId::new();
        assert!(id.0.starts_with("refresh-"));
        assert_eq!(id.0.len(), "refresh-20251127-143022-ab12c3".len());
    }

    #[test]
    fn test_refresh_ids_differ() {
        assert_ne!(RefreshId::new(), RefreshId::new());
    }

    #[test]
    fn test_string_ids_serialize_transparently() {
        let id = AgentId::from("A-101");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"A-101\"");
        assert_eq!(id.to_string(), "A-101");
        assert_eq!(CallId::from("call-001".to_string()).as_str(), "call-001");
    }
}
