//! Runtime Configuration

use serde::{Deserialize, Serialize};

/// Component runtime options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Prefix of each instance's unique id (also its default namespace)
    pub uid_prefix: String,

    /// Bind element-scoped declarations on the open shadow root when there is one
    pub shadow_root_delegation: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            uid_prefix: "c_uid_".to_string(),
            shadow_root_delegation: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse a JSON config; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
