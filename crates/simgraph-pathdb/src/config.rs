//! Builder configuration.

use serde::{Deserialize, Serialize};

/// Knobs for [`PathIndexBuilder`](crate::PathIndexBuilder).
///
/// Missing fields take their defaults when parsed from JSON, so
/// `{"sort_rows": false}` is a complete document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathIndexConfig {
    /// Realize edge-to-vertex links over homogeneous edge sets as views of the
    /// edge set's endpoint array instead of copying them.
    pub zero_copy_endpoints: bool,
    /// Sort each row of vertex-to-edge links and packed maps. Stencil rows
    /// are never sorted; their order follows the stencil.
    pub sort_rows: bool,
}

impl Default for PathIndexConfig {
    fn default() -> Self {
        Self {
            zero_copy_endpoints: true,
            sort_rows: true,
        }
    }
}

impl PathIndexConfig {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
