//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the progress engine.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Days of history auto-tracked goals look back over
    pub lookback_days: u32,
    /// Points time progress may lead goal progress before a goal is "behind"
    pub behind_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            behind_tolerance: 10.0,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
