use crate::error::Result;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine settings.
///
/// Every field has a default, so a config file only needs the keys it changes:
///
/// ```json
/// { "historyCapacity": 50, "indentUnit": "\t" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Maximum number of undo snapshots kept; the oldest is evicted first.
    pub history_capacity: usize,
    /// One level of indentation in emitted blocks.
    pub indent_unit: String,
    /// Scope used when a resolver table must be created and the inserted key
    /// carries no path family of its own.
    pub default_resolver_scope: String,
    /// Executable of the external text/binary converter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converter_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            indent_unit: "    ".to_string(),
            default_resolver_scope: "Resources".to_string(),
            converter_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: EngineConfig = serde_json::from_str(json)?;
        if config.history_capacity == 0 {
            log::warn!("historyCapacity of 0 disables undo; using 1");
            config.history_capacity = 1;
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        log::debug!("loaded engine config from {}", path.display());
        Ok(config)
    }
}
