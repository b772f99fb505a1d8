use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Page-wide runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Give up on an awaited animation/transition after this many milliseconds.
    /// `None` waits for the completion event forever.
    pub completion_timeout_ms: Option<u64>,
    /// Namespace used by focus traps engaged without one
    pub default_trap_namespace: String,
    /// Class added one scheduling turn after a modal opens
    pub animate_class: String,
    /// Fallback `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            completion_timeout_ms: None,
            default_trap_namespace: "handleFocus".to_string(),
            animate_class: "aos-animate".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> Result<RuntimeConfig> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config {}", path.display()))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse config {}", path.display()))?,
            _ => bail!("Unsupported config format: {}", path.display()),
        };
        Ok(config)
    }

    /// Load from `path` when given and present, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<RuntimeConfig> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }
}
