//! Server settings.
//!
//! Defaults come from [`ServerConfig::default`], the command line overrides
//! them at startup, and the client may adjust the completion settings through
//! `initializationOptions` (camelCase JSON, every field optional):
//!
//! ```json
//! { "maxCompletions": 500, "scanTimeoutMs": 1000, "caseSensitive": false }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_EXTENSIONS: &[&str] = &["glsl", "vert", "frag", "geom", "comp", "tesc", "tese"];
pub const DEFAULT_MAX_COMPLETIONS: usize = 2000;
pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_SCAN_CACHE_CAPACITY: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScannerConfig {
    /// Source file extensions, without the leading dot.
    pub extensions: Vec<String>,
    pub max_depth: Option<usize>,
    /// Skip files and directories whose name starts with `.`.
    pub skip_hidden: bool,
    /// Number of files whose lexed names are kept between scans; 0 disables.
    pub cache_capacity: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            max_depth: None,
            skip_hidden: true,
            cache_capacity: DEFAULT_SCAN_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompletionConfig {
    pub max_completions: usize,
    pub scan_timeout_ms: u64,
    pub case_sensitive: bool,
    /// Offer reserved words and built-ins alongside workspace declarations.
    pub include_keywords: bool,
    /// Walk the workspace root for candidates.
    pub scan_workspace: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_completions: DEFAULT_MAX_COMPLETIONS,
            scan_timeout_ms: DEFAULT_SCAN_TIMEOUT_MS,
            case_sensitive: true,
            include_keywords: true,
            scan_workspace: true,
        }
    }
}

impl CompletionConfig {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    /// Overlays the client's `initializationOptions` onto these settings.
    ///
    /// Unknown keys are ignored; a malformed payload leaves the settings unchanged.
    pub fn merge_initialization_options(&mut self, options: &serde_json::Value) {
        let serde_json::Value::Object(fields) = options else {
            warn!("Ignoring non-object initializationOptions: {}", options);
            return;
        };

        let mut merged = match serde_json::to_value(&*self) {
            Ok(serde_json::Value::Object(current)) => current,
            _ => return,
        };
        for (key, value) in fields {
            if merged.contains_key(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
        match serde_json::from_value(serde_json::Value::Object(merged)) {
            Ok(updated) => *self = updated,
            Err(e) => warn!("Ignoring malformed initializationOptions: {}", e),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub scanner: ScannerConfig,
    pub completion: CompletionConfig,
}
