// Engine configuration for scriptbox
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/engine.json";

/// Limits applied to every execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard wall-clock limit for a single execution
    pub timeout_ms: u64,
    pub max_source_bytes: usize,
    pub max_input_bytes: usize,
    /// Heap ceiling for one V8 isolate
    pub js_heap_limit_mb: usize,
    /// How long the host keeps waiting after the interpreter's own deadline
    pub python_timeout_grace_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_source_bytes: 1024 * 1024,
            max_input_bytes: 10 * 1024 * 1024,
            js_heap_limit_mb: 128,
            python_timeout_grace_ms: 500,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Engine config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load `config/engine.json` when present, defaults otherwise
    pub fn load_default() -> Result<Self> {
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            Self::load(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `SCRIPTBOX_*` environment overrides on top of the loaded values
    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(v) = env_number::<u64>("SCRIPTBOX_TIMEOUT_MS") {
            self.timeout_ms = v;
        }
        if let Some(v) = env_number::<usize>("SCRIPTBOX_MAX_SOURCE_BYTES") {
            self.max_source_bytes = v;
        }
        if let Some(v) = env_number::<usize>("SCRIPTBOX_MAX_INPUT_BYTES") {
            self.max_input_bytes = v;
        }
        if let Some(v) = env_number::<usize>("SCRIPTBOX_JS_HEAP_LIMIT_MB") {
            self.js_heap_limit_mb = v;
        }
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn python_grace(&self) -> Duration {
        Duration::from_millis(self.python_timeout_grace_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            bail!("timeout_ms must be greater than zero");
        }
        if self.js_heap_limit_mb < 8 {
            bail!("js_heap_limit_mb must be at least 8, got {}", self.js_heap_limit_mb);
        }
        Ok(())
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring invalid numeric environment override");
            None
        }
    }
}
