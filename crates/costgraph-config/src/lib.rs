use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const COSTGRAPH_DIR_NAME: &str = ".costgraph";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_STORE_ENDPOINT: &str = "http://127.0.0.1:8080";
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CPU_PRICE_PER_CORE_HOUR: f64 = 0.024;
pub const DEFAULT_MEMORY_PRICE_PER_GB_HOUR: f64 = 0.01;
pub const DEFAULT_STORAGE_PRICE_PER_GB_HOUR: f64 = 0.00013888888;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CostgraphConfig {
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_cpu_price")]
    pub cpu_per_core_hour: f64,
    #[serde(default = "default_memory_price")]
    pub memory_per_gb_hour: f64,
    #[serde(default = "default_storage_price")]
    pub storage_per_gb_hour: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            cpu_per_core_hour: DEFAULT_CPU_PRICE_PER_CORE_HOUR,
            memory_per_gb_hour: DEFAULT_MEMORY_PRICE_PER_GB_HOUR,
            storage_per_gb_hour: DEFAULT_STORAGE_PRICE_PER_GB_HOUR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: default_store_endpoint(),
            timeout_secs: DEFAULT_STORE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub fn costgraph_dir(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root.as_ref().join(COSTGRAPH_DIR_NAME)
}

pub fn config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    costgraph_dir(workspace_root).join(CONFIG_FILE_NAME)
}

pub fn load_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<CostgraphConfig, ConfigError> {
    let path = config_path(workspace_root);
    if !path.exists() {
        return Ok(CostgraphConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: CostgraphConfig = toml::from_str(&raw)?;
    Ok(normalize_config(parsed))
}

pub fn ensure_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<CostgraphConfig, ConfigError> {
    let workspace_root = workspace_root.as_ref();
    fs::create_dir_all(costgraph_dir(workspace_root))?;

    let path = config_path(workspace_root);
    if path.exists() {
        return load_workspace_config(workspace_root);
    }

    let config = CostgraphConfig::default();
    let content = toml::to_string_pretty(&config)?;
    fs::write(path, content)?;

    Ok(config)
}

pub fn validate_config(config: &CostgraphConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    let prices = [
        ("pricing.cpu_per_core_hour", config.pricing.cpu_per_core_hour),
        ("pricing.memory_per_gb_hour", config.pricing.memory_per_gb_hour),
        (
            "pricing.storage_per_gb_hour",
            config.pricing.storage_per_gb_hour,
        ),
    ];
    for (field, value) in prices {
        if !value.is_finite() || value < 0.0 {
            warnings.push(ConfigWarning {
                code: "invalid_price",
                message: format!("{field} must be a finite, non-negative number (got {value})"),
            });
        }
    }

    if config.store.timeout_secs == 0 {
        warnings.push(ConfigWarning {
            code: "zero_timeout",
            message: "store.timeout_secs is 0; store requests will not time out".to_owned(),
        });
    }

    warnings
}

fn default_cpu_price() -> f64 {
    DEFAULT_CPU_PRICE_PER_CORE_HOUR
}

fn default_memory_price() -> f64 {
    DEFAULT_MEMORY_PRICE_PER_GB_HOUR
}

fn default_storage_price() -> f64 {
    DEFAULT_STORAGE_PRICE_PER_GB_HOUR
}

fn default_store_endpoint() -> String {
    DEFAULT_STORE_ENDPOINT.to_owned()
}

fn default_store_timeout_secs() -> u64 {
    DEFAULT_STORE_TIMEOUT_SECS
}

fn normalize_config(mut config: CostgraphConfig) -> CostgraphConfig {
    let endpoint = config.store.endpoint.trim().trim_end_matches('/');
    if endpoint.is_empty() {
        config.store.endpoint = default_store_endpoint();
    } else {
        config.store.endpoint = endpoint.to_owned();
    }

    config
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn ensure_workspace_config_creates_default_file() {
        let temp = tempdir().expect("tempdir");
        let workspace = temp.path();

        let config = ensure_workspace_config(workspace).expect("ensure config");

        assert_eq!(config.pricing, PricingConfig::default());
        assert_eq!(config.store.endpoint, DEFAULT_STORE_ENDPOINT);
        assert!(config_path(workspace).exists());

        let content = fs::read_to_string(config_path(workspace)).expect("read config file");
        assert!(content.contains("[pricing]"));
        assert!(content.contains("cpu_per_core_hour = 0.024"));
        assert!(content.contains("[store]"));
    }

    #[test]
    fn load_workspace_config_parses_pricing_and_store_values() {
        let temp = tempdir().expect("tempdir");
        let workspace = temp.path();
        fs::create_dir_all(costgraph_dir(workspace)).expect("create .costgraph");

        let raw = r#"
[pricing]
cpu_per_core_hour = 0.05
memory_per_gb_hour = 0.02

[store]
endpoint = "  http://dgraph.internal:8080/  "
timeout_secs = 5
"#;
        fs::write(config_path(workspace), raw).expect("write config");

        let config = load_workspace_config(workspace).expect("load config");

        assert_eq!(config.pricing.cpu_per_core_hour, 0.05);
        assert_eq!(config.pricing.memory_per_gb_hour, 0.02);
        assert_eq!(
            config.pricing.storage_per_gb_hour,
            DEFAULT_STORAGE_PRICE_PER_GB_HOUR
        );
        assert_eq!(config.store.endpoint, "http://dgraph.internal:8080");
        assert_eq!(config.store.timeout_secs, 5);
    }

    #[test]
    fn load_workspace_config_defaults_when_missing_and_blank_endpoint() {
        let temp = tempdir().expect("tempdir");
        let workspace = temp.path();

        let config = load_workspace_config(workspace).expect("load missing config");
        assert_eq!(config, CostgraphConfig::default());

        fs::create_dir_all(costgraph_dir(workspace)).expect("create .costgraph");
        fs::write(config_path(workspace), "[store]\nendpoint = \"   \"\n").expect("write config");
        let config = load_workspace_config(workspace).expect("load blank endpoint");
        assert_eq!(config.store.endpoint, DEFAULT_STORE_ENDPOINT);
    }

    #[test]
    fn validate_config_flags_negative_prices_and_zero_timeout() {
        let mut config = CostgraphConfig::default();
        assert!(validate_config(&config).is_empty());

        config.pricing.memory_per_gb_hour = -1.0;
        config.pricing.storage_per_gb_hour = f64::NAN;
        config.store.timeout_secs = 0;

        let warnings = validate_config(&config);
        let codes = warnings
            .iter()
            .map(|warning| warning.code)
            .collect::<Vec<_>>();
        assert_eq!(codes, vec!["invalid_price", "invalid_price", "zero_timeout"]);
        assert!(warnings[0].message.contains("pricing.memory_per_gb_hour"));
    }
}
