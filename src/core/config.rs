use anyhow::{Context, Result};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_RATE_BASE_URL: &str = "https://api.exchangerate.host";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub exchange_rate: Option<ExchangeRateProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            exchange_rate: Some(ExchangeRateProviderConfig {
                base_url: DEFAULT_RATE_BASE_URL.to_string(),
            }),
        }
    }
}

fn default_fallback_rate() -> Decimal {
    Decimal::from(1300)
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// KRW per USD used when the rate source is down and no manual rate is given.
    #[serde(default = "default_fallback_rate")]
    pub fallback_rate: Decimal,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            fallback_rate: default_fallback_rate(),
            data_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults
    /// when no file has been set up yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "wonspend", "wonspend")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "wonspend", "wonspend")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn rate_base_url(&self) -> &str {
        self.providers
            .exchange_rate
            .as_ref()
            .map_or(DEFAULT_RATE_BASE_URL, |p| &p.base_url)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        if config.fallback_rate <= Decimal::ZERO {
            anyhow::bail!(
                "fallback_rate must be greater than 0 in {}",
                path.as_ref().display()
            );
        }
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
providers:
  exchange_rate:
    base_url: "http://example.com/rates"
fallback_rate: 1325.5
data_path: "/tmp/wonspend"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.rate_base_url(), "http://example.com/rates");
        assert_eq!(config.fallback_rate, dec!(1325.5));
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/wonspend")
        );
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("data_path: ~\n").unwrap();
        assert_eq!(config.rate_base_url(), DEFAULT_RATE_BASE_URL);
        assert_eq!(config.fallback_rate, dec!(1300));
        assert!(config.data_path.is_none());

        let config = AppConfig {
            providers: ProvidersConfig {
                exchange_rate: None,
            },
            ..AppConfig::default()
        };
        assert_eq!(config.rate_base_url(), DEFAULT_RATE_BASE_URL);
    }

    #[test]
    fn test_load_rejects_non_positive_fallback() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fallback_rate: 0").unwrap();

        let err = AppConfig::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("fallback_rate must be greater than 0"));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load_from_path(dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config file"));
    }
}
