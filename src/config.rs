//! Runtime configuration.
//!
//! Settings come from an optional YAML file and are then overridden by CLI
//! flags / environment variables (see [`crate::cli`]). Every field except
//! `representative_country` has a default.
//!
//! ```yaml
//! representative_country: TW
//! cache_ttl_secs: 1190
//! refresh_concurrency: 12
//! topic_path_overrides:
//!   health: /CAAqIQgKIhtDQkFTRGdvSUwyMHZNR3QwTlRFU0FtVnVLQUFQAQ
//! ```

use crate::cache::{DEFAULT_TTL, MAX_TTL};
use crate::taxonomy::{Category, CountryCode};
use crate::topics::BootstrapSettings;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewsConfig {
    /// Root for rendered pages and for resolving relative article links.
    pub site_base_url: String,
    pub feed_base_url: String,
    pub home_url: String,
    /// Edition whose home menu defines the category → topic path map.
    pub representative_country: Option<CountryCode>,
    pub cache_ttl_secs: u64,
    /// Pair tasks in flight during a bulk refresh.
    pub refresh_concurrency: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub topic_path_overrides: BTreeMap<Category, String>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            site_base_url: "https://news.google.com".to_string(),
            feed_base_url: "https://news.google.com/rss".to_string(),
            home_url: "https://news.google.com/home".to_string(),
            representative_country: None,
            cache_ttl_secs: DEFAULT_TTL.as_secs(),
            refresh_concurrency: 12,
            request_timeout_secs: 30,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            topic_path_overrides: BTreeMap::new(),
        }
    }
}

impl NewsConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check cross-field constraints and return the representative edition.
    pub fn validate(&self) -> Result<CountryCode, ConfigError> {
        let representative = match self.representative_country {
            None => {
                return Err(ConfigError::Invalid(
                    "representative_country must be set (config file or --representative-country)"
                        .to_string(),
                ));
            }
            Some(CountryCode::None) => {
                return Err(ConfigError::Invalid(
                    "representative_country cannot be `none`".to_string(),
                ));
            }
            Some(country) => country,
        };
        if self.cache_ttl_secs == 0 || self.cache_ttl_secs > MAX_TTL.as_secs() {
            return Err(ConfigError::Invalid(format!(
                "cache_ttl_secs must be between 1 and {}",
                MAX_TTL.as_secs()
            )));
        }
        if self.refresh_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "refresh_concurrency must be positive".to_string(),
            ));
        }
        url::Url::parse(&self.site_base_url)
            .map_err(|e| ConfigError::Invalid(format!("site_base_url: {e}")))?;
        Ok(representative)
    }

    pub fn bootstrap_settings(&self, representative: CountryCode) -> BootstrapSettings {
        BootstrapSettings {
            home_url: self.home_url.clone(),
            representative,
            overrides: self.topic_path_overrides.clone(),
        }
    }
}

pub fn parse_config(yaml: &str, path: &Path) -> Result<NewsConfig, ConfigError> {
    serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[instrument(level = "info")]
pub async fn load_config(path: &Path) -> Result<NewsConfig, ConfigError> {
    let yaml = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let config = parse_config(&yaml, path)?;
    info!(?config.representative_country, "Loaded configuration");
    Ok(config)
}
