// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::cli::Args;
use crate::epoch::CacheEpoch;
use crate::error::{OfflineError, Result};
use config::{Config, Environment, File};
use reqwest::Url;
use std::path::PathBuf;

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. CLI arguments (highest, see [`AppConfig::apply_args`])
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest)
    pub fn load(path: Option<&str>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_string(), true),
            None => (Self::default_config_path(), false),
        };

        let config = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::with_name(&path).required(required))
            // LEBRQ_OFFLINE_UPSTREAM__ORIGIN, LEBRQ_OFFLINE_CACHE__EPOCH, ...
            .add_source(
                Environment::with_prefix("LEBRQ_OFFLINE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cache.precache")
                    .with_list_parse_key("cache.fresh_routes"),
            )
            .build()
            .map_err(|e| OfflineError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| OfflineError::Config(e.to_string()))
    }

    /// Apply command line overrides on top of the loaded configuration.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(origin) = &args.origin {
            self.upstream.origin = origin.clone();
        }
        if let Some(epoch) = &args.epoch {
            self.cache.epoch = epoch.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
    }

    /// Reject settings the router cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.origin_url()?;
        CacheEpoch::new(&self.cache.epoch)?;

        if self.cache.api_prefix.is_empty() {
            return Err(OfflineError::Config("cache.api_prefix must not be empty".into()));
        }
        if self.cache.fresh_routes.iter().any(|r| r.is_empty()) {
            return Err(OfflineError::Config(
                "cache.fresh_routes must not contain empty patterns".into(),
            ));
        }
        if let Some(bad) = self.cache.precache.iter().find(|p| !p.starts_with('/')) {
            return Err(OfflineError::Config(format!(
                "precache path {:?} must start with '/'",
                bad
            )));
        }
        Ok(())
    }

    /// Parse `upstream.origin`. It must be a bare http(s) origin.
    pub fn origin_url(&self) -> Result<Url> {
        let url = Url::parse(&self.upstream.origin)
            .map_err(|e| OfflineError::Config(format!("upstream.origin: {}", e)))?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(OfflineError::Config(format!(
                "upstream.origin must be an http(s) origin, got {}",
                self.upstream.origin
            )));
        }
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(OfflineError::Config(format!(
                "upstream.origin must not carry a path, query or fragment, got {}",
                self.upstream.origin
            )));
        }
        Ok(url)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| OfflineError::Config(e.to_string()))
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lebrq-offline")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.api_prefix, "/api/");
        assert_eq!(config.cache.precache, vec!["/".to_string()]);
        assert!(config.cache.epoch.starts_with("lebrq-v"));
    }

    #[test]
    fn test_origin_with_path_rejected() {
        let mut config = AppConfig::default();
        config.upstream.origin = "https://lebrq.example/app".to_string();
        assert!(config.validate().is_err());

        config.upstream.origin = "ftp://lebrq.example".to_string();
        assert!(config.validate().is_err());

        config.upstream.origin = "https://lebrq.example".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_epoch_rejected() {
        let mut config = AppConfig::default();
        config.cache.epoch = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_precache_rejected() {
        let mut config = AppConfig::default();
        config.cache.precache = vec!["index.html".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "lebrq-offline",
            "--origin",
            "https://lebrq.example",
            "--epoch",
            "lebrq-v9",
            "--port",
            "9000",
        ]);
        let mut config = AppConfig::default();
        config.apply_args(&args);

        assert_eq!(config.upstream.origin, "https://lebrq.example");
        assert_eq!(config.cache.epoch, "lebrq-v9");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_toml_roundtrip_keeps_backend() {
        let mut config = AppConfig::default();
        config.cache.backend = StoreBackend::Disk;
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("backend = \"disk\""));

        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.cache.backend, StoreBackend::Disk);
    }
}
