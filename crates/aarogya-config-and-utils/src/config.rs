//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default Supabase URL (can be overridden at compile time via SUPABASE_URL env var).
pub const DEFAULT_SUPABASE_URL: &str = match option_env!("SUPABASE_URL") {
    Some(url) => url,
    None => "https://aarogya.supabase.co",
};

/// Default Supabase publishable key (can be overridden at compile time via SUPABASE_PUBLISHABLE_KEY env var).
pub const DEFAULT_SUPABASE_PUBLISHABLE_KEY: &str = match option_env!("SUPABASE_PUBLISHABLE_KEY") {
    Some(key) => key,
    None => "public-anon-key",
};

/// Edge function route accepting one dose event per POST.
pub const DEFAULT_DOSE_EVENTS_ROUTE: &str = "make-server-b3c2a063/dose-events";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 15;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Supabase project URL.
    #[serde(default = "default_supabase_url")]
    pub supabase_url: String,
    /// Supabase publishable API key (public, safe to expose).
    #[serde(default = "default_supabase_publishable_key")]
    pub supabase_publishable_key: String,
    /// Edge function route for dose-event ingress, relative to `/functions/v1/`.
    #[serde(default = "default_dose_events_route")]
    pub dose_events_route: String,
    /// HTTP request timeout applied to every remote call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// How often the connectivity probe runs when no host signal is available.
    #[serde(default = "default_probe_interval_secs")]
    pub connectivity_probe_interval_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_supabase_url() -> String {
    DEFAULT_SUPABASE_URL.to_string()
}

fn default_supabase_publishable_key() -> String {
    DEFAULT_SUPABASE_PUBLISHABLE_KEY.to_string()
}

fn default_dose_events_route() -> String {
    DEFAULT_DOSE_EVENTS_ROUTE.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_probe_interval_secs() -> u64 {
    DEFAULT_PROBE_INTERVAL_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            supabase_url: default_supabase_url(),
            supabase_publishable_key: default_supabase_publishable_key(),
            dose_events_route: default_dose_events_route(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connectivity_probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("AAROGYA_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }

    /// Reject values that would make every remote call fail.
    pub fn validate(&self) -> CoreResult<()> {
        self.supabase_url()?;
        if self.dose_events_route.trim_matches('/').is_empty() {
            return Err(CoreError::Config("dose_events_route must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config("request_timeout_secs must be positive".to_string()));
        }
        if self.connectivity_probe_interval_secs == 0 {
            return Err(CoreError::Config(
                "connectivity_probe_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the Supabase URL as a parsed URL.
    pub fn supabase_url(&self) -> CoreResult<Url> {
        Url::parse(&self.supabase_url).map_err(CoreError::from)
    }

    /// Full URL of the dose-event ingress edge function.
    pub fn dose_events_url(&self) -> String {
        format!(
            "{}/functions/v1/{}",
            self.supabase_url.trim_end_matches('/'),
            self.dose_events_route.trim_matches('/')
        )
    }

    /// Supabase auth endpoint used for refresh-token grants.
    pub fn auth_token_url(&self) -> String {
        format!(
            "{}/auth/v1/token?grant_type=refresh_token",
            self.supabase_url.trim_end_matches('/')
        )
    }

    /// Supabase auth health route, used as the connectivity probe target.
    pub fn health_url(&self) -> String {
        format!("{}/auth/v1/health", self.supabase_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.supabase_url, DEFAULT_SUPABASE_URL);
        assert_eq!(config.dose_events_route, DEFAULT_DOSE_EVENTS_ROUTE);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_from_file_fills_missing_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        std::fs::write(&config_path, r#"{ "log_level": "debug" }"#).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.supabase_url, DEFAULT_SUPABASE_URL);
        assert_eq!(config.connectivity_probe_interval_secs, 15);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.supabase_url = "https://clinic.supabase.co".to_string();
        config.request_timeout_secs = 5;
        config.save(&paths).unwrap();

        let loaded = Config::load(&paths).unwrap();
        assert_eq!(loaded.supabase_url, "https://clinic.supabase.co");
        assert_eq!(loaded.request_timeout_secs, 5);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.supabase_url, DEFAULT_SUPABASE_URL);
    }

    #[test]
    fn test_config_invalid_url() {
        let mut config = Config::default();
        config.supabase_url = "not a valid url".to_string();

        assert!(config.supabase_url().is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_zero_timeout() {
        let mut config = Config::default();
        config.request_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_remote_urls() {
        let mut config = Config::default();
        config.supabase_url = "https://abc.supabase.co/".to_string();
        config.dose_events_route = "/make-server/dose-events/".to_string();

        assert_eq!(
            config.dose_events_url(),
            "https://abc.supabase.co/functions/v1/make-server/dose-events"
        );
        assert_eq!(
            config.auth_token_url(),
            "https://abc.supabase.co/auth/v1/token?grant_type=refresh_token"
        );
        assert_eq!(config.health_url(), "https://abc.supabase.co/auth/v1/health");
    }
}
