use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub backend: BackendConfig,
    pub integrations: IntegrationConfig,
    pub filter: FilterConfig,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: Url,
    pub anon_key: String,
}

/// Keys for third-party integrations. Both are optional; the features that
/// consume them are stubbed when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrationConfig {
    pub payment_key_id: Option<String>,
    pub maps_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub max_limit: Option<i32>,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub timeout_secs: u64,
    pub session_file: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid backend URL '{value}': {reason}")]
    InvalidUrl { value: String, reason: String },
}

pub const BACKEND_URL_VAR: &str = "TM_BACKEND_URL";
pub const BACKEND_ANON_KEY_VAR: &str = "TM_BACKEND_ANON_KEY";

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// The backend endpoint and anonymous key are mandatory; their absence is
    /// fatal at startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`AppConfig::from_env`] but reads variables through `lookup`,
    /// which keeps tests independent of the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let raw_url = non_empty(lookup(BACKEND_URL_VAR)).ok_or(ConfigError::MissingVar(BACKEND_URL_VAR))?;
        let url = Url::parse(&raw_url).map_err(|e| ConfigError::InvalidUrl {
            value: raw_url.clone(),
            reason: e.to_string(),
        })?;
        let anon_key = non_empty(lookup(BACKEND_ANON_KEY_VAR)).ok_or(ConfigError::MissingVar(BACKEND_ANON_KEY_VAR))?;

        let backend = BackendConfig { url, anon_key };
        let integrations = IntegrationConfig {
            payment_key_id: non_empty(lookup("TM_PAYMENT_KEY_ID")),
            maps_api_key: non_empty(lookup("TM_MAPS_API_KEY")),
        };

        let config = match environment {
            Environment::Production => Self::production(backend, integrations),
            Environment::Staging => Self::staging(backend, integrations),
            Environment::Development => Self::development(backend, integrations),
        };

        Ok(config.with_overrides(&lookup))
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FILTER_MAX_LIMIT") {
            self.filter.max_limit = v.parse().ok();
        }
        if let Some(v) = lookup("FILTER_DEBUG_LOGGING") {
            self.filter.debug_logging = v.parse().unwrap_or(self.filter.debug_logging);
        }
        if let Some(v) = lookup("GATEWAY_TIMEOUT_SECS") {
            self.gateway.timeout_secs = v.parse().unwrap_or(self.gateway.timeout_secs);
        }
        if let Some(v) = non_empty(lookup("TM_SESSION_FILE")) {
            self.gateway.session_file = Some(PathBuf::from(v));
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.timeout_secs)
    }

    fn development(backend: BackendConfig, integrations: IntegrationConfig) -> Self {
        Self {
            environment: Environment::Development,
            backend,
            integrations,
            filter: FilterConfig {
                max_limit: Some(1000),
                debug_logging: true,
            },
            gateway: GatewayConfig {
                timeout_secs: 30,
                session_file: None,
            },
        }
    }

    fn staging(backend: BackendConfig, integrations: IntegrationConfig) -> Self {
        Self {
            environment: Environment::Staging,
            backend,
            integrations,
            filter: FilterConfig {
                max_limit: Some(500),
                debug_logging: false,
            },
            gateway: GatewayConfig {
                timeout_secs: 15,
                session_file: None,
            },
        }
    }

    fn production(backend: BackendConfig, integrations: IntegrationConfig) -> Self {
        Self {
            environment: Environment::Production,
            backend,
            integrations,
            filter: FilterConfig {
                max_limit: Some(100),
                debug_logging: false,
            },
            gateway: GatewayConfig {
                timeout_secs: 10,
                session_file: None,
            },
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// Process-wide config, installed once by the binary. Library code treats it as optional.
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// Install the process-wide configuration. Returns false if one was already installed.
pub fn install(config: AppConfig) -> bool {
    CONFIG.set(config).is_ok()
}

pub fn config() -> Option<&'static AppConfig> {
    CONFIG.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_backend_url_is_fatal() {
        let result = AppConfig::from_lookup(lookup_from(&[(BACKEND_ANON_KEY_VAR, "anon")]));
        assert!(matches!(result, Err(ConfigError::MissingVar(BACKEND_URL_VAR))));
    }

    #[test]
    fn test_missing_anon_key_is_fatal() {
        let result = AppConfig::from_lookup(lookup_from(&[(BACKEND_URL_VAR, "https://example.supabase.co")]));
        assert!(matches!(result, Err(ConfigError::MissingVar(BACKEND_ANON_KEY_VAR))));
    }

    #[test]
    fn test_blank_anon_key_counts_as_missing() {
        let result = AppConfig::from_lookup(lookup_from(&[
            (BACKEND_URL_VAR, "https://example.supabase.co"),
            (BACKEND_ANON_KEY_VAR, "   "),
        ]));
        assert!(matches!(result, Err(ConfigError::MissingVar(BACKEND_ANON_KEY_VAR))));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[
            (BACKEND_URL_VAR, "not a url"),
            (BACKEND_ANON_KEY_VAR, "anon"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (BACKEND_URL_VAR, "https://example.supabase.co"),
            (BACKEND_ANON_KEY_VAR, "anon"),
        ]))
        .unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.filter.max_limit, Some(1000));
        assert!(config.integrations.payment_key_id.is_none());
    }

    #[test]
    fn test_production_with_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("APP_ENV", "prod"),
            (BACKEND_URL_VAR, "https://example.supabase.co"),
            (BACKEND_ANON_KEY_VAR, "anon"),
            ("GATEWAY_TIMEOUT_SECS", "3"),
            ("TM_MAPS_API_KEY", "maps-key"),
        ]))
        .unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.filter.max_limit, Some(100));
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.integrations.maps_api_key.as_deref(), Some("maps-key"));
    }
}
