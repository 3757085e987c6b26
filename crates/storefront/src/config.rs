//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BACKEND_URL` - Base URL of the shop's REST backend (e.g., `https://api.cafedeorigen.es`)
//!
//! ## Optional
//! - `BACKEND_TIMEOUT_SECS` - Per-request timeout for backend calls (default: 10)
//! - `BACKEND_CACHE_TTL_SECS` - Product cache lifetime (default: 300)
//! - `BACKEND_CACHE_CAPACITY` - Maximum cached product responses (default: 1000)
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (default: <http://localhost:3000>)
//! - `STOREFRONT_AUTH_RATE_LIMIT` - Rate-limit login and registration (default: true)
//! - `STOREFRONT_TRUSTED_PROXIES` - Comma-separated proxy IPs whose `X-Forwarded-For` is believed (default: none)
//! - `STOREFRONT_SESSION_CAPACITY` - Maximum sessions held in memory (default: 10000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Fraction of error events sent (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Fraction of transactions traced (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Whether `/login` and `/register` are rate limited per client IP
    pub auth_rate_limit: bool,
    /// Reverse proxies allowed to report the client IP in `X-Forwarded-For`
    pub trusted_proxies: Vec<IpAddr>,
    /// Maximum number of sessions kept in memory
    pub session_capacity: u64,
    /// REST backend configuration
    pub backend: BackendConfig,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
}

/// REST backend configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL; API paths are resolved against `{base_url}/api/`
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// Lifetime of cached product responses
    pub cache_ttl: Duration,
    /// Maximum number of cached product responses
    pub cache_capacity: u64,
}

/// Sentry configuration.
///
/// Implements `Debug` manually to redact the DSN.
#[derive(Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN (contains the project key)
    pub dsn: Option<SecretString>,
    /// Environment name reported with events
    pub environment: Option<String>,
    /// Fraction of error events sent
    pub sample_rate: f32,
    /// Fraction of transactions traced
    pub traces_sample_rate: f32,
}

impl std::fmt::Debug for SentryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentryConfig")
            .field("dsn", &self.dsn.as_ref().map(|_| "[REDACTED]"))
            .field("environment", &self.environment)
            .field("sample_rate", &self.sample_rate)
            .field("traces_sample_rate", &self.traces_sample_rate)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("STOREFRONT_PORT", "3000")?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000");
        let auth_rate_limit = parse_bool("STOREFRONT_AUTH_RATE_LIMIT", true)?;
        let trusted_proxies = parse_ip_list(
            "STOREFRONT_TRUSTED_PROXIES",
            &get_env_or_default("STOREFRONT_TRUSTED_PROXIES", ""),
        )?;
        let session_capacity =
            parse_env_or_default::<u64>("STOREFRONT_SESSION_CAPACITY", "10000")?;
        if session_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_SESSION_CAPACITY".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            base_url,
            auth_rate_limit,
            trusted_proxies,
            session_capacity,
            backend: BackendConfig::from_env()?,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (controls the `Secure` cookie flag).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl StorefrontConfig {
    /// Default maximum number of in-memory sessions.
    pub const DEFAULT_SESSION_CAPACITY: u64 = 10_000;
}

impl BackendConfig {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default product cache lifetime.
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

    /// Build a configuration with default timeouts for the given backend URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL cannot be parsed or is
    /// not http(s).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_backend_url(base_url)?,
            timeout: Self::DEFAULT_TIMEOUT,
            cache_ttl: Self::DEFAULT_CACHE_TTL,
            cache_capacity: 1000,
        })
    }

    /// Load the backend section from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `BACKEND_URL` is missing or any value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_required_env("BACKEND_URL")?;
        let timeout = parse_env_or_default::<u64>("BACKEND_TIMEOUT_SECS", "10")?;
        let cache_ttl = parse_env_or_default::<u64>("BACKEND_CACHE_TTL_SECS", "300")?;
        let cache_capacity = parse_env_or_default::<u64>("BACKEND_CACHE_CAPACITY", "1000")?;

        if timeout == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BACKEND_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            base_url: parse_backend_url(&base_url)?,
            timeout: Duration::from_secs(timeout),
            cache_ttl: Duration::from_secs(cache_ttl),
            cache_capacity,
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN").map(SecretString::from),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or_default::<f32>("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env_or_default::<f32>("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a boolean flag (`true/false`, `1/0`, `yes/no`, `on/off`).
fn parse_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = get_optional_env(key) else {
        return Ok(default);
    };
    parse_bool_value(&value)
        .ok_or_else(|| ConfigError::InvalidEnvVar(key.to_string(), format!("not a boolean: {value}")))
}

fn parse_bool_value(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a comma-separated list of IP addresses. Blank entries are skipped.
fn parse_ip_list(key: &str, raw: &str) -> Result<Vec<IpAddr>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<IpAddr>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), format!("{entry}: {e}")))
        })
        .collect()
}

/// Parse the backend base URL, normalizing it to end with a slash so
/// relative joins keep any path prefix.
fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };

    let url = Url::parse(&with_slash)
        .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_URL".to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "BACKEND_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            auth_rate_limit: true,
            trusted_proxies: Vec::new(),
            session_capacity: StorefrontConfig::DEFAULT_SESSION_CAPACITY,
            backend: BackendConfig::new("http://localhost:3001").unwrap(),
            sentry: SentryConfig::default(),
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_is_secure() {
        let mut config = test_config();
        assert!(!config.is_secure());
        config.base_url = "https://cafedeorigen.es".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_backend_url_gets_trailing_slash() {
        let url = parse_backend_url("https://api.example.com/shop").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/shop/");
        assert_eq!(
            url.join("api/hello").unwrap().as_str(),
            "https://api.example.com/shop/api/hello"
        );
    }

    #[test]
    fn test_backend_url_rejects_other_schemes() {
        let err = parse_backend_url("ftp://example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
        assert!(parse_backend_url("not a url").is_err());
    }

    #[test]
    fn test_parse_bool_value() {
        assert_eq!(parse_bool_value("TRUE"), Some(true));
        assert_eq!(parse_bool_value(" off "), Some(false));
        assert_eq!(parse_bool_value("0"), Some(false));
        assert_eq!(parse_bool_value("maybe"), None);
    }

    #[test]
    fn test_parse_ip_list() {
        let ips = parse_ip_list("KEY", " 10.0.0.1, ,::1 ").unwrap();
        assert_eq!(ips.len(), 2);
        assert_eq!(ips[0].to_string(), "10.0.0.1");
        assert_eq!(ips[1].to_string(), "::1");
        assert!(parse_ip_list("KEY", "").unwrap().is_empty());
        assert!(matches!(
            parse_ip_list("KEY", "10.0.0.1,proxy"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_sentry_config_debug_redacts_dsn() {
        let config = SentryConfig {
            dsn: Some(SecretString::from("https://key@sentry.example.com/1")),
            environment: Some("production".to_string()),
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("production"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("key@sentry"));
    }
}
