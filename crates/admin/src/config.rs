//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_BASE_URL` - Public URL for the admin console
//! - `BACKEND_URL` - Base URL of the EventConnect backend API
//! - `IDENTITY_API_KEY` - API key for the identity provider
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `BACKEND_TIMEOUT_SECS` - Per-request backend timeout (default: 10)
//! - `IDENTITY_BASE_URL` - Identity provider REST base
//!   (default: <https://identitytoolkit.googleapis.com/v1>)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Default identity provider REST base.
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Shortest identity API key accepted.
const MIN_API_KEY_LENGTH: usize = 20;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin application configuration.
#[derive(Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin console
    pub base_url: String,
    /// Backend API configuration
    pub backend: BackendConfig,
    /// Identity provider configuration
    pub identity: IdentityConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("backend", &self.backend)
            .field("identity", &self.identity)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .field("sentry_sample_rate", &self.sentry_sample_rate)
            .field("sentry_traces_sample_rate", &self.sentry_traces_sample_rate)
            .finish()
    }
}

/// Backend API configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL; API paths are joined onto it
    pub url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Identity provider configuration.
#[derive(Clone)]
pub struct IdentityConfig {
    /// REST base, e.g. `https://identitytoolkit.googleapis.com/v1`
    pub base_url: String,
    /// Project API key sent as the `key` query parameter
    pub api_key: SecretString,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = parse_env("ADMIN_PORT", "3001")?;
        let base_url = get_required_env("ADMIN_BASE_URL")?;

        Ok(Self {
            host,
            port,
            base_url,
            backend: BackendConfig::from_env()?,
            identity: IdentityConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("BACKEND_URL")?;
        let url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_URL".to_string(), e.to_string()))?;
        let timeout = Duration::from_secs(parse_env("BACKEND_TIMEOUT_SECS", "10")?);
        Ok(Self { url, timeout })
    }
}

impl IdentityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_env_or_default("IDENTITY_BASE_URL", DEFAULT_IDENTITY_BASE_URL);
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("IDENTITY_BASE_URL".to_string(), e.to_string())
        })?;

        let api_key = SecretString::from(get_required_env("IDENTITY_API_KEY")?);
        validate_api_key(&api_key, "IDENTITY_API_KEY")?;

        Ok(Self { base_url, api_key })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Reject empty, short, or whitespace-padded API keys.
fn validate_api_key(key: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = key.expose_secret();
    if value.trim() != value {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            "contains leading or trailing whitespace".to_string(),
        ));
    }
    if value.len() < MIN_API_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_API_KEY_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}
