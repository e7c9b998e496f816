//! Engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `SPLITLIST_INVITE_HOST` - Host recognized in https/http invite links
//!   (default: `splitlist.app`)
//! - `SPLITLIST_INVITE_SCHEME` - Custom app scheme recognized in invite
//!   links (default: `splitlist`)
//! - `SPLITLIST_STORE_TIMEOUT_SECS` - Per-call store timeout in seconds,
//!   applied when wrapping a store in
//!   [`TimeoutStore`](crate::store::TimeoutStore) (default: 10)

use std::env;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_INVITE_HOST: &str = "splitlist.app";
const DEFAULT_INVITE_SCHEME: &str = "splitlist";
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Invite-link recognition and generation settings.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Host accepted in https/http invite links.
    pub host: String,
    /// Custom app scheme accepted in invite links.
    pub scheme: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_INVITE_HOST.to_owned(),
            scheme: DEFAULT_INVITE_SCHEME.to_owned(),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Invite-link settings.
    pub link: LinkConfig,
    /// Bound on each store round-trip.
    pub store_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a set variable fails
    /// validation (empty host/scheme, non-numeric or zero timeout).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(host) = env::var("SPLITLIST_INVITE_HOST") {
            config.link.host = parse_host("SPLITLIST_INVITE_HOST", &host)?;
        }
        if let Ok(scheme) = env::var("SPLITLIST_INVITE_SCHEME") {
            config.link.scheme = parse_scheme("SPLITLIST_INVITE_SCHEME", &scheme)?;
        }
        if let Ok(secs) = env::var("SPLITLIST_STORE_TIMEOUT_SECS") {
            config.store_timeout = parse_timeout("SPLITLIST_STORE_TIMEOUT_SECS", &secs)?;
        }

        Ok(config)
    }
}

fn parse_host(name: &str, raw: &str) -> Result<String, ConfigError> {
    let host = raw.trim();
    if host.is_empty() || host.contains('/') {
        return Err(ConfigError::InvalidEnvVar(
            name.to_owned(),
            "must be a bare host name".to_owned(),
        ));
    }
    Ok(host.to_owned())
}

fn parse_scheme(name: &str, raw: &str) -> Result<String, ConfigError> {
    let scheme = raw.trim();
    let valid = !scheme.is_empty()
        && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.');
    if !valid {
        return Err(ConfigError::InvalidEnvVar(
            name.to_owned(),
            "must be a valid URI scheme".to_owned(),
        ));
    }
    Ok(scheme.to_lowercase())
}

fn parse_timeout(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvVar(name.to_owned(), "must be an integer".to_owned()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            name.to_owned(),
            "must be greater than zero".to_owned(),
        ));
    }
    Ok(Duration::from_secs(secs))
}
