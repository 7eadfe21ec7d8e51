//! Environment-style configuration for both handlers.
//!
//! Every required value is resolved before the first collaborator call so a
//! missing variable surfaces as a configuration error, never as a fault in
//! the middle of an invocation.

pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CATALOG_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(variable) => write!(f, "{variable} must be configured"),
            Self::Invalid(variable, message) => {
                write!(f, "{variable} is invalid: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration of the queue-to-topic relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub topic_arn: String,
    pub queue_url: String,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            topic_arn: required(&lookup, "TOPIC_ARN")?,
            queue_url: required(&lookup, "QUEUE_URL")?,
        })
    }
}

/// Configuration of the catalog-versus-blob-store reconciliation scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    pub db_host: String,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub table_name: String,
    pub bucket: String,
    pub probe_timeout_secs: u64,
    pub catalog_timeout_secs: u64,
}

impl ReconcileConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let probe_timeout_secs = timeout_secs(&lookup, "PROBE_TIMEOUT_SECS", DEFAULT_PROBE_TIMEOUT_SECS)?;
        let catalog_timeout_secs = timeout_secs(
            &lookup,
            "CATALOG_TIMEOUT_SECS",
            DEFAULT_CATALOG_TIMEOUT_SECS,
        )?;

        Ok(Self {
            db_host: required(&lookup, "DB_HOST")?,
            db_user: required(&lookup, "DB_USER")?,
            db_password: required(&lookup, "DB_PASSWORD")?,
            db_name: required(&lookup, "DB_NAME")?,
            table_name: required(&lookup, "TABLE_NAME")?,
            bucket: required(&lookup, "BUCKET")?,
            probe_timeout_secs,
            catalog_timeout_secs,
        })
    }
}

fn timeout_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}
