//! Runtime configuration.
//!
//! Every setting has a default suitable for an in-cluster deployment and can be
//! overridden through environment variables:
//!
//! | Variable                | Default                      |
//! |-------------------------|------------------------------|
//! | `WEBHOOK_PORT`          | 9443                         |
//! | `WEBHOOK_CERT_PATH`     | `/etc/webhook/certs/tls.crt` |
//! | `WEBHOOK_KEY_PATH`      | `/etc/webhook/certs/tls.key` |
//! | `HEALTH_PORT`           | 8080                         |
//! | `RECEIVER_PORT`         | unset (receiver disabled)    |
//! | `VALIDATION_TIMEOUT_MS` | 30000                        |
//! | `PROVISION_LATENCY_MS`  | 0                            |

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::health::HEALTH_PORT;
use crate::webhooks::{
    DEFAULT_VALIDATION_TIMEOUT, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT,
};

/// Errors raised while reading configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for the webhook process.
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// Port of the admission webhook listener.
    pub webhook_port: u16,
    /// TLS certificate (PEM).
    pub cert_path: PathBuf,
    /// TLS private key (PEM).
    pub key_path: PathBuf,
    /// Port of the health/metrics listener.
    pub health_port: u16,
    /// Port of the echo receiver, if enabled.
    pub receiver_port: Option<u16>,
    /// Budget for a single SlackMessage validation.
    pub validation_timeout: Duration,
    /// Simulated latency of the in-memory channel backend.
    pub provision_latency: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            webhook_port: WEBHOOK_PORT,
            cert_path: PathBuf::from(WEBHOOK_CERT_PATH),
            key_path: PathBuf::from(WEBHOOK_KEY_PATH),
            health_port: HEALTH_PORT,
            receiver_port: None,
            validation_timeout: DEFAULT_VALIDATION_TIMEOUT,
            provision_latency: Duration::ZERO,
        }
    }
}

impl WebhookConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = parse_var(&lookup, "WEBHOOK_PORT")? {
            config.webhook_port = port;
        }
        if let Some(path) = lookup("WEBHOOK_CERT_PATH") {
            config.cert_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("WEBHOOK_KEY_PATH") {
            config.key_path = PathBuf::from(path);
        }
        if let Some(port) = parse_var(&lookup, "HEALTH_PORT")? {
            config.health_port = port;
        }
        config.receiver_port = parse_var(&lookup, "RECEIVER_PORT")?;

        if let Some(millis) = parse_var::<u64, _>(&lookup, "VALIDATION_TIMEOUT_MS")? {
            if millis == 0 {
                return Err(ConfigError::Invalid {
                    key: "VALIDATION_TIMEOUT_MS",
                    value: millis.to_string(),
                    reason: "timeout must be greater than zero".to_string(),
                });
            }
            config.validation_timeout = Duration::from_millis(millis);
        }
        if let Some(millis) = parse_var::<u64, _>(&lookup, "PROVISION_LATENCY_MS")? {
            config.provision_latency = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Whether both TLS files are present on disk.
    pub fn tls_available(&self) -> bool {
        self.cert_path.exists() && self.key_path.exists()
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}
