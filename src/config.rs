use std::collections::HashMap;
use std::env;
use std::fmt;

use anyhow::{bail, Context, Result};

use crate::models::DeviceName;

const DEFAULT_TOKEN_VAR: &str = "POST_TOKEN";
const DEVICE_TOKEN_PREFIX: &str = "POST_TOKEN_";

/// Where address records are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Spanner,
}

#[derive(Debug, Clone)]
pub struct SpannerConfig {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
}

/// Write tokens: one optional default plus per-device overrides
///
/// Per-device tokens are keyed by the upper-cased device name. Empty values
/// are treated as not configured.
#[derive(Clone, Default)]
pub struct TokenConfig {
    pub default_token: Option<String>,
    pub device_tokens: HashMap<String, String>,
}

impl TokenConfig {
    /// The secret a writer must present for this device, if any
    pub fn resolve(&self, device: &DeviceName) -> Option<&str> {
        let configured = |token: &&String| !token.is_empty();
        self.device_tokens
            .get(&device.token_key())
            .filter(configured)
            .or(self.default_token.as_ref().filter(configured))
            .map(String::as_str)
    }

    /// Check raw `Authorization` header bytes against the resolved secret
    ///
    /// Compared as bytes, so secrets outside visible ASCII still match.
    pub fn authorizes(&self, device: &DeviceName, authorization: Option<&[u8]>) -> bool {
        let Some(secret) = self.resolve(device) else {
            return false;
        };
        authorization.and_then(|value| value.strip_prefix(b"Bearer ")) == Some(secret.as_bytes())
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field(
                "default_token",
                &self.default_token.as_ref().map(|_| "<redacted>"),
            )
            .field("device_tokens", &self.device_tokens.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub service_port: u16,
    pub service_host: String,
    pub storage_backend: StorageBackend,
    pub spanner: Option<SpannerConfig>,
    pub tokens: TokenConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let vars = env::vars_os().filter_map(|(key, value)| {
            Some((key.into_string().ok()?, value.into_string().ok()?))
        });
        Self::from_vars(vars)
    }

    /// Build the configuration from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();

        let service_port = vars
            .get("SERVICE_PORT")
            .map(String::as_str)
            .unwrap_or("3000")
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = vars
            .get("SERVICE_HOST")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let storage_backend = match vars.get("STORAGE_BACKEND").map(String::as_str) {
            None | Some("memory") => StorageBackend::Memory,
            Some("spanner") => StorageBackend::Spanner,
            Some(other) => bail!(
                "STORAGE_BACKEND must be one of: memory, spanner, got '{}'",
                other
            ),
        };

        let spanner = match storage_backend {
            StorageBackend::Memory => None,
            StorageBackend::Spanner => Some(spanner_config(&vars)?),
        };

        Ok(Config {
            service_port,
            service_host,
            storage_backend,
            spanner,
            tokens: token_config(&vars),
        })
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Storage backend: {:?}", self.storage_backend);
        if let Some(spanner) = &self.spanner {
            tracing::info!(
                "  Spanner emulator: {}",
                spanner
                    .emulator_host
                    .as_deref()
                    .unwrap_or("disabled (using production)")
            );
            tracing::info!("  Spanner project: {}", spanner.project);
            tracing::info!("  Spanner instance: {}", spanner.instance);
            tracing::info!("  Spanner database: {}", spanner.database);
        }
        tracing::info!(
            "  Default write token: {}",
            if self.tokens.default_token.is_some() {
                "configured"
            } else {
                "not set"
            }
        );
        tracing::info!("  Per-device write tokens: {}", self.tokens.device_tokens.len());
        tracing::info!("  Service listening on: {}:{}", self.service_host, self.service_port);
    }
}

fn spanner_config(vars: &HashMap<String, String>) -> Result<SpannerConfig> {
    let required = |name: &str| {
        vars.get(name)
            .cloned()
            .with_context(|| format!("{} environment variable is required", name))
    };

    Ok(SpannerConfig {
        emulator_host: vars.get("SPANNER_EMULATOR_HOST").cloned(),
        project: required("SPANNER_PROJECT")?,
        instance: required("SPANNER_INSTANCE")?,
        database: required("SPANNER_DATABASE")?,
    })
}

fn token_config(vars: &HashMap<String, String>) -> TokenConfig {
    let default_token = vars
        .get(DEFAULT_TOKEN_VAR)
        .filter(|token| !token.is_empty())
        .cloned();

    let device_tokens = vars
        .iter()
        .filter_map(|(key, value)| {
            let device = key.strip_prefix(DEVICE_TOKEN_PREFIX)?;
            (!device.is_empty() && !value.is_empty())
                .then(|| (device.to_string(), value.clone()))
        })
        .collect();

    TokenConfig {
        default_token,
        device_tokens,
    }
}
