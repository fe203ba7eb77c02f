//! Configuration for the payment-sdk server.
//!
//! Loaded from a JSON file (`--config <path>`, `$CONFIG`, default `config.json`).
//! Every field is optional; missing values fall back to environment variables
//! and then to hardcoded defaults. A missing file yields the all-defaults
//! configuration.
//!
//! ```json
//! {
//!   "port": 8080,
//!   "host": "0.0.0.0",
//!   "api_key": "$PAYMENT_API_KEY",
//!   "default_currency": "USD",
//!   "connection": {
//!     "uri": "wss://echo.websocket.org",
//!     "reconnect_delay_secs": 5
//!   }
//! }
//! ```

use clap::Parser;
use payment_types::payment::Currency;
use payment_ws::ReconnectPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "payment-sdk")]
#[command(about = "Payment routing HTTP server with a reconnecting WebSocket client")]
struct CliArgs {
    /// Path to the JSON configuration file
    #[arg(long, short, env = "CONFIG", default_value = "config.json")]
    config: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "config_defaults::default_port")]
    port: u16,
    #[serde(default = "config_defaults::default_host")]
    host: IpAddr,
    /// Shared secret callers must present. Usually `"$PAYMENT_API_KEY"`.
    #[serde(default = "config_defaults::default_api_key")]
    api_key: LiteralOrEnv<String>,
    #[serde(default)]
    default_currency: Currency,
    /// Remote endpoint for the reconnecting client. No client runs without it.
    #[serde(default)]
    connection: Option<ConnectionConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: config_defaults::default_port(),
            host: config_defaults::default_host(),
            api_key: config_defaults::default_api_key(),
            default_currency: Currency::default(),
            connection: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub uri: LiteralOrEnv<Url>,
    /// Must be at least one second.
    #[serde(
        default = "config_defaults::default_reconnect_delay_secs",
        deserialize_with = "config_defaults::nonzero_secs"
    )]
    pub reconnect_delay_secs: u64,
    /// Enables exponential backoff capped at this many seconds.
    #[serde(default, deserialize_with = "config_defaults::optional_nonzero_secs")]
    pub max_reconnect_delay_secs: Option<u64>,
    /// Stops the client after this many consecutive failed attempts.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl ConnectionConfig {
    pub fn uri(&self) -> &Url {
        self.uri.inner()
    }

    pub fn policy(&self) -> ReconnectPolicy {
        let delay = Duration::from_secs(self.reconnect_delay_secs);
        let policy = match self.max_reconnect_delay_secs {
            Some(max) => ReconnectPolicy::exponential(delay, Duration::from_secs(max)),
            None => ReconnectPolicy::fixed(delay),
        };
        match self.max_attempts {
            Some(attempts) => policy.with_max_attempts(attempts),
            None => policy,
        }
    }
}

pub mod config_defaults {
    use std::env;
    use std::net::{IpAddr, Ipv4Addr};

    use serde::{Deserialize, Deserializer, de};

    use super::LiteralOrEnv;

    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

    /// $PORT env var -> 8080
    pub fn default_port() -> u16 {
        env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT)
    }

    /// $HOST env var -> "0.0.0.0"
    pub fn default_host() -> IpAddr {
        env::var("HOST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_HOST)
    }

    /// $PAYMENT_API_KEY env var -> empty, which rejects every request.
    pub fn default_api_key() -> LiteralOrEnv<String> {
        LiteralOrEnv::from_literal(env::var("PAYMENT_API_KEY").unwrap_or_default())
    }

    pub fn default_reconnect_delay_secs() -> u64 {
        DEFAULT_RECONNECT_DELAY_SECS
    }

    /// A zero delay would retry a refused endpoint in a tight loop.
    pub fn nonzero_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match u64::deserialize(deserializer)? {
            0 => Err(de::Error::invalid_value(
                de::Unexpected::Unsigned(0),
                &"a delay of at least 1 second",
            )),
            secs => Ok(secs),
        }
    }

    pub fn optional_nonzero_secs<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<u64>::deserialize(deserializer)? {
            Some(0) => Err(de::Error::invalid_value(
                de::Unexpected::Unsigned(0),
                &"a delay of at least 1 second",
            )),
            secs => Ok(secs),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }

    pub fn api_key(&self) -> &str {
        self.api_key.inner()
    }

    pub fn default_currency(&self) -> &Currency {
        &self.default_currency
    }

    pub fn connection(&self) -> Option<&ConnectionConfig> {
        self.connection.as_ref()
    }

    /// Load configuration from CLI arguments and the JSON file they point to.
    ///
    /// Falls back to [`Config::default`] when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let cli_args = CliArgs::parse();
        if !cli_args.config.exists() {
            tracing::warn!(
                "Config file {} not found, using defaults",
                cli_args.config.display()
            );
            return Ok(Config::default());
        }
        Self::load_from_path(&cli_args.config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

/// A value that is either written literally or read from an environment variable
/// while deserializing.
///
/// - Literal: `"wss://stream.example.com"`
/// - Simple env var: `"$PAYMENT_WS_URI"`
/// - Braced env var: `"${PAYMENT_WS_URI}"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn from_literal(value: T) -> Self {
        Self(value)
    }

    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Variable name for `$VAR` or `${VAR}`, `None` for anything else.
fn env_var_name(s: &str) -> Option<&str> {
    if let Some(braced) = s.strip_prefix("${") {
        return braced.strip_suffix('}').filter(|name| !name.is_empty());
    }
    let name = s.strip_prefix('$')?;
    let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then_some(name)
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let value = match env_var_name(&raw) {
            Some(name) => std::env::var(name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "Environment variable '{name}' not found (referenced as '{raw}')"
                ))
            })?,
            None => raw,
        };
        value
            .parse::<T>()
            .map(LiteralOrEnv)
            .map_err(|e| serde::de::Error::custom(format!("Failed to parse value: {e}")))
    }
}

impl<T: Serialize> Serialize for LiteralOrEnv<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}
