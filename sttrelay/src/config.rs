//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `STTRELAY_CONFIG`
//! environment variable. A missing file is fine: every field has a default except the provider
//! credential.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `STTRELAY_` override YAML values
//! 3. **ELEVENLABS_API_KEY** - Special case: overrides `provider.api_key` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `STTRELAY_PROVIDER__MODEL_ID=scribe_v1` sets the `provider.model_id` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use sttrelay::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Relay will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Provider credential (preferred method)
//! ELEVENLABS_API_KEY="sk_..."
//!
//! # Override server port
//! STTRELAY_PORT=8080
//!
//! # Give up on a stalled provider after 2 minutes
//! STTRELAY_PROVIDER__TIMEOUT=2m
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use url::Url;

use crate::errors::Error;

/// Environment variable conventionally holding the provider credential
pub static API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "STTRELAY_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Outbound speech-to-text provider
    pub provider: ProviderConfig,
    /// Cross-origin policy for browser clients
    pub cors: CorsConfig,
    /// Largest accepted request body in bytes. Unset means no local limit; the provider
    /// enforces its own.
    pub max_upload_size: Option<usize>,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Where and how transcription requests are forwarded.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Full URL of the provider's speech-to-text endpoint
    pub url: Url,
    /// Value sent in the `model_id` form field
    pub model_id: String,
    /// Credential sent in the `xi-api-key` header
    #[serde(skip_serializing)]
    pub api_key: Option<ApiKey>,
    /// Give up on the provider after this long. Unset waits indefinitely.
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

/// Provider credential. Never printed, never serialized.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            provider: ProviderConfig::default(),
            cors: CorsConfig::default(),
            max_upload_size: None,
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("https://api.elevenlabs.io/v1/speech-to-text").expect("static provider URL is valid"),
            model_id: "scribe_v1".to_string(),
            api_key: None,
            timeout: None,
        }
    }
}

impl Default for CorsConfig {
    /// Any origin, with credentials. Browsers get the caller's own origin echoed back.
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: true,
            max_age: None,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        let has_key = self
            .provider
            .api_key
            .as_ref()
            .is_some_and(|key| !key.expose().trim().is_empty());
        if !has_key {
            return Err(Error::Internal {
                message: format!(
                    "Config validation: No provider credential configured. \
                     Please set the {API_KEY_ENV} environment variable or add provider.api_key to the config file."
                ),
            });
        }

        if !matches!(self.provider.url.scheme(), "http" | "https") {
            return Err(Error::Internal {
                message: format!(
                    "Config validation: provider.url must be an http(s) URL, got scheme '{}'",
                    self.provider.url.scheme()
                ),
            });
        }

        if self.provider.model_id.trim().is_empty() {
            return Err(Error::Internal {
                message: "Config validation: provider.model_id cannot be empty.".to_string(),
            });
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                message: "Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }

        if self.max_upload_size == Some(0) {
            return Err(Error::Internal {
                message: "Config validation: max_upload_size cannot be 0. Remove it to disable the limit.".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("STTRELAY_").ignore(&["config"]).split("__"))
            // The provider's conventional credential variable
            .merge(Env::raw().only(&[API_KEY_ENV]).map(|_| "provider.api_key".into()))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
