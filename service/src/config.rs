use std::collections::BTreeMap;
use std::fmt;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_aux::prelude::{deserialize_string_from_number, deserialize_vec_from_string_or_vec};

use crate::sources::{
    CredentialSpec, DescriptorError, FieldMapConfig, SourceConfig, SourceDescriptor,
};

/// Application configuration loaded from multiple sources.
///
/// Configuration is loaded in priority order (lowest to highest):
/// 1. Struct defaults
/// 2. config.yaml file (if exists)
/// 3. Environment variables with MN_ prefix (always wins)
///
/// Credentials live in their own table so they can come from the
/// environment (`MN_CREDENTIALS__FEDERAL`) while sources stay in YAML.
#[derive(Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub http: HttpClientConfig,
    #[serde(default = "default_sources")]
    pub sources: BTreeMap<String, SourceConfig>,
    #[serde(default, deserialize_with = "deserialize_credentials")]
    pub credentials: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP server bind address.
    #[serde(default = "default_host")]
    pub host: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter (debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests.
    /// Use `"*"` to allow any origin (not recommended for production).
    /// Accepts either an array or comma-separated string.
    #[serde(
        default = "default_allowed_origins",
        deserialize_with = "deserialize_origins"
    )]
    pub allowed_origins: Vec<String>,
}

/// Outbound HTTP client settings shared by all sources.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpClientConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Deserialize origins from comma-separated string or array, filtering empty values.
fn deserialize_origins<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let origins: Vec<String> = deserialize_vec_from_string_or_vec(deserializer)?;
    Ok(origins.into_iter().filter(|s| !s.is_empty()).collect())
}

/// Deserialize credentials, keeping values the env provider parsed as
/// numbers or booleans as their text.
fn deserialize_credentials<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Secret {
        Text(#[serde(deserialize_with = "deserialize_string_from_number")] String),
        Flag(bool),
    }

    let raw: BTreeMap<String, Secret> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, secret)| match secret {
            Secret::Text(text) => (name, text),
            Secret::Flag(flag) => (name, flag.to_string()),
        })
        .collect())
}

// These functions cannot be const because serde uses function pointers for defaults
#[allow(clippy::missing_const_for_fn)]
fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_allowed_origins() -> Vec<String> {
    vec![]
}

#[allow(clippy::missing_const_for_fn)]
fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("makenoise-api/{}", env!("CARGO_PKG_VERSION"))
}

/// The federal (ProPublica Congress) and state sources.
fn default_sources() -> BTreeMap<String, SourceConfig> {
    let federal = SourceConfig {
        endpoint_url: "https://api.propublica.org/congress/v1/{congress}/{chamber}/members.json"
            .to_string(),
        params: BTreeMap::from([
            ("congress".to_string(), "117".to_string()),
            ("chamber".to_string(), "senate".to_string()),
        ]),
        credential: Some(CredentialSpec::header("X-API-Key")),
        payload_path: "results[0].members".to_string(),
        fields: FieldMapConfig::default(),
    };

    let state = SourceConfig {
        endpoint_url: "https://example.state.gov/api/legislators".to_string(),
        params: BTreeMap::new(),
        credential: Some(CredentialSpec::query("key")),
        payload_path: "legislators".to_string(),
        fields: FieldMapConfig {
            region: "district".to_string(),
            ..FieldMapConfig::default()
        },
    };

    BTreeMap::from([
        ("federal".to_string(), federal),
        ("state".to_string(), state),
    ])
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: default_port(),
                host: default_host(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
            },
            cors: CorsConfig::default(),
            http: HttpClientConfig::default(),
            sources: default_sources(),
            credentials: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server", &self.server)
            .field("logging", &self.logging)
            .field("cors", &self.cors)
            .field("http", &self.http)
            .field("sources", &self.sources)
            .field("credentials", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid source '{name}': {source}")]
    Source {
        name: String,
        source: DescriptorError,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Sources are merged in priority order:
    /// 1. Struct defaults (lowest)
    /// 2. config.yaml file (if exists)
    /// 3. Environment variables with MN_ prefix (highest)
    ///
    /// # Errors
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.yaml")
    }

    /// Load configuration with a custom YAML file path.
    ///
    /// # Errors
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load_from(yaml_path: &str) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file(yaml_path))
            .merge(Env::prefixed("MN_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Build one descriptor per configured source, in name order.
    ///
    /// # Errors
    /// Returns [`ConfigError::Source`] for the first source that is invalid.
    pub fn descriptors(&self) -> Result<Vec<SourceDescriptor>, ConfigError> {
        self.sources
            .iter()
            .map(|(name, source)| {
                SourceDescriptor::from_config(name, source).map_err(|e| ConfigError::Source {
                    name: name.clone(),
                    source: e,
                })
            })
            .collect()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Port must be non-zero
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port cannot be 0".into()));
        }

        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "http.timeout_secs cannot be 0".into(),
            ));
        }

        // CORS origins must be valid URLs or "*"
        for origin in &self.cors.allowed_origins {
            if origin != "*" && !origin.starts_with("http://") && !origin.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "cors.allowed_origins contains invalid origin '{origin}'. Must be '*' or start with http:// or https://"
                )));
            }
        }

        if self.sources.is_empty() {
            return Err(ConfigError::Validation(
                "at least one source must be configured under sources".into(),
            ));
        }

        for name in self.credentials.keys() {
            if !self.sources.contains_key(name) {
                return Err(ConfigError::Validation(format!(
                    "credentials.{name} does not match any configured source"
                )));
            }
        }

        self.descriptors()?;
        Ok(())
    }
}
