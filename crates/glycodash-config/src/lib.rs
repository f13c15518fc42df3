//! Configuration loading for Glycodash.
//! Reads glycodash.toml from the current directory or the path in GLYCODASH_CONFIG,
//! then applies GLYCODASH_* environment overrides.
//!
//! The loaded [`Config`] is immutable: it is built once at startup and shared
//! behind an `Arc`. There are no setters.

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub const CONFIG_PATH_VAR: &str = "GLYCODASH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "glycodash.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid URL in {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("invalid boolean in {var}: '{value}'")]
    InvalidFlag { var: &'static str, value: String },

    #[error("invalid number of seconds in {var}: '{value}'")]
    InvalidSeconds { var: &'static str, value: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "bool_true")]
    pub require_login: bool,
    #[serde(default)]
    pub offline_mode: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub data_service: DataServiceConfig,
    #[serde(default)]
    pub context_service: ContextServiceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

fn bool_true() -> bool { true }

/// Identity provider settings for the OAuth2 authorization-code flow.
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    pub identity_provider_base_url: Option<String>,
    pub client_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub client_secret: Option<SecretString>,
    pub redirect_uri: Option<String>,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_authorize_path")]
    pub authorize_path: String,
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default = "default_userinfo_path")]
    pub userinfo_path: String,
    #[serde(default = "default_profile_path")]
    pub profile_path: String,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_scope()          -> String { "openid profile email".to_string() }
fn default_authorize_path() -> String { "/authorize".to_string() }
fn default_token_path()     -> String { "/token".to_string() }
fn default_userinfo_path()  -> String { "/userinfo".to_string() }
fn default_profile_path()   -> String { "/profile".to_string() }
fn default_http_timeout()   -> u64    { 10 }

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            identity_provider_base_url: None,
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            scope: default_scope(),
            authorize_path: default_authorize_path(),
            token_path: default_token_path(),
            userinfo_path: default_userinfo_path(),
            profile_path: default_profile_path(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

/// Where the reference dataset and projection tables come from.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_release")]
    pub release: String,
    #[serde(default = "default_remote_base_url")]
    pub remote_base_url: String,
    #[serde(default = "default_local_dir")]
    pub local_dir: String,
    #[serde(default = "default_reference_organism")]
    pub reference_organism: String,
    #[serde(default = "default_dataset_file")]
    pub dataset_file: String,
    #[serde(default = "default_taxonomy_file")]
    pub taxonomy_file: String,
    #[serde(default = "default_structure_projection_file")]
    pub structure_projection_file: String,
    #[serde(default = "default_word_projection_file")]
    pub word_projection_file: String,
    #[serde(default = "default_letter_projection_file")]
    pub letter_projection_file: String,
}

fn default_release()                   -> String { "v1".to_string() }
fn default_remote_base_url()           -> String { "https://data.glycodash.org/releases".to_string() }
fn default_local_dir()                 -> String { "data".to_string() }
fn default_reference_organism()        -> String { "Homo sapiens".to_string() }
fn default_dataset_file()              -> String { "glycan_dataset.csv".to_string() }
fn default_taxonomy_file()             -> String { "taxonomy.csv".to_string() }
fn default_structure_projection_file() -> String { "tsne_glycans.csv".to_string() }
fn default_word_projection_file()      -> String { "tsne_glycowords.csv".to_string() }
fn default_letter_projection_file()    -> String { "tsne_glycoletters.csv".to_string() }

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            release: default_release(),
            remote_base_url: default_remote_base_url(),
            local_dir: default_local_dir(),
            reference_organism: default_reference_organism(),
            dataset_file: default_dataset_file(),
            taxonomy_file: default_taxonomy_file(),
            structure_projection_file: default_structure_projection_file(),
            word_projection_file: default_word_projection_file(),
            letter_projection_file: default_letter_projection_file(),
        }
    }
}

/// Credentials for the backing data-service (release storage).
#[derive(Debug, Default, Deserialize)]
pub struct DataServiceConfig {
    pub username: Option<String>,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextServiceConfig {
    #[serde(default = "default_context_base_url")]
    pub base_url: String,
    #[serde(default = "default_context_timeout")]
    pub timeout_secs: u64,
}

fn default_context_base_url() -> String { "http://127.0.0.1:8090".to_string() }
fn default_context_timeout()  -> u64    { 30 }

impl Default for ContextServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_context_base_url(),
            timeout_secs: default_context_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Sessions with no request for this long are closed.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    #[serde(default = "default_session_sweep_secs")]
    pub session_sweep_secs: u64,
}

fn default_bind() -> String { "127.0.0.1:3001".to_string() }
fn default_session_idle_secs() -> u64 { 1800 }
fn default_session_sweep_secs() -> u64 { 60 }

impl ServerConfig {
    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            session_idle_secs: default_session_idle_secs(),
            session_sweep_secs: default_session_sweep_secs(),
        }
    }
}

/// Write-only diagnostic snapshots, honoured only when `debug` is set.
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default = "default_diagnostics_dir")]
    pub dir: String,
}

fn default_diagnostics_dir() -> String { "diagnostics".to_string() }

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { dir: default_diagnostics_dir() }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(secret))
}

fn secret(value: String) -> SecretString {
    SecretString::new(value.into_boxed_str())
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { var, value: value.to_string() }),
    }
}

fn parse_secs(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidSeconds { var, value: value.to_string() })
}

fn check_url(field: &'static str, value: Option<&str>) -> Result<(), ConfigError> {
    let value = value.ok_or(ConfigError::Missing(field))?;
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidUrl { field, reason: e.to_string() })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            require_login: true,
            offline_mode: false,
            debug: false,
            auth: AuthConfig::default(),
            data: DataConfig::default(),
            data_service: DataServiceConfig::default(),
            context_service: ContextServiceConfig::default(),
            server: ServerConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}


impl Config {
    /// Load configuration once at process start.
    ///
    /// Reads `.env` if present, then the TOML file named by `GLYCODASH_CONFIG`
    /// (default `glycodash.toml`; a missing file means all defaults), then
    /// environment overrides, then validates.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env");
        }

        let path = std::env::var(CONFIG_PATH_VAR)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&path).exists() {
            info!(path = %path, "Reading configuration file");
            let content = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
            Self::from_toml_str(&content)?
        } else {
            info!(path = %path, "No configuration file, using defaults");
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `GLYCODASH_*` overrides. `lookup` abstracts the environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GLYCODASH_REQUIRE_LOGIN") {
            self.require_login = parse_flag("GLYCODASH_REQUIRE_LOGIN", &v)?;
        }
        if let Some(v) = lookup("GLYCODASH_OFFLINE") {
            self.offline_mode = parse_flag("GLYCODASH_OFFLINE", &v)?;
        }
        if let Some(v) = lookup("GLYCODASH_DEBUG") {
            self.debug = parse_flag("GLYCODASH_DEBUG", &v)?;
        }
        if let Some(v) = lookup("GLYCODASH_IDP_BASE_URL") {
            self.auth.identity_provider_base_url = Some(v);
        }
        if let Some(v) = lookup("GLYCODASH_CLIENT_ID") {
            self.auth.client_id = Some(v);
        }
        if let Some(v) = lookup("GLYCODASH_CLIENT_SECRET") {
            self.auth.client_secret = Some(secret(v));
        }
        if let Some(v) = lookup("GLYCODASH_REDIRECT_URI") {
            self.auth.redirect_uri = Some(v);
        }
        if let Some(v) = lookup("GLYCODASH_DATA_USERNAME") {
            self.data_service.username = Some(v);
        }
        if let Some(v) = lookup("GLYCODASH_DATA_API_KEY") {
            self.data_service.api_key = Some(secret(v));
        }
        if let Some(v) = lookup("GLYCODASH_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = lookup("GLYCODASH_SESSION_IDLE_SECS") {
            self.server.session_idle_secs = parse_secs("GLYCODASH_SESSION_IDLE_SECS", &v)?;
        }
        Ok(())
    }

    /// The login flow is skipped entirely when login is not required or the
    /// process runs offline.
    pub fn auth_bypassed(&self) -> bool {
        !self.require_login || self.offline_mode
    }

    /// Fails when authenticated sessions are required but the identity
    /// provider cannot be reached with the configured credentials.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.session_sweep_secs == 0 {
            return Err(ConfigError::InvalidSeconds {
                var: "server.session_sweep_secs",
                value: "0".into(),
            });
        }
        if self.auth_bypassed() {
            return Ok(());
        }
        check_url(
            "auth.identity_provider_base_url",
            self.auth.identity_provider_base_url.as_deref(),
        )?;
        check_url("auth.redirect_uri", self.auth.redirect_uri.as_deref())?;
        if self.auth.client_id.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing("auth.client_id"));
        }
        if self.auth.client_secret.is_none() {
            return Err(ConfigError::Missing("auth.client_secret"));
        }
        Ok(())
    }
}
