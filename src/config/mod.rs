//! Configuration management for daycast
//!
//! Runtime configuration is split in two: the briefing document (who, where,
//! which calendars, which models) and process settings taken from the
//! environment (port, API keys, credentials, service endpoints).

pub mod file;

use std::path::PathBuf;

use secrecy::SecretString;

pub use file::{
    BriefingConfig, CalendarConfig, GeminiConfig, LocationConfig, TextModelConfig, UserConfig,
    VoiceModelConfig, resolve_config_path,
};

use crate::{Error, Result};

/// Default listening port
pub const DEFAULT_PORT: u16 = 3000;

/// Default service account key location
pub const DEFAULT_SERVICE_ACCOUNT_PATH: &str = "./service_account.json";

/// Fully resolved daycast configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Briefing document
    pub briefing: BriefingConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// Upstream service base URLs
    pub endpoints: Endpoints,

    /// Path to the Google service account JSON key
    pub service_account_path: PathBuf,

    /// Port to listen on
    pub port: u16,
}

/// API keys for external services
#[derive(Debug, Clone)]
pub struct ApiKeys {
    /// Weather API key (`WEATHER_API_KEY`)
    pub weather: SecretString,

    /// Gemini API key (`GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`)
    pub gemini: SecretString,
}

/// Base URLs of the upstream services
///
/// Each can be overridden through the environment, which is mostly useful for
/// pointing the collectors at a local mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Weather API (`DAYCAST_WEATHER_URL`)
    pub weather: String,

    /// Calendar API (`DAYCAST_CALENDAR_URL`)
    pub calendar: String,

    /// OAuth token endpoint (`DAYCAST_TOKEN_URL`)
    pub token: String,

    /// Generative language API (`DAYCAST_GEMINI_URL`)
    pub gemini: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            weather: "https://weather.googleapis.com".to_string(),
            calendar: "https://www.googleapis.com/calendar/v3".to_string(),
            token: "https://oauth2.googleapis.com/token".to_string(),
            gemini: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Defaults with environment overrides applied
    #[must_use]
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            weather: std::env::var("DAYCAST_WEATHER_URL").unwrap_or(default.weather),
            calendar: std::env::var("DAYCAST_CALENDAR_URL").unwrap_or(default.calendar),
            token: std::env::var("DAYCAST_TOKEN_URL").unwrap_or(default.token),
            gemini: std::env::var("DAYCAST_GEMINI_URL").unwrap_or(default.gemini),
        }
    }
}

/// Process-level inputs collected by the CLI
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Requested briefing document path
    pub config_path: PathBuf,

    /// Port to listen on
    pub port: u16,

    /// Weather API key, if supplied
    pub weather_api_key: Option<String>,

    /// Gemini API key, if supplied
    pub gemini_api_key: Option<String>,

    /// Service account key path
    pub service_account_path: PathBuf,
}

impl Config {
    /// Load configuration from the briefing document and process settings
    ///
    /// # Errors
    ///
    /// Returns error if a required key is missing or the briefing document
    /// cannot be loaded. Both are fatal at startup.
    pub fn load(options: LoadOptions) -> Result<Self> {
        let weather = required_key(options.weather_api_key, "WEATHER_API_KEY")?;
        let gemini = required_key(options.gemini_api_key, "GEMINI_API_KEY")?;

        let path = resolve_config_path(&options.config_path);
        let briefing = BriefingConfig::load(&path)?;

        Ok(Self {
            briefing,
            api_keys: ApiKeys { weather, gemini },
            endpoints: Endpoints::from_env(),
            service_account_path: options.service_account_path,
            port: options.port,
        })
    }
}

fn required_key(value: Option<String>, name: &str) -> Result<SecretString> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
        .ok_or_else(|| Error::Config(format!("{name} environment variable is not set")))
}
