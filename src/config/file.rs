//! Briefing configuration document
//!
//! The document names the listener, the places to fetch weather for, the
//! calendars to read and the generative models to use. JSON is the default
//! format; a `.toml` extension switches to TOML.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level briefing document
#[derive(Debug, Clone, Deserialize)]
pub struct BriefingConfig {
    /// Who the briefing is for
    pub user: UserConfig,

    /// Locations to fetch weather for, in briefing order
    #[serde(default)]
    pub locations: Vec<LocationConfig>,

    /// Calendars to read today's events from, in briefing order
    #[serde(default)]
    pub calendars: Vec<CalendarConfig>,

    /// Generative model settings
    pub gemini: GeminiConfig,
}

/// Static user identity
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub name: String,
}

/// A place to include in the briefing
#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    /// Display name (e.g. "Home")
    pub name: String,

    /// Human description handed to the model (e.g. "our flat in Leith")
    #[serde(default)]
    pub friendly_description: String,

    pub latitude: f64,
    pub longitude: f64,

    /// Free-text notes for the model
    #[serde(default)]
    pub notes: String,
}

/// A calendar to include in the briefing
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// Calendar ID (e.g. "primary" or "abc@group.calendar.google.com")
    pub id: String,

    /// Free-text notes for the model
    #[serde(default)]
    pub notes: String,
}

/// Generative model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub text: TextModelConfig,
    pub voice: VoiceModelConfig,
}

/// Text model used to write the briefing
#[derive(Debug, Clone, Deserialize)]
pub struct TextModelConfig {
    /// Model identifier (e.g. "gemini-2.5-flash")
    pub model: String,

    /// System instruction (persona and behaviour)
    pub prompt: String,
}

/// Voice model used to speak the briefing
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceModelConfig {
    /// Model identifier (e.g. "gemini-2.5-flash-preview-tts")
    pub model: String,

    /// Prompt prefixed to the briefing text (delivery instructions)
    #[serde(default)]
    pub prompt: String,

    /// Prebuilt voice name (e.g. "Kore")
    pub voice: String,
}

impl BriefingConfig {
    /// Load and validate a briefing document
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed, or fails validation
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let config = Self::parse(&content, is_toml(path))?;
        config.validate()?;

        tracing::info!(
            path = %path.display(),
            locations = config.locations.len(),
            calendars = config.calendars.len(),
            "loaded briefing config"
        );

        Ok(config)
    }

    /// Parse a briefing document from a string
    ///
    /// # Errors
    ///
    /// Returns error if the content is not a valid document
    pub fn parse(content: &str, toml: bool) -> Result<Self> {
        if toml {
            Ok(toml::from_str(content)?)
        } else {
            Ok(serde_json::from_str(content)?)
        }
    }

    /// Check the values the pipeline relies on
    ///
    /// # Errors
    ///
    /// Returns the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.gemini.text.model.trim().is_empty() {
            return Err(Error::Config("gemini.text.model is empty".to_string()));
        }
        if self.gemini.voice.model.trim().is_empty() {
            return Err(Error::Config("gemini.voice.model is empty".to_string()));
        }
        if self.gemini.voice.voice.trim().is_empty() {
            return Err(Error::Config("gemini.voice.voice is empty".to_string()));
        }

        for location in &self.locations {
            let lat_ok = location.latitude.is_finite() && location.latitude.abs() <= 90.0;
            let lon_ok = location.longitude.is_finite() && location.longitude.abs() <= 180.0;
            if !lat_ok || !lon_ok {
                return Err(Error::Config(format!(
                    "location {:?} has invalid coordinates ({}, {})",
                    location.name, location.latitude, location.longitude
                )));
            }
        }

        if let Some(pos) = self.calendars.iter().position(|c| c.id.trim().is_empty()) {
            return Err(Error::Config(format!("calendar #{pos} has an empty id")));
        }

        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

/// Resolve the briefing document path
///
/// An existing `requested` path wins; otherwise `~/.config/daycast/config.json`
/// is used when present. Falls back to `requested` so the load error names it.
#[must_use]
pub fn resolve_config_path(requested: &Path) -> PathBuf {
    if requested.exists() {
        return requested.to_path_buf();
    }

    directories::BaseDirs::new()
        .map(|d| d.config_dir().join("daycast").join("config.json"))
        .filter(|p| p.exists())
        .unwrap_or_else(|| requested.to_path_buf())
}
