//! Error types for daycast

use thiserror::Error;

/// Result type alias for daycast operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while producing a briefing
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Weather lookup failed
    #[error("weather error: {0}")]
    Weather(String),

    /// Calendar metadata or event listing failed
    #[error("calendar error: {0}")]
    Calendar(String),

    /// Service account / token exchange error
    #[error("auth error: {0}")]
    Auth(String),

    /// Generative model call failed or returned something unusable
    #[error("generation error: {0}")]
    Generation(String),

    /// Voice response carried no audio payload
    #[error("voice response contained no audio: {0}")]
    EmptyAudio(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
