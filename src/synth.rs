//! Briefing text and voice synthesis

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{TextModelConfig, VoiceModelConfig};
use crate::context::BriefingContext;
use crate::voice::PcmFormat;
use crate::{Error, Result};

/// Audio returned by a speech model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Text generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a complete answer for `content` under `system_instruction`
    ///
    /// # Errors
    ///
    /// Returns error if the call fails or yields no text
    async fn generate_text(&self, model: &str, system_instruction: &str, content: &str) -> Result<String>;
}

/// Speech generation backend
#[async_trait]
pub trait SpeechGenerator: Send + Sync {
    /// Speak `content` with a prebuilt `voice`
    ///
    /// # Errors
    ///
    /// Returns error if the call fails or yields no audio
    async fn generate_speech(&self, model: &str, voice: &str, content: &str) -> Result<SpeechAudio>;
}

/// A finished briefing, ready to play
#[derive(Debug, Clone)]
pub struct GeneratedBriefing {
    pub text: String,
    pub audio: Vec<u8>,
    pub format: PcmFormat,
}

/// Writes the briefing text from a context
pub struct TextSynthesizer {
    backend: Arc<dyn TextGenerator>,
    config: TextModelConfig,
}

impl TextSynthesizer {
    #[must_use]
    pub fn new(backend: Arc<dyn TextGenerator>, config: TextModelConfig) -> Self {
        Self { backend, config }
    }

    /// Compose the briefing text
    ///
    /// # Errors
    ///
    /// Returns error if the context cannot be serialized or generation fails
    pub async fn compose(&self, context: &BriefingContext) -> Result<String> {
        let document = context.to_json()?;

        let text = self
            .backend
            .generate_text(&self.config.model, &self.config.prompt, &document)
            .await?;

        if text.trim().is_empty() {
            return Err(Error::Generation("briefing text is empty".to_string()));
        }

        Ok(text)
    }
}

/// Speaks a briefing text
pub struct VoiceSynthesizer {
    backend: Arc<dyn SpeechGenerator>,
    config: VoiceModelConfig,
    format: PcmFormat,
}

impl VoiceSynthesizer {
    /// `format` is what the voice model produces and playback will expect
    #[must_use]
    pub fn new(backend: Arc<dyn SpeechGenerator>, config: VoiceModelConfig, format: PcmFormat) -> Self {
        Self {
            backend,
            config,
            format,
        }
    }

    /// Synthesize the spoken briefing
    ///
    /// The configured voice prompt is prefixed directly to the text.
    ///
    /// # Errors
    ///
    /// Returns error if generation fails, the audio is empty, or its declared
    /// format differs from the playback format
    pub async fn synthesize(&self, text: String) -> Result<GeneratedBriefing> {
        let content = format!("{}{text}", self.config.prompt);

        let audio = self
            .backend
            .generate_speech(&self.config.model, &self.config.voice, &content)
            .await?;

        if audio.data.is_empty() {
            return Err(Error::EmptyAudio(format!("{}: zero-length payload", self.config.model)));
        }
        self.format.check_mime(&audio.mime_type)?;

        Ok(GeneratedBriefing {
            text,
            audio: audio.data,
            format: self.format,
        })
    }
}
