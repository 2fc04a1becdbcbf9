//! Generative language API client
//!
//! A thin client over `models/{model}:generateContent`, used for both the
//! briefing text and the spoken audio.

pub mod types;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

pub use types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig};

use crate::synth::{SpeechAudio, SpeechGenerator, TextGenerator};
use crate::{Error, Result};

/// Client for the generative language API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl GeminiClient {
    /// Create a new client
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base (e.g. <https://generativelanguage.googleapis.com>)
    /// * `api_key` - API key
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Call `generateContent` on `model`
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success status, a blocked
    /// prompt or an unreadable body
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!("{}/v1beta/models/{model}:generateContent", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("{model}: API error {status}: {body}")));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("{model}: malformed response: {e}")))?;

        if let Some(reason) = body.block_reason() {
            return Err(Error::Generation(format!("{model}: prompt blocked ({reason})")));
        }

        Ok(body)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_text(&self, model: &str, system_instruction: &str, content: &str) -> Result<String> {
        let request = GenerateContentRequest {
            system_instruction: Some(Content::text("user", system_instruction)),
            ..GenerateContentRequest::user_text(content)
        };

        self.generate_content(model, &request)
            .await?
            .text()
            .ok_or_else(|| Error::Generation(format!("{model}: response contained no text")))
    }
}

#[async_trait]
impl SpeechGenerator for GeminiClient {
    async fn generate_speech(&self, model: &str, voice: &str, content: &str) -> Result<SpeechAudio> {
        let request = GenerateContentRequest {
            generation_config: Some(GenerationConfig::audio(voice)),
            ..GenerateContentRequest::user_text(content)
        };

        let response = self.generate_content(model, &request).await?;

        if response.candidates.is_empty() {
            return Err(Error::EmptyAudio(format!("{model}: no candidates")));
        }

        let inline = response
            .first_inline_data()
            .ok_or_else(|| Error::EmptyAudio(format!("{model}: first part has no inline data")))?;

        let data = STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| Error::Generation(format!("{model}: invalid audio encoding: {e}")))?;

        Ok(SpeechAudio {
            data,
            mime_type: inline.mime_type.clone(),
        })
    }
}
