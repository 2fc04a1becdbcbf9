//! Daemon wiring
//!
//! Builds the production collaborators from configuration and serves the
//! trigger endpoint.

use std::sync::Arc;

use crate::api::ApiServer;
use crate::calendar::{CALENDAR_READONLY_SCOPE, GoogleCalendarClient, ServiceAccount, ServiceAccountAuth};
use crate::gemini::GeminiClient;
use crate::pipeline::{Collaborators, Pipeline};
use crate::voice::AudioPlayback;
use crate::weather::WeatherClient;
use crate::{Config, Result};

/// Main daycast daemon
pub struct Daemon {
    pipeline: Arc<Pipeline>,
    port: u16,
}

impl Daemon {
    /// Create a daemon from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the service account key cannot be loaded
    pub fn new(config: &Config) -> Result<Self> {
        let account = ServiceAccount::load(&config.service_account_path)?;
        tracing::info!(
            client_email = %account.client_email,
            path = %config.service_account_path.display(),
            "loaded service account"
        );

        let auth = Arc::new(ServiceAccountAuth::new(
            account,
            config.endpoints.token.clone(),
            CALENDAR_READONLY_SCOPE,
        ));

        let gemini = Arc::new(GeminiClient::new(
            config.endpoints.gemini.clone(),
            config.api_keys.gemini.clone(),
        ));

        let collaborators = Collaborators {
            weather: Arc::new(WeatherClient::new(
                config.endpoints.weather.clone(),
                config.api_keys.weather.clone(),
            )),
            calendar: Arc::new(GoogleCalendarClient::new(config.endpoints.calendar.clone(), auth)),
            text: gemini.clone(),
            speech: gemini,
            sink: Arc::new(AudioPlayback::new()),
        };

        Ok(Self {
            pipeline: Arc::new(Pipeline::new(&config.briefing, collaborators)),
            port: config.port,
        })
    }

    /// The briefing pipeline
    #[must_use]
    pub fn pipeline(&self) -> Arc<Pipeline> {
        Arc::clone(&self.pipeline)
    }

    /// Serve the trigger endpoint until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the server fails
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            locations = self.pipeline.location_count(),
            calendars = self.pipeline.calendar_count(),
            "daycast ready - GET /day for a briefing"
        );

        ApiServer::new(self.pipeline, self.port).run().await
    }
}
