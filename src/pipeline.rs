//! Briefing pipeline
//!
//! A run goes through these stages, strictly in order:
//!
//! ```text
//! Idle → AggregatingWeather → AggregatingCalendar → ContextBuilt → Acknowledged
//!      → TextGenerating → VoiceGenerating → Playing → Done
//! ```
//!
//! Aggregation happens on the caller's task and a weather failure is returned
//! to it. Everything after the acknowledgment runs on a detached task and
//! failures there only end up in the log.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, TimeZone};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::calendar::{CalendarSource, DayWindow, collect_calendars};
use crate::config::{BriefingConfig, CalendarConfig, LocationConfig};
use crate::context::BriefingContext;
use crate::synth::{SpeechGenerator, TextGenerator, TextSynthesizer, VoiceSynthesizer};
use crate::voice::{AudioSink, BRIEFING_PCM};
use crate::weather::{WeatherSource, collect_weather};
use crate::{Error, Result};

/// Stage of a run, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Idle,
    AggregatingWeather,
    AggregatingCalendar,
    ContextBuilt,
    Acknowledged,
    TextGenerating,
    VoiceGenerating,
    Playing,
    Done,
    Aborted,
}

impl RunStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AggregatingWeather => "aggregating_weather",
            Self::AggregatingCalendar => "aggregating_calendar",
            Self::ContextBuilt => "context_built",
            Self::Acknowledged => "acknowledged",
            Self::TextGenerating => "text_generating",
            Self::VoiceGenerating => "voice_generating",
            Self::Playing => "playing",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run whose context has been built
#[derive(Debug, Clone)]
pub struct Run {
    pub id: Uuid,
    pub context: BriefingContext,
}

/// How the detached part of a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// Briefing was generated and played
    Completed { text: String },
    /// The run stopped at `stage`
    Aborted { stage: RunStage, error: Error },
}

impl RunOutcome {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// External collaborators of the pipeline
pub struct Collaborators {
    pub weather: Arc<dyn WeatherSource>,
    pub calendar: Arc<dyn CalendarSource>,
    pub text: Arc<dyn TextGenerator>,
    pub speech: Arc<dyn SpeechGenerator>,
    pub sink: Arc<dyn AudioSink>,
}

/// Sequences collection, generation and playback
pub struct Pipeline {
    user_name: String,
    locations: Vec<LocationConfig>,
    calendars: Vec<CalendarConfig>,
    weather: Arc<dyn WeatherSource>,
    calendar: Arc<dyn CalendarSource>,
    text: TextSynthesizer,
    voice: VoiceSynthesizer,
    sink: Arc<dyn AudioSink>,
    /// Held for the whole of a playback; overlapping runs queue here
    playback: Mutex<()>,
    /// Set while the holder of `playback` is playing
    playing: AtomicBool,
}

impl Pipeline {
    #[must_use]
    pub fn new(briefing: &BriefingConfig, collaborators: Collaborators) -> Self {
        Self {
            user_name: briefing.user.name.clone(),
            locations: briefing.locations.clone(),
            calendars: briefing.calendars.clone(),
            weather: collaborators.weather,
            calendar: collaborators.calendar,
            text: TextSynthesizer::new(collaborators.text, briefing.gemini.text.clone()),
            voice: VoiceSynthesizer::new(
                collaborators.speech,
                briefing.gemini.voice.clone(),
                BRIEFING_PCM,
            ),
            sink: collaborators.sink,
            playback: Mutex::new(()),
            playing: AtomicBool::new(false),
        }
    }

    /// Number of configured locations
    #[must_use]
    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    /// Number of configured calendars
    #[must_use]
    pub fn calendar_count(&self) -> usize {
        self.calendars.len()
    }

    /// Whether a briefing is currently being played
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Collect weather and calendars and build the context for the local day
    /// containing `now`
    ///
    /// `now` carries its time zone so the day window follows the zone's rules
    /// rather than the offset in effect at `now`.
    ///
    /// # Errors
    ///
    /// Returns error if any weather lookup fails. Calendar failures never fail
    /// aggregation.
    pub async fn aggregate<Tz>(&self, now: &DateTime<Tz>) -> Result<Run>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: fmt::Display + Send + Sync,
    {
        let id = Uuid::new_v4();

        async {
            tracing::info!(stage = %RunStage::AggregatingWeather, locations = self.locations.len(), "collecting weather");
            let locations = collect_weather(self.weather.as_ref(), &self.locations)
                .await
                .inspect_err(|e| {
                    tracing::error!(stage = %RunStage::Aborted, error = %e, "weather collection failed");
                })?;

            tracing::info!(stage = %RunStage::AggregatingCalendar, calendars = self.calendars.len(), "collecting calendars");
            let calendars = match DayWindow::containing(now) {
                Ok(window) => collect_calendars(self.calendar.as_ref(), &self.calendars, &window).await,
                Err(e) => {
                    tracing::warn!(error = %e, "no day window, skipping calendars");
                    Vec::new()
                }
            };

            let context = BriefingContext::build(&self.user_name, now, locations, calendars);
            tracing::info!(
                stage = %RunStage::ContextBuilt,
                locations = context.locations.len(),
                calendars = context.calendars.len(),
                events = context.event_count(),
                "briefing context built"
            );

            Ok(Run { id, context })
        }
        .instrument(tracing::info_span!("run", run_id = %id))
        .await
    }

    /// Generate and play a briefing on a detached task
    ///
    /// The returned handle may be dropped; the task owns its own failures.
    pub fn spawn_generation(self: &Arc<Self>, run: Run) -> JoinHandle<RunOutcome> {
        let pipeline = Arc::clone(self);
        let span = tracing::info_span!("run", run_id = %run.id);

        tokio::spawn(
            async move { pipeline.generate_and_play(run.context).await }.instrument(span),
        )
    }

    /// Text generation, voice generation and playback, in order
    pub async fn generate_and_play(&self, context: BriefingContext) -> RunOutcome {
        match self.try_generate_and_play(context).await {
            Ok(text) => {
                tracing::info!(stage = %RunStage::Done, "briefing played");
                RunOutcome::Completed { text }
            }
            Err((stage, error)) => {
                tracing::error!(stage = %stage, error = %error, "briefing aborted");
                RunOutcome::Aborted { stage, error }
            }
        }
    }

    async fn try_generate_and_play(
        &self,
        context: BriefingContext,
    ) -> std::result::Result<String, (RunStage, Error)> {
        tracing::info!(stage = %RunStage::TextGenerating, "generating briefing text");
        let text = self
            .text
            .compose(&context)
            .await
            .map_err(|e| (RunStage::TextGenerating, e))?;
        tracing::debug!(chars = text.len(), "briefing text generated");

        tracing::info!(stage = %RunStage::VoiceGenerating, "generating voice");
        let briefing = self
            .voice
            .synthesize(text)
            .await
            .map_err(|e| (RunStage::VoiceGenerating, e))?;
        tracing::debug!(bytes = briefing.audio.len(), "voice generated");

        if self.is_playing() {
            tracing::info!("another briefing is playing, waiting for the device");
        }
        let _device = self.playback.lock().await;
        let _playing = PlayingFlag::raise(&self.playing);

        tracing::info!(stage = %RunStage::Playing, "playing briefing");
        let sink = Arc::clone(&self.sink);
        let audio = briefing.audio;
        let format = briefing.format;
        tokio::task::spawn_blocking(move || sink.play(&audio, format))
            .await
            .map_err(|e| (RunStage::Playing, Error::Audio(format!("playback task failed: {e}"))))?
            .map_err(|e| (RunStage::Playing, e))?;

        Ok(briefing.text)
    }
}

/// Keeps the playing flag raised until dropped
struct PlayingFlag<'a>(&'a AtomicBool);

impl<'a> PlayingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for PlayingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
