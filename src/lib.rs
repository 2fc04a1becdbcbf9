//! daycast - spoken daily briefings
//!
//! On `GET /day` the service collects the weather for each configured
//! location and today's events from each configured calendar, has a
//! generative model write a briefing from them, has a voice model speak it,
//! and plays the audio on the local output device.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │   Weather    │   │   Calendar   │   collected on the request task
//! └──────┬───────┘   └──────┬───────┘
//!        └────────┬─────────┘
//!        ┌────────▼─────────┐
//!        │ BriefingContext  │           → "Generating audio"
//!        └────────┬─────────┘
//!        ┌────────▼─────────┐
//!        │  Text → Voice    │           detached task
//!        └────────┬─────────┘
//!        ┌────────▼─────────┐
//!        │    Playback      │           one at a time
//!        └──────────────────┘
//! ```

pub mod api;
pub mod calendar;
pub mod config;
pub mod context;
pub mod daemon;
pub mod error;
pub mod gemini;
pub mod pipeline;
pub mod synth;
pub mod voice;
pub mod weather;

pub use config::Config;
pub use context::{BriefingContext, CalendarRecord, LocationRecord};
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use pipeline::{Collaborators, Pipeline, Run, RunOutcome, RunStage};
pub use synth::{GeneratedBriefing, SpeechAudio, SpeechGenerator, TextGenerator};
pub use voice::{AudioSink, BRIEFING_PCM, PcmFormat};
