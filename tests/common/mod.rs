//! Shared test utilities
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use daycast::calendar::{CalendarSource, DayWindow};
use daycast::config::{BriefingConfig, LocationConfig};
use daycast::{
    AudioSink, Collaborators, Error, PcmFormat, Pipeline, Result, SpeechAudio, SpeechGenerator,
    TextGenerator,
};

/// MIME type the voice model declares for briefing audio
pub const BRIEFING_MIME: &str = "audio/L16;codec=pcm;rate=24000";

/// Build a briefing document with the given location names and calendar IDs
#[must_use]
pub fn briefing(locations: &[&str], calendars: &[&str]) -> BriefingConfig {
    let locations: Vec<Value> = locations
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "friendly_description": format!("{name} description"),
                "latitude": 55.95,
                "longitude": -3.19,
                "notes": format!("{name} notes"),
            })
        })
        .collect();

    let calendars: Vec<Value> = calendars
        .iter()
        .map(|id| json!({ "id": id, "notes": format!("{id} notes") }))
        .collect();

    serde_json::from_value(json!({
        "user": { "name": "Robin" },
        "locations": locations,
        "calendars": calendars,
        "gemini": {
            "text": { "model": "text-model", "prompt": "You are a concise assistant." },
            "voice": { "model": "voice-model", "prompt": "Say cheerfully: ", "voice": "Kore" }
        }
    }))
    .expect("valid briefing document")
}

/// An event starting at `date_time` (RFC 3339)
#[must_use]
pub fn timed_event(summary: &str, date_time: &str) -> Value {
    json!({ "summary": summary, "start": { "dateTime": date_time } })
}

/// An all-day event on `date` (YYYY-MM-DD)
#[must_use]
pub fn all_day_event(summary: &str, date: &str) -> Value {
    json!({ "summary": summary, "start": { "date": date } })
}

/// Everything the fakes saw, in the order they saw it
#[derive(Debug, Default)]
pub struct Calls {
    order: Mutex<Vec<String>>,
    text_inputs: Mutex<Vec<(String, String, String)>>,
    speech_inputs: Mutex<Vec<(String, String, String)>>,
    played: Mutex<Vec<(usize, PcmFormat)>>,
    playing: AtomicUsize,
    max_playing: AtomicUsize,
}

impl Calls {
    fn record(&self, call: impl Into<String>) {
        self.order.lock().unwrap().push(call.into());
    }

    /// Calls like `weather:Home`, `summary:work`, `text`, `speech`, `play`
    #[must_use]
    pub fn order(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }

    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        self.order().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// `(model, system instruction, content)` of each text request
    #[must_use]
    pub fn text_inputs(&self) -> Vec<(String, String, String)> {
        self.text_inputs.lock().unwrap().clone()
    }

    /// `(model, voice, content)` of each speech request
    #[must_use]
    pub fn speech_inputs(&self) -> Vec<(String, String, String)> {
        self.speech_inputs.lock().unwrap().clone()
    }

    /// `(payload length, format)` of each playback
    #[must_use]
    pub fn played(&self) -> Vec<(usize, PcmFormat)> {
        self.played.lock().unwrap().clone()
    }

    /// Highest number of playbacks that were ever in progress at once
    #[must_use]
    pub fn max_concurrent_playback(&self) -> usize {
        self.max_playing.load(Ordering::SeqCst)
    }

    /// Wait until `count` playbacks have finished
    pub async fn wait_for_playback(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.played().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("playback did not happen in time");
    }

    /// Wait until a call starting with `prefix` has been recorded
    pub async fn wait_for(&self, prefix: &str) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.count(prefix) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("call did not happen in time");
    }
}

/// Weather source answering `{ "location": name }` unless told to fail
pub struct FakeWeather {
    calls: Arc<Calls>,
    failing: HashSet<String>,
}

#[async_trait]
impl daycast::weather::WeatherSource for FakeWeather {
    async fn lookup(&self, location: &LocationConfig) -> Result<Map<String, Value>> {
        self.calls.record(format!("weather:{}", location.name));

        if self.failing.contains(&location.name) {
            return Err(Error::Weather(format!("{}: upstream unavailable", location.name)));
        }

        let mut data = Map::new();
        data.insert("location".to_string(), json!(location.name));
        Ok(data)
    }
}

/// Calendar source serving canned events per calendar ID
pub struct FakeCalendar {
    calls: Arc<Calls>,
    events: HashMap<String, Vec<Value>>,
    failing: HashSet<String>,
    failing_events: HashSet<String>,
}

#[async_trait]
impl CalendarSource for FakeCalendar {
    async fn summary(&self, calendar_id: &str) -> Result<String> {
        self.calls.record(format!("summary:{calendar_id}"));

        if self.failing.contains(calendar_id) {
            return Err(Error::Calendar(format!("{calendar_id}: not found")));
        }
        Ok(format!("{calendar_id} calendar"))
    }

    async fn events(&self, calendar_id: &str, _window: &DayWindow) -> Result<Vec<Value>> {
        self.calls.record(format!("events:{calendar_id}"));

        if self.failing_events.contains(calendar_id) {
            return Err(Error::Calendar(format!("{calendar_id}: listing failed")));
        }
        Ok(self.events.get(calendar_id).cloned().unwrap_or_default())
    }
}

/// Text model that returns a fixed briefing
pub struct FakeText {
    calls: Arc<Calls>,
    reply: Option<String>,
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn generate_text(&self, model: &str, system_instruction: &str, content: &str) -> Result<String> {
        self.calls.record("text");
        self.calls.text_inputs.lock().unwrap().push((
            model.to_string(),
            system_instruction.to_string(),
            content.to_string(),
        ));

        self.reply
            .clone()
            .ok_or_else(|| Error::Generation("text model unavailable".to_string()))
    }
}

/// Voice model that returns a fixed payload
pub struct FakeSpeech {
    calls: Arc<Calls>,
    reply: Option<SpeechAudio>,
}

#[async_trait]
impl SpeechGenerator for FakeSpeech {
    async fn generate_speech(&self, model: &str, voice: &str, content: &str) -> Result<SpeechAudio> {
        self.calls.record("speech");
        self.calls.speech_inputs.lock().unwrap().push((
            model.to_string(),
            voice.to_string(),
            content.to_string(),
        ));

        self.reply
            .clone()
            .ok_or_else(|| Error::EmptyAudio("no candidates".to_string()))
    }
}

/// Sink that records what it was asked to play
pub struct RecordingSink {
    calls: Arc<Calls>,
    delay: Duration,
}

impl AudioSink for RecordingSink {
    fn play(&self, pcm: &[u8], format: PcmFormat) -> Result<()> {
        let playing = self.calls.playing.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.max_playing.fetch_max(playing, Ordering::SeqCst);
        self.calls.record("play");

        std::thread::sleep(self.delay);

        self.calls.playing.fetch_sub(1, Ordering::SeqCst);
        self.calls.played.lock().unwrap().push((pcm.len(), format));
        Ok(())
    }
}

/// Configurable set of fake collaborators sharing one call log
pub struct Fakes {
    pub calls: Arc<Calls>,
    pub failing_locations: HashSet<String>,
    pub failing_calendars: HashSet<String>,
    pub failing_events: HashSet<String>,
    pub events: HashMap<String, Vec<Value>>,
    pub text: Option<String>,
    pub speech: Option<SpeechAudio>,
    pub play_delay: Duration,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            calls: Arc::new(Calls::default()),
            failing_locations: HashSet::new(),
            failing_calendars: HashSet::new(),
            failing_events: HashSet::new(),
            events: HashMap::new(),
            text: Some("Good morning Robin.".to_string()),
            speech: Some(SpeechAudio {
                data: vec![0u8; 4800],
                mime_type: BRIEFING_MIME.to_string(),
            }),
            play_delay: Duration::ZERO,
        }
    }
}

impl Fakes {
    #[must_use]
    pub fn failing_location(mut self, name: &str) -> Self {
        self.failing_locations.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn failing_calendar(mut self, id: &str) -> Self {
        self.failing_calendars.insert(id.to_string());
        self
    }

    /// Calendar whose metadata loads but whose event listing fails
    #[must_use]
    pub fn failing_events(mut self, id: &str) -> Self {
        self.failing_events.insert(id.to_string());
        self
    }

    #[must_use]
    pub fn events(mut self, id: &str, events: Vec<Value>) -> Self {
        self.events.insert(id.to_string(), events);
        self
    }

    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            weather: Arc::new(FakeWeather {
                calls: Arc::clone(&self.calls),
                failing: self.failing_locations.clone(),
            }),
            calendar: Arc::new(FakeCalendar {
                calls: Arc::clone(&self.calls),
                events: self.events.clone(),
                failing: self.failing_calendars.clone(),
                failing_events: self.failing_events.clone(),
            }),
            text: Arc::new(FakeText {
                calls: Arc::clone(&self.calls),
                reply: self.text.clone(),
            }),
            speech: Arc::new(FakeSpeech {
                calls: Arc::clone(&self.calls),
                reply: self.speech.clone(),
            }),
            sink: self.sink(),
        }
    }

    #[must_use]
    pub fn sink(&self) -> Arc<dyn AudioSink> {
        Arc::new(RecordingSink {
            calls: Arc::clone(&self.calls),
            delay: self.play_delay,
        })
    }

    /// Build a pipeline over these fakes
    #[must_use]
    pub fn pipeline(&self, briefing: &BriefingConfig) -> Arc<Pipeline> {
        Arc::new(Pipeline::new(briefing, self.collaborators()))
    }
}
