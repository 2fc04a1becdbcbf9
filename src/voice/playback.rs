//! Audio playback to speakers

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use super::{AudioSink, PcmFormat, decode_s16le};
use crate::{Error, Result};

/// How often playback completion is polled
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Plays PCM payloads on the default output device
///
/// The device is opened per payload and released once the payload has been
/// played, so nothing is held between briefings.
#[derive(Debug, Clone, Copy)]
pub struct AudioPlayback {
    poll_interval: Duration,
}

impl Default for AudioPlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlayback {
    /// Create a playback engine
    #[must_use]
    pub const fn new() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Open the default output device for `format`
    ///
    /// Prefers a config with the payload's channel count; falls back to
    /// stereo, in which case each sample is written to both channels.
    fn open(format: PcmFormat) -> Result<(Device, StreamConfig)> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let rate = SampleRate(format.sample_rate);
        let find = |channels: u16| {
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == channels
                    && c.min_sample_rate() <= rate
                    && c.max_sample_rate() >= rate
            })
        };

        let supported = find(format.channels)
            .or_else(|| find(2))
            .ok_or_else(|| {
                Error::Audio(format!(
                    "no output config for {} Hz, {} channel(s)",
                    format.sample_rate, format.channels
                ))
            })?;

        let config = supported.with_sample_rate(rate).config();

        tracing::debug!(
            device = %device.name().unwrap_or_default(),
            sample_rate = format.sample_rate,
            channels = config.channels,
            "audio output opened"
        );

        Ok((device, config))
    }
}

impl AudioSink for AudioPlayback {
    fn play(&self, pcm: &[u8], format: PcmFormat) -> Result<()> {
        if format.channels != 1 {
            return Err(Error::Audio(format!(
                "unsupported channel count {}",
                format.channels
            )));
        }

        let samples = Arc::new(decode_s16le(pcm));
        if samples.is_empty() {
            return Err(Error::Audio("empty audio payload".to_string()));
        }

        let (device, config) = Self::open(format)?;
        let channels = usize::from(config.channels);

        let finished = Arc::new(AtomicBool::new(false));
        let failed = Arc::new(AtomicBool::new(false));

        let cb_samples = Arc::clone(&samples);
        let cb_finished = Arc::clone(&finished);
        let mut position = 0usize;

        let err_finished = Arc::clone(&finished);
        let err_failed = Arc::clone(&failed);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Everything handed over in earlier callbacks has been consumed
                    if position >= cb_samples.len() {
                        cb_finished.store(true, Ordering::Release);
                    }

                    for frame in data.chunks_mut(channels) {
                        let sample = cb_samples.get(position).copied().unwrap_or(0.0);
                        frame.fill(sample);
                        position = position.saturating_add(1).min(cb_samples.len());
                    }
                },
                move |err| {
                    tracing::error!(error = %err, "audio playback error");
                    err_failed.store(true, Ordering::Release);
                    err_finished.store(true, Ordering::Release);
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        tracing::info!(
            samples = samples.len(),
            duration_ms = format.duration_ms(pcm.len()),
            "playing audio"
        );

        while !finished.load(Ordering::Acquire) {
            std::thread::sleep(self.poll_interval);
        }

        drop(stream);

        if failed.load(Ordering::Acquire) {
            return Err(Error::Audio("output stream failed during playback".to_string()));
        }

        tracing::debug!(samples = samples.len(), "playback complete");
        Ok(())
    }
}
