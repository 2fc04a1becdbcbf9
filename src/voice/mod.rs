//! Audio output
//!
//! The voice model is asked for raw PCM and the output device is opened for
//! exactly that format. Both sides read [`BRIEFING_PCM`].

mod playback;

pub use playback::AudioPlayback;

use crate::{Error, Result};

/// Sample encoding of raw PCM payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// 16-bit signed little-endian
    S16Le,
}

impl SampleEncoding {
    /// Bytes per sample
    #[must_use]
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::S16Le => 2,
        }
    }
}

/// Raw PCM format descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: SampleEncoding,
}

/// Format the voice model emits and the playback device is opened with
pub const BRIEFING_PCM: PcmFormat = PcmFormat {
    sample_rate: 24_000,
    channels: 1,
    encoding: SampleEncoding::S16Le,
};

impl PcmFormat {
    /// Check a MIME type such as `audio/L16;codec=pcm;rate=24000` against
    /// this format
    ///
    /// Only a declared `rate` is compared; a MIME type without one is accepted.
    ///
    /// # Errors
    ///
    /// Returns error if the declared rate differs or cannot be read
    pub fn check_mime(&self, mime_type: &str) -> Result<()> {
        let rate = mime_type
            .split(';')
            .filter_map(|param| param.trim().split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("rate"))
            .map(|(_, value)| value.trim());

        let Some(rate) = rate else {
            return Ok(());
        };

        let rate: u32 = rate
            .parse()
            .map_err(|_| Error::Audio(format!("unreadable sample rate in {mime_type:?}")))?;

        if rate == self.sample_rate {
            Ok(())
        } else {
            Err(Error::Audio(format!(
                "voice audio is {rate} Hz, playback expects {} Hz",
                self.sample_rate
            )))
        }
    }

    /// Playback duration of `len` bytes, in milliseconds
    #[must_use]
    pub fn duration_ms(&self, len: usize) -> u64 {
        let frame_bytes = self.encoding.bytes_per_sample() * usize::from(self.channels);
        let frames = (len / frame_bytes.max(1)) as u64;
        frames * 1000 / u64::from(self.sample_rate.max(1))
    }
}

/// Decode 16-bit little-endian PCM into normalized samples
///
/// A trailing odd byte is ignored.
#[must_use]
pub fn decode_s16le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect()
}

/// Blocking audio output
///
/// Implementations must not return before playback has finished.
pub trait AudioSink: Send + Sync {
    /// Play a complete PCM payload
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened or playback fails
    fn play(&self, pcm: &[u8], format: PcmFormat) -> Result<()>;
}
