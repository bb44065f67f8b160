//! Decoded audio track played during a session
//!
//! The synthesizer hands back raw little-endian PCM16 at 24 kHz mono; local
//! fixtures arrive as WAV files. Both end up as interleaved `f32` samples in
//! [`AudioTrack`], which never changes after construction.

use std::path::Path;

use crate::error::SessionError;

/// Sample rate of the synthesizer's PCM payload
pub const SYNTHESIS_SAMPLE_RATE: u32 = 24_000;

/// Channel count of the synthesizer's PCM payload
pub const SYNTHESIS_CHANNELS: u16 = 1;

/// Immutable decoded audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioTrack {
    /// Build a track from interleaved samples
    ///
    /// # Errors
    /// `SynthesisFailure` for a zero sample rate or channel count, or when the
    /// sample count is not a whole number of frames.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self, SessionError> {
        if sample_rate == 0 || channels == 0 {
            return Err(SessionError::SynthesisFailure {
                reason: format!(
                    "invalid audio format: {} Hz, {} channel(s)",
                    sample_rate, channels
                ),
            });
        }
        if samples.len() % channels as usize != 0 {
            return Err(SessionError::SynthesisFailure {
                reason: format!(
                    "{} samples do not divide into {} channel(s)",
                    samples.len(),
                    channels
                ),
            });
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Decode little-endian signed 16-bit PCM
    ///
    /// # Errors
    /// `SynthesisFailure` when the payload is empty or has an odd byte count.
    pub fn from_pcm16_le(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<Self, SessionError> {
        if bytes.is_empty() {
            return Err(SessionError::SynthesisFailure {
                reason: "no audio payload returned".to_string(),
            });
        }
        if bytes.len() % 2 != 0 {
            return Err(SessionError::SynthesisFailure {
                reason: format!("PCM16 payload has odd length {}", bytes.len()),
            });
        }

        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();

        Self::new(samples, sample_rate, channels)
    }

    /// Silent track of the given duration, used by stub synthesizers
    pub fn silent(duration_secs: f64, sample_rate: u32) -> Result<Self, SessionError> {
        let frames = (duration_secs.max(0.0) * sample_rate as f64).round() as usize;
        Self::new(vec![0.0; frames], sample_rate, 1)
    }

    /// Load a WAV file (16/24/32-bit integer or 32-bit float)
    pub fn from_wav_file<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let failure = |detail: String| SessionError::SynthesisFailure {
            reason: format!("{}: {}", path.display(), detail),
        };

        let mut reader = hound::WavReader::open(path).map_err(|err| failure(err.to_string()))?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|sample| sample.map_err(|err| failure(err.to_string())))
                .collect::<Result<Vec<f32>, _>>()?,
            hound::SampleFormat::Int => {
                // Same full-scale divisor as the synthesizer's PCM16
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                match spec.bits_per_sample {
                    16 => reader
                        .samples::<i16>()
                        .map(|sample| {
                            sample
                                .map(|value| value as f32 / max)
                                .map_err(|err| failure(err.to_string()))
                        })
                        .collect::<Result<Vec<f32>, _>>()?,
                    24 | 32 => reader
                        .samples::<i32>()
                        .map(|sample| {
                            sample
                                .map(|value| value as f32 / max)
                                .map_err(|err| failure(err.to_string()))
                        })
                        .collect::<Result<Vec<f32>, _>>()?,
                    bits => return Err(failure(format!("unsupported bits_per_sample={}", bits))),
                }
            }
        };

        Self::new(samples, spec.sample_rate, spec.channels)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds (frame count / sample rate)
    pub fn duration(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Frame index for an audio time, clamped to the track
    pub fn frame_at(&self, seconds: f64) -> usize {
        let frame = (seconds.max(0.0) * self.sample_rate as f64).floor() as usize;
        frame.min(self.frame_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm16_decoding_scales_to_unit_range() {
        let bytes = [
            0x00, 0x00, // 0
            0x00, 0x40, // 16384
            0x00, 0x80, // -32768
        ];
        let track = AudioTrack::from_pcm16_le(&bytes, SYNTHESIS_SAMPLE_RATE, 1).unwrap();
        assert_eq!(track.samples(), &[0.0, 0.5, -1.0]);
    }

    #[test]
    fn test_empty_payload_is_synthesis_failure() {
        let result = AudioTrack::from_pcm16_le(&[], SYNTHESIS_SAMPLE_RATE, 1);
        assert!(matches!(result, Err(SessionError::SynthesisFailure { .. })));
    }

    #[test]
    fn test_odd_payload_is_rejected() {
        assert!(AudioTrack::from_pcm16_le(&[1, 2, 3], SYNTHESIS_SAMPLE_RATE, 1).is_err());
    }

    #[test]
    fn test_duration_is_frames_over_rate() {
        let track = AudioTrack::new(vec![0.0; 48_000], 24_000, 2).unwrap();
        assert_eq!(track.frame_count(), 24_000);
        assert!((track.duration() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_frame_is_rejected() {
        assert!(AudioTrack::new(vec![0.0; 3], 24_000, 2).is_err());
    }

    #[test]
    fn test_frame_at_clamps() {
        let track = AudioTrack::silent(2.0, 100).unwrap();
        assert_eq!(track.frame_at(-1.0), 0);
        assert_eq!(track.frame_at(0.5), 50);
        assert_eq!(track.frame_at(10.0), 200);
    }

    #[test]
    fn test_wav_file_loading() {
        let path = std::env::temp_dir().join("listening_tutor_track_test.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..4_000 {
            writer.write_sample(16_384i16).unwrap();
        }
        writer.finalize().unwrap();

        let track = AudioTrack::from_wav_file(&path).unwrap();
        assert_eq!(track.sample_rate(), 8_000);
        assert!((track.duration() - 0.5).abs() < 1e-9);
        assert_eq!(track.samples()[0], 0.5);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_wav_and_pcm16_share_normalisation() {
        let values = [i16::MIN, -1, 0, 12_345, i16::MAX];
        let path = std::env::temp_dir().join("listening_tutor_normalisation_test.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SYNTHESIS_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for value in values {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();

        let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
        let from_pcm = AudioTrack::from_pcm16_le(&bytes, SYNTHESIS_SAMPLE_RATE, 1).unwrap();
        let from_wav = AudioTrack::from_wav_file(&path).unwrap();
        assert_eq!(from_wav.samples(), from_pcm.samples());
        assert_eq!(from_wav.samples()[0], -1.0);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_wav_is_synthesis_failure() {
        let result = AudioTrack::from_wav_file("/nonexistent/track.wav");
        assert!(matches!(result, Err(SessionError::SynthesisFailure { .. })));
    }
}
