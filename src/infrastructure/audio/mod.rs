//! WAV handling for generated audio.
//!
//! Engines hand back WAV bytes. Everything here decodes them into an
//! [`AudioClip`] to validate, concatenate or re-time them, and writes files
//! atomically so a failed write never leaves a truncated file behind.

pub mod resampler;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::{Cursor, Write};
use std::path::Path;

/// Upper bound on re-timed audio; slower speeds that would exceed it fail
pub const MAX_ADJUSTED_SECS: f64 = 3_600.0;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("invalid WAV data: {0}")]
    Decode(#[from] hound::Error),
    #[error("audio contains no samples")]
    Empty,
    #[error("cannot concatenate audio with {expected} and {found} channels")]
    ChannelMismatch { expected: u16, found: u16 },
    #[error("resampling failed: {0}")]
    Resample(String),
    #[error("invalid speed multiplier: {0}")]
    InvalidSpeed(f32),
    #[error("speed {speed} would produce {seconds:.0} seconds of audio")]
    OutputTooLong { speed: f32, seconds: f64 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Decoded audio: the source WAV layout plus interleaved samples in [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub spec: WavSpec,
    pub samples: Vec<f32>,
}

impl AudioClip {
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, AudioError> {
        Self::from_reader(WavReader::new(Cursor::new(bytes))?)
    }

    pub fn read(path: &Path) -> Result<Self, AudioError> {
        Self::from_reader(WavReader::open(path)?)
    }

    fn from_reader<R: std::io::Read>(mut reader: WavReader<R>) -> Result<Self, AudioError> {
        let spec = reader.spec();
        let samples = match spec.sample_format {
            SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
            SampleFormat::Int => {
                let scale = int_scale(spec.bits_per_sample);
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        if samples.is_empty() {
            return Err(AudioError::Empty);
        }

        Ok(Self { spec, samples })
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.spec.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.spec.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.spec.sample_rate as f64
    }

    /// Encode using the clip's own sample format and bit depth
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, AudioError> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut buf, self.spec)?;
            match self.spec.sample_format {
                SampleFormat::Float => {
                    for &sample in &self.samples {
                        writer.write_sample(sample)?;
                    }
                }
                SampleFormat::Int => {
                    let scale = int_scale(self.spec.bits_per_sample);
                    for &sample in &self.samples {
                        let value = (sample * scale).round().clamp(-scale, scale - 1.0) as i32;
                        writer.write_sample(value)?;
                    }
                }
            }
            writer.finalize()?;
        }
        Ok(buf.into_inner())
    }

    pub fn write(&self, path: &Path) -> Result<(), AudioError> {
        write_atomic(path, &self.to_wav_bytes()?)
    }

    /// Join clips end to end in order.
    ///
    /// The first clip fixes the output layout; later clips at another sample
    /// rate are resampled to it. Channel counts must match.
    pub fn concat(clips: Vec<AudioClip>) -> Result<AudioClip, AudioError> {
        let mut clips = clips.into_iter();
        let mut combined = clips.next().ok_or(AudioError::Empty)?;

        for clip in clips {
            if clip.spec.channels != combined.spec.channels {
                return Err(AudioError::ChannelMismatch {
                    expected: combined.spec.channels,
                    found: clip.spec.channels,
                });
            }

            if clip.spec.sample_rate == combined.spec.sample_rate {
                combined.samples.extend(clip.samples);
            } else {
                let planar = resampler::resample(
                    &clip.deinterleave(),
                    clip.spec.sample_rate,
                    combined.spec.sample_rate,
                )?;
                combined.samples.extend(interleave(&planar));
            }
        }

        Ok(combined)
    }

    /// Play back `speed` times faster by treating the samples as recorded at
    /// `rate * speed` and resampling to `rate`. Pitch shifts with speed.
    pub fn change_speed(&self, speed: f32) -> Result<AudioClip, AudioError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(AudioError::InvalidSpeed(speed));
        }

        let seconds = self.duration_secs() / speed as f64;
        if seconds > MAX_ADJUSTED_SECS {
            return Err(AudioError::OutputTooLong { speed, seconds });
        }

        let rate = self.spec.sample_rate;
        let source_rate = (rate as f64 * speed as f64).round() as u32;
        let planar = resampler::resample(&self.deinterleave(), source_rate, rate)?;

        Ok(AudioClip {
            spec: self.spec,
            samples: interleave(&planar),
        })
    }

    fn deinterleave(&self) -> Vec<Vec<f32>> {
        let channels = self.spec.channels.max(1) as usize;
        let mut planar = vec![Vec::with_capacity(self.frames()); channels];
        for frame in self.samples.chunks_exact(channels) {
            for (channel, &sample) in planar.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        planar
    }
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.first().map_or(0, Vec::len);
    let mut samples = Vec::with_capacity(frames * planar.len());
    for i in 0..frames {
        for channel in planar {
            samples.push(channel.get(i).copied().unwrap_or(0.0));
        }
    }
    samples
}

fn int_scale(bits_per_sample: u16) -> f32 {
    (1u64 << (bits_per_sample.saturating_sub(1))) as f32
}

/// Check that engine output decodes as WAV, every sample included
pub fn validate_wav(bytes: &[u8]) -> Result<WavSpec, AudioError> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if reader.duration() == 0 {
        return Err(AudioError::Empty);
    }
    match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().try_for_each(|s| s.map(drop))?,
        SampleFormat::Int => reader.samples::<i32>().try_for_each(|s| s.map(drop))?,
    }
    Ok(spec)
}

/// Write bytes next to `path` and rename into place.
///
/// Readers see either the previous file or the complete new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AudioError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".partial_")
        .suffix(".wav")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| AudioError::Io(e.error))?;
    Ok(())
}

/// Re-time a generated file in place.
///
/// A speed of exactly 1.0 leaves the file untouched.
pub fn adjust_speed_in_place(path: &Path, speed: f32) -> Result<bool, AudioError> {
    if speed == 1.0 {
        return Ok(false);
    }

    let clip = AudioClip::read(path)?;
    let adjusted = clip.change_speed(speed)?;
    adjusted.write(path)?;

    tracing::debug!(
        path = %path.display(),
        speed = speed,
        original_secs = clip.duration_secs(),
        adjusted_secs = adjusted.duration_secs(),
        "Audio speed adjusted"
    );

    Ok(true)
}
