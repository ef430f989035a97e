use async_trait::async_trait;
use audiogen_backend::domain::tts::SynthesisOptions;
use audiogen_backend::infrastructure::repositories::{
    EngineError, EngineHealth, LanguageAware, SpeakerAware, Synthesizer,
};
use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use std::path::Path;

/// Text containing this marker makes a fake engine fail
pub const FAIL_MARKER: &str = "[fail]";

pub const FAKE_SAMPLE_RATE: u32 = 16_000;

/// What a fake engine was asked to synthesize
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub text: String,
    pub options: SynthesisOptions,
    pub long_form: bool,
    /// Whether the reference audio file existed while synthesizing
    pub reference_present: bool,
}

/// In-process stand-in for an engine sidecar
pub struct FakeEngine {
    name: &'static str,
    speakers: Vec<String>,
    languages: Vec<String>,
    threshold: Option<usize>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeEngine {
    pub fn new(name: &'static str, speakers: &[&str], languages: &[&str], threshold: Option<usize>) -> Self {
        Self {
            name,
            speakers: speakers.iter().map(|s| s.to_string()).collect(),
            languages: languages.iter().map(|l| l.to_string()).collect(),
            threshold,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls().pop().expect("engine was never called")
    }

    fn record(&self, text: &str, options: &SynthesisOptions, long_form: bool) {
        let reference_present = options.reference_audio.as_deref().map_or(false, Path::exists);
        self.calls.lock().push(RecordedCall {
            text: text.to_string(),
            options: options.clone(),
            long_form,
            reference_present,
        });
    }

    fn render(&self, text: &str, output_path: &Path) -> Result<(), EngineError> {
        if text.contains(FAIL_MARKER) {
            return Err(EngineError::Engine {
                status: 500,
                message: "synthetic failure".to_string(),
            });
        }
        write_tone(output_path, FAKE_SAMPLE_RATE as usize / 2)
    }
}

/// Write a mono 16-bit tone of `frames` samples
pub fn write_tone(path: &Path, frames: usize) -> Result<(), EngineError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: FAKE_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).map_err(|e| EngineError::InvalidAudio(e.to_string()))?;
    for i in 0..frames {
        let t = i as f32 / FAKE_SAMPLE_RATE as f32;
        let sample = ((2.0 * std::f32::consts::PI * 330.0 * t).sin() * 8_000.0) as i16;
        writer
            .write_sample(sample)
            .map_err(|e| EngineError::InvalidAudio(e.to_string()))?;
    }
    writer.finalize().map_err(|e| EngineError::InvalidAudio(e.to_string()))
}

#[async_trait]
impl Synthesizer for FakeEngine {
    fn engine_name(&self) -> &'static str {
        self.name
    }

    async fn synthesize(&self, text: &str, output_path: &Path, options: &SynthesisOptions) -> Result<(), EngineError> {
        self.record(text, options, false);
        self.render(text, output_path)
    }

    fn long_form_threshold(&self) -> Option<usize> {
        self.threshold
    }

    async fn synthesize_long_form(
        &self,
        text: &str,
        output_path: &Path,
        options: &SynthesisOptions,
    ) -> Result<(), EngineError> {
        self.record(text, options, true);
        self.render(text, output_path)
    }

    async fn is_loaded(&self, _model: &str) -> bool {
        !self.calls.lock().is_empty()
    }
}

#[async_trait]
impl SpeakerAware for FakeEngine {
    async fn list_speakers(&self, _model: &str) -> Result<Vec<String>, EngineError> {
        Ok(self.speakers.clone())
    }
}

#[async_trait]
impl LanguageAware for FakeEngine {
    async fn list_languages(&self, _model: &str) -> Result<Vec<String>, EngineError> {
        Ok(self.languages.clone())
    }
}

#[async_trait]
impl EngineHealth for FakeEngine {
    async fn probe(&self) -> Result<(), EngineError> {
        Ok(())
    }
}
