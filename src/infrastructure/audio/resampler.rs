use super::AudioError;
use rubato::{
    calculate_cutoff, Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};

/// Frames fed to the resampler per call
const CHUNK_SIZE: usize = 1024;

const SINC_LEN: usize = 128;

/// Resample planar (one `Vec` per channel) audio from one rate to another.
///
/// The filter delay is trimmed so the output lines up with the input and has
/// `ceil(frames * to / from)` frames.
pub fn resample(channels: &[Vec<f32>], from_rate: u32, to_rate: u32) -> Result<Vec<Vec<f32>>, AudioError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(AudioError::Resample("sample rate must be > 0".to_string()));
    }
    if from_rate == to_rate || channels.is_empty() {
        return Ok(channels.to_vec());
    }

    let frames = channels[0].len();
    if frames == 0 {
        return Ok(channels.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let window = WindowFunction::Blackman2;
    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: calculate_cutoff(SINC_LEN, window),
        interpolation: SincInterpolationType::Quadratic,
        oversampling_factor: 256,
        window,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.1, params, CHUNK_SIZE, channels.len())
        .map_err(|e| AudioError::Resample(e.to_string()))?;

    let delay = resampler.output_delay();
    let expected = (frames as f64 * ratio).ceil() as usize;
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels.len()];

    let mut pos = 0;
    while pos + CHUNK_SIZE <= frames {
        let input: Vec<&[f32]> = channels.iter().map(|c| &c[pos..pos + CHUNK_SIZE]).collect();
        let processed = resampler
            .process(&input, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        append_planar(&mut output, processed);
        pos += CHUNK_SIZE;
    }

    if pos < frames {
        let input: Vec<&[f32]> = channels.iter().map(|c| &c[pos..]).collect();
        let processed = resampler
            .process_partial(Some(input.as_slice()), None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        append_planar(&mut output, processed);
    }

    // Flush the filter tail
    while output[0].len() < expected + delay {
        let processed = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        if processed.first().map_or(true, |c| c.is_empty()) {
            break;
        }
        append_planar(&mut output, processed);
    }

    for channel in &mut output {
        let skip = delay.min(channel.len());
        channel.drain(..skip);
        channel.truncate(expected);
    }

    Ok(output)
}

fn append_planar(output: &mut [Vec<f32>], processed: Vec<Vec<f32>>) {
    for (channel, samples) in output.iter_mut().zip(processed) {
        channel.extend(samples);
    }
}
