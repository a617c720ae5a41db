use std::io::Cursor;

use hound::{SampleFormat, WavReader};

use crate::FeatureError;

/// Mono samples at the file's native rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate_hz: u32,
    pub source_channels: u16,
}

/// Decodes an in-memory WAV payload, averaging channels down to mono.
///
/// Integer PCM is scaled by `2^(bits - 1)` so every bit depth lands in [-1, 1].
/// No resampling is performed.
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio, FeatureError> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(FeatureError::InvalidSampleRate(spec.sample_rate));
    }

    let interleaved = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1_u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let channels = usize::from(spec.channels.max(1));
    let samples = downmix(&interleaved, channels);
    if samples.is_empty() {
        return Err(FeatureError::EmptySignal);
    }

    Ok(DecodedAudio {
        samples,
        sample_rate_hz: spec.sample_rate,
        source_channels: spec.channels,
    })
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
