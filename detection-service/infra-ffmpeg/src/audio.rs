use ffmpeg_next as ffmpeg;
use ffmpeg::format::{sample::Type as SampleLayout, Sample};
use tempfile::NamedTempFile;

use detection_domain::{AudioFeatureExtractorPort, AudioFeatureVector, DomainError, MediaSource};
use detection_infra_audio::MfccFeatureExtractor;

use crate::{init_ffmpeg, materialize, open_input};

pub const DEFAULT_AUDIO_SUFFIX: &str = "wav";

/// Decodes any container FFmpeg recognises (wav, mp3, ogg, webm, flac, ...)
/// to mono at the native rate, then reduces it to the MFCC profile.
#[derive(Debug, Clone)]
pub struct FfmpegAudioExtractor {
    features: MfccFeatureExtractor,
}

impl FfmpegAudioExtractor {
    pub fn new(features: MfccFeatureExtractor) -> Result<Self, DomainError> {
        init_ffmpeg()?;
        Ok(Self { features })
    }
}

impl AudioFeatureExtractorPort for FfmpegAudioExtractor {
    fn extract(&self, source: &MediaSource) -> Result<AudioFeatureVector, DomainError> {
        if source.is_empty() {
            return Err(DomainError::decode_error("empty audio upload"));
        }
        let file = materialize(source, DEFAULT_AUDIO_SUFFIX)?;
        let audio = decode_mono(&file)?;
        tracing::debug!(
            sample_count = audio.samples.len(),
            sample_rate_hz = audio.sample_rate_hz,
            source_channels = audio.source_channels,
            "audio decoded"
        );
        self.features
            .features_from_samples(&audio.samples, audio.sample_rate_hz)
    }
}

#[derive(Debug, Default)]
struct MonoAudio {
    samples: Vec<f32>,
    sample_rate_hz: u32,
    source_channels: usize,
}

fn decode_mono(file: &NamedTempFile) -> Result<MonoAudio, DomainError> {
    let mut input = open_input(file)?;
    let stream = input
        .streams()
        .best(ffmpeg::media::Type::Audio)
        .ok_or_else(|| DomainError::decode_error("no audio stream found"))?;
    let stream_index = stream.index();
    let mut decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
        .and_then(|context| context.decoder().audio())
        .map_err(|err| DomainError::decode_error(format!("unsupported audio codec: {err}")))?;

    let mut audio = MonoAudio::default();
    for (stream, packet) in input.packets() {
        if stream.index() != stream_index {
            continue;
        }
        decoder
            .send_packet(&packet)
            .map_err(|err| DomainError::decode_error(format!("failed to send packet: {err}")))?;
        drain_frames(&mut decoder, &mut audio)?;
    }
    decoder
        .send_eof()
        .map_err(|err| DomainError::decode_error(format!("failed to flush decoder: {err}")))?;
    drain_frames(&mut decoder, &mut audio)?;

    Ok(audio)
}

fn drain_frames(
    decoder: &mut ffmpeg::decoder::Audio,
    audio: &mut MonoAudio,
) -> Result<(), DomainError> {
    let mut frame = ffmpeg::frame::Audio::empty();
    loop {
        match decoder.receive_frame(&mut frame) {
            Ok(()) => append_frame(&frame, audio)?,
            Err(ffmpeg::Error::Eof)
            | Err(ffmpeg::Error::Other {
                errno: ffmpeg::error::EAGAIN,
            }) => return Ok(()),
            Err(err) => {
                return Err(DomainError::decode_error(format!(
                    "failed to receive audio frame: {err}"
                )))
            }
        }
    }
}

fn append_frame(frame: &ffmpeg::frame::Audio, audio: &mut MonoAudio) -> Result<(), DomainError> {
    let (kind, planar) = describe(frame.format()).ok_or_else(|| {
        DomainError::decode_error(format!("unsupported sample format {:?}", frame.format()))
    })?;
    let channels = usize::from(frame.channels());
    if channels == 0 {
        return Err(DomainError::decode_error("audio frame without channels"));
    }
    if audio.sample_rate_hz == 0 {
        audio.sample_rate_hz = frame.rate();
        audio.source_channels = channels;
    } else if frame.rate() != audio.sample_rate_hz {
        return Err(DomainError::decode_error(format!(
            "sample rate changed mid-stream from {} to {} Hz",
            audio.sample_rate_hz,
            frame.rate()
        )));
    }

    let planes: Vec<&[u8]> = if planar {
        if channels > frame.planes() {
            return Err(DomainError::decode_error(format!(
                "{channels} planar channels exceed {} data planes",
                frame.planes()
            )));
        }
        (0..channels).map(|channel| frame.data(channel)).collect()
    } else {
        vec![frame.data(0)]
    };

    let mono = downmix_frame(kind, planar, channels, frame.samples(), &planes)?;
    audio.samples.extend(mono);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleKind {
    U8,
    I16,
    I32,
    F32,
    F64,
}

impl SampleKind {
    fn width(self) -> usize {
        match self {
            SampleKind::U8 => 1,
            SampleKind::I16 => 2,
            SampleKind::I32 | SampleKind::F32 => 4,
            SampleKind::F64 => 8,
        }
    }

    /// Native-endian sample scaled into [-1, 1]; `bytes` is exactly `width()` long.
    fn read(self, bytes: &[u8]) -> f32 {
        match self {
            SampleKind::U8 => (f32::from(bytes[0]) - 128.0) / 128.0,
            SampleKind::I16 => f32::from(i16::from_ne_bytes([bytes[0], bytes[1]])) / 32_768.0,
            SampleKind::I32 => {
                i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32 / 2_147_483_648.0
            }
            SampleKind::F32 => f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            SampleKind::F64 => f64::from_ne_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]) as f32,
        }
    }
}

fn describe(format: Sample) -> Option<(SampleKind, bool)> {
    let (kind, layout) = match format {
        Sample::U8(layout) => (SampleKind::U8, layout),
        Sample::I16(layout) => (SampleKind::I16, layout),
        Sample::I32(layout) => (SampleKind::I32, layout),
        Sample::F32(layout) => (SampleKind::F32, layout),
        Sample::F64(layout) => (SampleKind::F64, layout),
        _ => return None,
    };
    Some((kind, matches!(layout, SampleLayout::Planar)))
}

/// Averages one decoded frame's channels. Packed frames carry every channel
/// interleaved in the first plane; planar frames carry one plane per channel.
fn downmix_frame(
    kind: SampleKind,
    planar: bool,
    channels: usize,
    samples: usize,
    planes: &[&[u8]],
) -> Result<Vec<f32>, DomainError> {
    let width = kind.width();
    let truncated = || DomainError::decode_error("audio frame shorter than its sample count");

    let mut mono = Vec::with_capacity(samples);
    for index in 0..samples {
        let mut sum = 0.0_f32;
        for channel in 0..channels {
            let (plane, offset) = if planar {
                (planes.get(channel).ok_or_else(truncated)?, index * width)
            } else {
                (
                    planes.first().ok_or_else(truncated)?,
                    (index * channels + channel) * width,
                )
            };
            let bytes = plane.get(offset..offset + width).ok_or_else(truncated)?;
            sum += kind.read(bytes);
        }
        mono.push(sum / channels as f32);
    }
    Ok(mono)
}
