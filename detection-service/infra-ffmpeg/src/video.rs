use ffmpeg_next as ffmpeg;
use tempfile::NamedTempFile;

use detection_domain::{DomainError, MediaSource, RawFrame, VideoDecoderPort, VideoStream};

use crate::{init_ffmpeg, materialize, open_input};

pub const DEFAULT_VIDEO_SUFFIX: &str = "mp4";

#[derive(Debug, Clone, Copy)]
pub struct FfmpegVideoDecoder;

impl FfmpegVideoDecoder {
    pub fn new() -> Result<Self, DomainError> {
        init_ffmpeg()?;
        Ok(Self)
    }
}

impl VideoDecoderPort for FfmpegVideoDecoder {
    fn open(&self, source: &MediaSource) -> Result<Box<dyn VideoStream>, DomainError> {
        if source.is_empty() {
            return Err(DomainError::decode_error("empty video upload"));
        }
        let file = materialize(source, DEFAULT_VIDEO_SUFFIX)?;
        let stream = FfmpegVideoStream::open(file)?;
        Ok(Box::new(stream))
    }
}

/// Forward-only frame reader over a materialized upload.
///
/// Frames are decoded sequentially; a requested index is reached by decoding
/// and discarding the frames before it.
pub struct FfmpegVideoStream {
    input: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    converter: RgbConverter,
    stream_index: usize,
    frame_count: usize,
    cursor: usize,
    flushed: bool,
    // Dropped after `input` closes it.
    _file: NamedTempFile,
}

impl FfmpegVideoStream {
    fn open(file: NamedTempFile) -> Result<Self, DomainError> {
        let input = open_input(&file)?;

        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| DomainError::decode_error("no video stream found"))?;
        let stream_index = stream.index();
        let frame_count = estimate_frame_count(&stream, input.duration());

        let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|err| DomainError::decode_error(format!("unsupported video codec: {err}")))?;

        tracing::debug!(
            width = decoder.width(),
            height = decoder.height(),
            frame_count,
            "video stream opened"
        );

        Ok(Self {
            input,
            decoder,
            converter: RgbConverter::default(),
            stream_index,
            frame_count,
            cursor: 0,
            flushed: false,
            _file: file,
        })
    }

    fn next_decoded(&mut self) -> Result<Option<ffmpeg::frame::Video>, DomainError> {
        loop {
            let mut decoded = ffmpeg::frame::Video::empty();
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => return Ok(Some(decoded)),
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(ffmpeg::Error::Other {
                    errno: ffmpeg::error::EAGAIN,
                }) => {
                    if self.flushed {
                        return Ok(None);
                    }
                }
                Err(err) => {
                    return Err(DomainError::decode_error(format!(
                        "failed to receive frame: {err}"
                    )))
                }
            }
            self.feed_decoder()?;
        }
    }

    fn feed_decoder(&mut self) -> Result<(), DomainError> {
        loop {
            let next = self
                .input
                .packets()
                .next()
                .map(|(stream, packet)| (stream.index(), packet));
            match next {
                Some((index, packet)) if index == self.stream_index => {
                    return self.decoder.send_packet(&packet).map_err(|err| {
                        DomainError::decode_error(format!("failed to send packet: {err}"))
                    });
                }
                Some(_) => continue,
                None => {
                    self.flushed = true;
                    return self.decoder.send_eof().map_err(|err| {
                        DomainError::decode_error(format!("failed to flush decoder: {err}"))
                    });
                }
            }
        }
    }
}

impl VideoStream for FfmpegVideoStream {
    fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn read_frame(&mut self, index: usize) -> Result<RawFrame, DomainError> {
        if index < self.cursor {
            return Err(DomainError::decode_error(format!(
                "frame {index} already passed; stream is at {}",
                self.cursor
            )));
        }
        while let Some(decoded) = self.next_decoded()? {
            let position = self.cursor;
            self.cursor += 1;
            if position == index {
                return self.converter.to_rgb(&decoded);
            }
        }
        Err(DomainError::decode_error(format!(
            "frame {index} is past the end of the stream"
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SourceShape {
    format: ffmpeg::format::Pixel,
    width: u32,
    height: u32,
}

/// Converts decoded frames to packed RGB24 at their own size. The swscale
/// context is rebuilt whenever the source format or size changes mid-stream.
#[derive(Default)]
struct RgbConverter {
    scaler: Option<(SourceShape, ffmpeg::software::scaling::Context)>,
}

impl RgbConverter {
    fn to_rgb(&mut self, decoded: &ffmpeg::frame::Video) -> Result<RawFrame, DomainError> {
        let shape = SourceShape {
            format: decoded.format(),
            width: decoded.width(),
            height: decoded.height(),
        };
        if self.scaler.as_ref().map(|(cached, _)| *cached) != Some(shape) {
            if self.scaler.is_some() {
                tracing::debug!(
                    width = shape.width,
                    height = shape.height,
                    "video frame shape changed, rebuilding scaler"
                );
            }
            let scaler = ffmpeg::software::scaling::Context::get(
                shape.format,
                shape.width,
                shape.height,
                ffmpeg::format::Pixel::RGB24,
                shape.width,
                shape.height,
                ffmpeg::software::scaling::Flags::BILINEAR,
            )
            .map_err(|err| DomainError::decode_error(format!("failed to create scaler: {err}")))?;
            self.scaler = Some((shape, scaler));
        }
        let (_, scaler) = self
            .scaler
            .as_mut()
            .ok_or_else(|| DomainError::internal_error("scaler missing"))?;

        let mut rgb = ffmpeg::frame::Video::empty();
        scaler
            .run(decoded, &mut rgb)
            .map_err(|err| DomainError::decode_error(format!("failed to convert frame: {err}")))?;

        let row_bytes = shape.width as usize * 3;
        let stride = rgb.stride(0);
        let data = rgb.data(0);
        let mut packed = Vec::with_capacity(row_bytes * shape.height as usize);
        for row in 0..shape.height as usize {
            let start = row * stride;
            packed.extend_from_slice(&data[start..start + row_bytes]);
        }

        Ok(RawFrame {
            width: shape.width,
            height: shape.height,
            rgb: packed,
        })
    }
}

/// Container frame count, falling back to duration times average frame rate.
fn estimate_frame_count(stream: &ffmpeg::format::stream::Stream<'_>, container_duration: i64) -> usize {
    if stream.frames() > 0 {
        return stream.frames() as usize;
    }

    let rate = f64::from(stream.avg_frame_rate());
    if !rate.is_finite() || rate <= 0.0 {
        return 0;
    }
    let seconds = if stream.duration() > 0 {
        stream.duration() as f64 * f64::from(stream.time_base())
    } else if container_duration > 0 {
        container_duration as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE)
    } else {
        0.0
    };
    (seconds * rate).round().max(0.0) as usize
}
