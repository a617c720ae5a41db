use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::{
    ChannelOrder, DomainError, Frame, FrameBatch, FrameSize, MediaSource, RawFrame,
    VideoDecoderPort, VideoStream,
};

/// Source indices to decode: at most `frame_count` of them, evenly strided
/// over `total_frames` and starting at frame zero.
pub fn sampling_plan(total_frames: usize, frame_count: usize) -> Vec<usize> {
    let frame_count = frame_count.max(1);
    let step = (total_frames / frame_count).max(1);
    (0..frame_count.min(total_frames))
        .map(|i| i * step)
        .collect()
}

/// Resizes with bilinear filtering and scales 8-bit intensities into [0, 1].
pub fn normalize_frame(
    raw: RawFrame,
    source_index: usize,
    size: FrameSize,
    channel_order: ChannelOrder,
) -> Result<Frame, DomainError> {
    let (width, height) = (raw.width, raw.height);
    let image = RgbImage::from_raw(width, height, raw.rgb).ok_or_else(|| {
        DomainError::decode_error(format!(
            "frame {source_index} buffer does not match {width}x{height} rgb24"
        ))
    })?;
    let image = if (width, height) == (size.width, size.height) {
        image
    } else {
        imageops::resize(&image, size.width, size.height, FilterType::Triangle)
    };

    let mut pixels = Vec::with_capacity(size.pixel_len());
    for pixel in image.pixels() {
        let [r, g, b] = pixel.0;
        let ordered = match channel_order {
            ChannelOrder::Bgr => [b, g, r],
            ChannelOrder::Rgb => [r, g, b],
        };
        pixels.extend(ordered.iter().map(|value| f32::from(*value) / 255.0));
    }

    Ok(Frame {
        source_index,
        pixels,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSampler {
    frame_count: usize,
    size: FrameSize,
    channel_order: ChannelOrder,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(50, FrameSize::default(), ChannelOrder::default())
    }
}

impl FrameSampler {
    pub fn new(frame_count: usize, size: FrameSize, channel_order: ChannelOrder) -> Self {
        Self {
            frame_count: frame_count.max(1),
            size,
            channel_order,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn sample(
        &self,
        decoder: &dyn VideoDecoderPort,
        source: &MediaSource,
    ) -> Result<FrameBatch, DomainError> {
        let mut stream = decoder.open(source)?;
        self.sample_stream(stream.as_mut())
    }

    /// Draws frames from an opened stream.
    ///
    /// A failed read ends sampling; whatever was captured before it is kept.
    pub fn sample_stream(&self, stream: &mut dyn VideoStream) -> Result<FrameBatch, DomainError> {
        let total_frames = stream.frame_count();
        if total_frames == 0 {
            return Err(DomainError::decode_error(
                "video contains no decodable frames",
            ));
        }

        let plan = sampling_plan(total_frames, self.frame_count);
        let mut frames = Vec::with_capacity(plan.len());
        for index in plan {
            let frame = stream
                .read_frame(index)
                .and_then(|raw| normalize_frame(raw, index, self.size, self.channel_order));
            match frame {
                Ok(frame) => frames.push(frame),
                Err(err) => {
                    tracing::debug!(
                        index,
                        captured = frames.len(),
                        error = %err,
                        "frame read failed, stopping sampling"
                    );
                    break;
                }
            }
        }

        if frames.is_empty() {
            return Err(DomainError::decode_error(
                "could not decode any frame from video",
            ));
        }

        tracing::debug!(
            total_frames,
            sampled = frames.len(),
            width = self.size.width,
            height = self.size.height,
            "frames sampled"
        );

        FrameBatch::new(frames, self.size, self.channel_order)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use approx::assert_abs_diff_eq;

    use super::*;

    struct SyntheticStream {
        total: usize,
        fail_from: Option<usize>,
        reads: Vec<usize>,
    }

    impl SyntheticStream {
        fn new(total: usize) -> Self {
            Self {
                total,
                fail_from: None,
                reads: Vec::new(),
            }
        }
    }

    impl VideoStream for SyntheticStream {
        fn frame_count(&self) -> usize {
            self.total
        }

        fn read_frame(&mut self, index: usize) -> Result<RawFrame, DomainError> {
            self.reads.push(index);
            if self.fail_from.is_some_and(|from| index >= from) {
                return Err(DomainError::decode_error("corrupt packet"));
            }
            let shade = (index % 256) as u8;
            Ok(RawFrame {
                width: 4,
                height: 2,
                rgb: vec![shade; 4 * 2 * 3],
            })
        }
    }

    fn sampler(frame_count: usize) -> FrameSampler {
        FrameSampler::new(frame_count, FrameSize::new(2, 2), ChannelOrder::Bgr)
    }

    #[test]
    fn plan_is_evenly_strided_for_long_clips() {
        assert_eq!(sampling_plan(200, 50), (0..50).map(|i| i * 4).collect::<Vec<_>>());
        assert_eq!(sampling_plan(149, 50), (0..50).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn plan_takes_every_frame_of_short_clips() {
        assert_eq!(sampling_plan(7, 50), vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(sampling_plan(0, 50).is_empty());
    }

    #[test]
    fn long_clip_yields_exactly_frame_count_in_order() {
        let mut stream = SyntheticStream::new(1_000);
        let batch = sampler(50).sample_stream(&mut stream).expect("batch");

        assert_eq!(batch.len(), 50);
        let indices = batch.source_indices();
        assert!(indices.windows(2).all(|pair| pair[1] - pair[0] == 20));
        assert_eq!(stream.reads, indices);
    }

    #[test]
    fn short_clip_yields_every_frame_once() {
        let mut stream = SyntheticStream::new(12);
        let batch = sampler(50).sample_stream(&mut stream).expect("batch");

        let indices = batch.source_indices();
        assert_eq!(indices, (0..12).collect::<Vec<_>>());
        assert_eq!(indices.iter().collect::<HashSet<_>>().len(), 12);
    }

    #[test]
    fn empty_clip_is_a_decode_error() {
        let mut stream = SyntheticStream::new(0);
        let err = sampler(50).sample_stream(&mut stream).expect_err("no frames");
        assert!(matches!(err, DomainError::Decode(_)));
        assert!(stream.reads.is_empty());
    }

    #[test]
    fn read_failure_keeps_partial_batch() {
        let mut stream = SyntheticStream::new(100);
        stream.fail_from = Some(10);
        let batch = sampler(50).sample_stream(&mut stream).expect("partial batch");

        assert_eq!(batch.source_indices(), vec![0, 2, 4, 6, 8]);
        // Sampling stops at the first failure and never retries.
        assert_eq!(stream.reads.last(), Some(&10));
    }

    #[test]
    fn failure_on_first_frame_is_a_decode_error() {
        let mut stream = SyntheticStream::new(100);
        stream.fail_from = Some(0);
        let err = sampler(50).sample_stream(&mut stream).expect_err("nothing captured");
        assert!(matches!(err, DomainError::Decode(_)));
    }

    #[test]
    fn frames_are_resized_and_scaled_to_unit_range() {
        let mut stream = SyntheticStream::new(1);
        let batch = sampler(50).sample_stream(&mut stream).expect("batch");

        let frame = &batch.frames()[0];
        assert_eq!(frame.pixels.len(), 2 * 2 * 3);
        assert!(frame.pixels.iter().all(|value| (0.0..=1.0).contains(value)));
    }

    #[test]
    fn channel_order_controls_pixel_layout() {
        let raw = RawFrame {
            width: 1,
            height: 1,
            rgb: vec![255, 0, 51],
        };
        let size = FrameSize::new(1, 1);

        let bgr = normalize_frame(raw.clone(), 0, size, ChannelOrder::Bgr).expect("bgr");
        let rgb = normalize_frame(raw, 0, size, ChannelOrder::Rgb).expect("rgb");

        assert_abs_diff_eq!(bgr.pixels[0], 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(bgr.pixels[2], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(rgb.pixels[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let raw = RawFrame {
            width: 3,
            height: 3,
            rgb: vec![0; 5],
        };
        assert!(normalize_frame(raw, 0, FrameSize::new(2, 2), ChannelOrder::Rgb).is_err());
    }
}
