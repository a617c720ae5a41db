use std::fmt;

use serde::{Deserialize, Serialize};

use crate::DomainError;

pub const MFCC_COEFFICIENTS: usize = 13;
pub const FRAME_CHANNELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Video,
    Audio,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Video => f.write_str("video"),
            Modality::Audio => f.write_str("audio"),
        }
    }
}

/// One uploaded clip, owned by the request that received it.
#[derive(Debug, Clone)]
pub struct MediaSource {
    bytes: Vec<u8>,
    file_name: Option<String>,
}

impl MediaSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Lower-cased extension of the uploaded file name, if it has a usable one.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    /// OpenCV ordering, which the frame classifier was trained on.
    #[default]
    Bgr,
    Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_len(&self) -> usize {
        self.width as usize * self.height as usize * FRAME_CHANNELS
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::new(224, 224)
    }
}

/// Decoded frame as packed RGB24, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Normalized frame in HWC layout with values in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Position of the frame in the source clip.
    pub source_index: usize,
    pub pixels: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameBatch {
    frames: Vec<Frame>,
    size: FrameSize,
    channel_order: ChannelOrder,
}

impl FrameBatch {
    pub fn new(
        frames: Vec<Frame>,
        size: FrameSize,
        channel_order: ChannelOrder,
    ) -> Result<Self, DomainError> {
        if frames.is_empty() {
            return Err(DomainError::decode_error("no frames could be extracted"));
        }
        let expected = size.pixel_len();
        if let Some(frame) = frames.iter().find(|frame| frame.pixels.len() != expected) {
            return Err(DomainError::internal_error(format!(
                "frame {} has {} values, expected {expected}",
                frame.source_index,
                frame.pixels.len()
            )));
        }
        Ok(Self {
            frames,
            size,
            channel_order,
        })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.channel_order
    }

    pub fn source_indices(&self) -> Vec<usize> {
        self.frames.iter().map(|frame| frame.source_index).collect()
    }
}

/// Time-averaged MFCC profile of a whole clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioFeatureVector(Vec<f32>);

impl AudioFeatureVector {
    pub fn new(values: Vec<f32>) -> Result<Self, DomainError> {
        if values.len() != MFCC_COEFFICIENTS {
            return Err(DomainError::internal_error(format!(
                "feature vector must have {MFCC_COEFFICIENTS} coefficients, got {}",
                values.len()
            )));
        }
        if values.iter().any(|value| !value.is_finite()) {
            return Err(DomainError::internal_error(
                "feature vector contains non-finite values",
            ));
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Fake,
    Real,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoAssessment {
    pub deepfake_probability: f32,
    pub frames_scored: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AudioAssessment {
    pub verdict: Verdict,
    pub probability: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased_and_sanitized() {
        let source = MediaSource::new(vec![1]).with_file_name("Clip.MOV");
        assert_eq!(source.extension().as_deref(), Some("mov"));

        let hidden = MediaSource::new(vec![1]).with_file_name(".bashrc");
        assert_eq!(hidden.extension(), None);

        let odd = MediaSource::new(vec![1]).with_file_name("clip.mp4/../x");
        assert_eq!(odd.extension(), None);
    }

    #[test]
    fn empty_batch_is_a_decode_error() {
        let err = FrameBatch::new(Vec::new(), FrameSize::new(2, 2), ChannelOrder::Bgr)
            .expect_err("empty batch");
        assert!(matches!(err, DomainError::Decode(_)));
    }

    #[test]
    fn feature_vector_requires_thirteen_coefficients() {
        assert!(AudioFeatureVector::new(vec![0.0; 13]).is_ok());
        assert!(AudioFeatureVector::new(vec![0.0; 12]).is_err());
        assert!(AudioFeatureVector::new(vec![f32::NAN; 13]).is_err());
    }
}
