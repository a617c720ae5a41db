use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;

use detection_domain::{
    AudioFeatureVector, DomainError, FeatureClassifier, Frame, FrameClassifier, FrameSize,
    FRAME_CHANNELS,
};

/// Frame model taking an NHWC float batch and emitting one sigmoid score per frame.
pub struct OnnxFrameClassifier {
    session: Mutex<Session>,
}

impl OnnxFrameClassifier {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }
}

impl FrameClassifier for OnnxFrameClassifier {
    fn score_frames(&self, frames: &[Frame], size: FrameSize) -> Result<Vec<f32>, DomainError> {
        let shape = [
            frames.len(),
            size.height as usize,
            size.width as usize,
            FRAME_CHANNELS,
        ];
        let input = Tensor::from_array((shape, stack_frames(frames, size)?))
            .map_err(|err| DomainError::classifier_error(format!("input tensor: {err}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DomainError::internal_error("video session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|err| DomainError::classifier_error(format!("video inference: {err}")))?;
        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|err| DomainError::classifier_error(format!("video output: {err}")))?;

        per_frame_scores(scores, frames.len())
    }
}

/// Tabular model over the MFCC profile. `probability_output` selects the
/// output holding the `[1, classes]` probability tensor.
pub struct OnnxFeatureClassifier {
    session: Mutex<Session>,
    probability_output: usize,
}

impl OnnxFeatureClassifier {
    pub fn new(session: Session, probability_output: usize) -> Self {
        Self {
            session: Mutex::new(session),
            probability_output,
        }
    }
}

impl FeatureClassifier for OnnxFeatureClassifier {
    fn predict_proba(&self, features: &AudioFeatureVector) -> Result<Vec<f32>, DomainError> {
        let values = features.as_slice().to_vec();
        let input = Tensor::from_array(([1_usize, values.len()], values))
            .map_err(|err| DomainError::classifier_error(format!("input tensor: {err}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DomainError::internal_error("audio session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|err| DomainError::classifier_error(format!("audio inference: {err}")))?;
        if self.probability_output >= outputs.len() {
            return Err(DomainError::classifier_error(format!(
                "audio model has {} outputs, probabilities expected at {}",
                outputs.len(),
                self.probability_output
            )));
        }
        let (_, probabilities) = outputs[self.probability_output]
            .try_extract_tensor::<f32>()
            .map_err(|err| DomainError::classifier_error(format!("audio output: {err}")))?;

        if probabilities.is_empty() {
            return Err(DomainError::classifier_error("audio model returned no classes"));
        }
        Ok(probabilities.to_vec())
    }
}

fn stack_frames(frames: &[Frame], size: FrameSize) -> Result<Vec<f32>, DomainError> {
    let frame_len = size.pixel_len();
    let mut data = Vec::with_capacity(frames.len() * frame_len);
    for frame in frames {
        if frame.pixels.len() != frame_len {
            return Err(DomainError::internal_error(format!(
                "frame {} has {} values, expected {frame_len}",
                frame.source_index,
                frame.pixels.len()
            )));
        }
        data.extend_from_slice(&frame.pixels);
    }
    Ok(data)
}

fn per_frame_scores(raw: &[f32], frame_count: usize) -> Result<Vec<f32>, DomainError> {
    if raw.len() != frame_count {
        return Err(DomainError::classifier_error(format!(
            "video model returned {} scores for {frame_count} frames",
            raw.len()
        )));
    }
    Ok(raw.to_vec())
}
