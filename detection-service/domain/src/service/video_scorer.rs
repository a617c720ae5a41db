use crate::{DomainError, FrameBatch, FrameClassifier, VideoAssessment};

/// Unweighted arithmetic mean; accumulated in f64 so long batches don't drift.
pub fn mean_score(scores: &[f32]) -> Result<f32, DomainError> {
    if scores.is_empty() {
        return Err(DomainError::internal_error("cannot aggregate an empty score set"));
    }
    if let Some(bad) = scores.iter().find(|score| !score.is_finite()) {
        return Err(DomainError::classifier_error(format!(
            "classifier produced a non-finite score: {bad}"
        )));
    }
    let sum: f64 = scores.iter().map(|score| f64::from(*score)).sum();
    Ok((sum / scores.len() as f64) as f32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoScorer {
    max_batch_size: usize,
}

impl Default for VideoScorer {
    fn default() -> Self {
        Self::new(50)
    }
}

impl VideoScorer {
    /// `max_batch_size` of 1 scores frame by frame.
    pub fn new(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
        }
    }

    pub fn score(
        &self,
        batch: &FrameBatch,
        classifier: &dyn FrameClassifier,
    ) -> Result<VideoAssessment, DomainError> {
        let mut scores = Vec::with_capacity(batch.len());
        for chunk in batch.frames().chunks(self.max_batch_size) {
            let chunk_scores = classifier.score_frames(chunk, batch.size())?;
            if chunk_scores.len() != chunk.len() {
                return Err(DomainError::classifier_error(format!(
                    "classifier returned {} scores for {} frames",
                    chunk_scores.len(),
                    chunk.len()
                )));
            }
            scores.extend(chunk_scores);
        }

        let deepfake_probability = mean_score(&scores)?;
        tracing::debug!(
            frames_scored = scores.len(),
            deepfake_probability,
            "video frames scored"
        );

        Ok(VideoAssessment {
            deepfake_probability,
            frames_scored: scores.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{ChannelOrder, Frame, FrameSize};

    /// Scores each frame by its first pixel value and records chunk sizes.
    #[derive(Default)]
    struct FirstPixelClassifier {
        calls: Mutex<Vec<usize>>,
    }

    impl FrameClassifier for FirstPixelClassifier {
        fn score_frames(&self, frames: &[Frame], _size: FrameSize) -> Result<Vec<f32>, DomainError> {
            self.calls.lock().expect("lock").push(frames.len());
            Ok(frames.iter().map(|frame| frame.pixels[0]).collect())
        }
    }

    struct DroppingClassifier;

    impl FrameClassifier for DroppingClassifier {
        fn score_frames(&self, frames: &[Frame], _size: FrameSize) -> Result<Vec<f32>, DomainError> {
            Ok(vec![0.5; frames.len().saturating_sub(1)])
        }
    }

    fn batch_with_scores(scores: &[f32]) -> FrameBatch {
        let size = FrameSize::new(1, 1);
        let frames = scores
            .iter()
            .enumerate()
            .map(|(source_index, score)| Frame {
                source_index,
                pixels: vec![*score; size.pixel_len()],
            })
            .collect();
        FrameBatch::new(frames, size, ChannelOrder::Bgr).expect("batch")
    }

    #[test]
    fn aggregate_is_unweighted_mean() {
        let assessment = VideoScorer::default()
            .score(&batch_with_scores(&[0.2, 0.8]), &FirstPixelClassifier::default())
            .expect("scored");

        assert_abs_diff_eq!(assessment.deepfake_probability, 0.5, epsilon = 1e-6);
        assert_eq!(assessment.frames_scored, 2);
    }

    #[test]
    fn single_frame_aggregate_is_that_frame_score() {
        let assessment = VideoScorer::default()
            .score(&batch_with_scores(&[0.37]), &FirstPixelClassifier::default())
            .expect("scored");

        assert_eq!(assessment.deepfake_probability, 0.37);
    }

    #[test]
    fn chunking_does_not_change_the_mean() {
        let scores = [0.1, 0.9, 0.4, 0.6, 0.25, 0.75, 0.3];
        let batch = batch_with_scores(&scores);

        let per_frame = FirstPixelClassifier::default();
        let one_by_one = VideoScorer::new(1).score(&batch, &per_frame).expect("scored");
        let batched = VideoScorer::new(3)
            .score(&batch, &FirstPixelClassifier::default())
            .expect("scored");

        assert_eq!(per_frame.calls.lock().expect("lock").as_slice(), &[1; 7]);
        assert_abs_diff_eq!(
            one_by_one.deepfake_probability,
            batched.deepfake_probability,
            epsilon = 1e-6
        );
    }

    #[test]
    fn rescoring_the_same_batch_is_stable() {
        let batch = batch_with_scores(&[0.15, 0.65, 0.95]);
        let classifier = FirstPixelClassifier::default();
        let scorer = VideoScorer::default();

        let first = scorer.score(&batch, &classifier).expect("first");
        let second = scorer.score(&batch, &classifier).expect("second");

        assert_eq!(first, second);
    }

    #[test]
    fn dropped_scores_are_rejected() {
        let err = VideoScorer::default()
            .score(&batch_with_scores(&[0.2, 0.8]), &DroppingClassifier)
            .expect_err("short score vector");
        assert!(matches!(err, DomainError::Classifier(_)));
    }

    #[test]
    fn non_finite_scores_are_rejected() {
        assert!(mean_score(&[0.5, f32::NAN]).is_err());
        assert!(mean_score(&[]).is_err());
    }
}
