use crate::{AudioAssessment, AudioFeatureVector, DomainError, FeatureClassifier, Verdict};

/// Scores strictly above this are labelled fake.
pub const DECISION_THRESHOLD: f32 = 0.5;

/// How the class distribution becomes a reported probability and a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioDecisionPolicy {
    /// Reports the winning class confidence; labels fake when the fake class
    /// probability is above the threshold.
    WinningClass { fake_class_index: usize },
    /// Reports the winning class confidence and labels fake whenever that
    /// confidence is above the threshold, whichever class won.
    MaxClassProbability,
    /// Reports and thresholds the fake class probability.
    FakeClassProbability { fake_class_index: usize },
}

impl Default for AudioDecisionPolicy {
    fn default() -> Self {
        Self::WinningClass {
            fake_class_index: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioScorer {
    policy: AudioDecisionPolicy,
}

impl AudioScorer {
    pub fn new(policy: AudioDecisionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> AudioDecisionPolicy {
        self.policy
    }

    pub fn score(
        &self,
        features: &AudioFeatureVector,
        classifier: &dyn FeatureClassifier,
    ) -> Result<AudioAssessment, DomainError> {
        let distribution = classifier.predict_proba(features)?;
        if distribution.is_empty() {
            return Err(DomainError::classifier_error(
                "classifier returned an empty class distribution",
            ));
        }
        if distribution.iter().any(|p| !p.is_finite()) {
            return Err(DomainError::classifier_error(
                "classifier returned non-finite class probabilities",
            ));
        }

        let max_probability = distribution
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let (probability, fake_score) = match self.policy {
            AudioDecisionPolicy::WinningClass { fake_class_index } => (
                max_probability,
                class_probability(&distribution, fake_class_index)?,
            ),
            AudioDecisionPolicy::MaxClassProbability => (max_probability, max_probability),
            AudioDecisionPolicy::FakeClassProbability { fake_class_index } => {
                let fake = class_probability(&distribution, fake_class_index)?;
                (fake, fake)
            }
        };

        let verdict = if fake_score > DECISION_THRESHOLD {
            Verdict::Fake
        } else {
            Verdict::Real
        };
        tracing::debug!(?verdict, probability, classes = distribution.len(), "audio scored");

        Ok(AudioAssessment {
            verdict,
            probability,
        })
    }
}

fn class_probability(distribution: &[f32], index: usize) -> Result<f32, DomainError> {
    distribution.get(index).copied().ok_or_else(|| {
        DomainError::classifier_error(format!(
            "class index {index} out of range for {} classes",
            distribution.len()
        ))
    })
}
