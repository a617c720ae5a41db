use detection_domain::{
    AudioFeatureExtractorPort, AudioFeatureVector, DomainError, MediaSource, MFCC_COEFFICIENTS,
};
use media_features::{decode_wav, FeatureError, MfccConfig, MfccExtractor};

/// Decodes WAV uploads and reduces them to a time-averaged MFCC profile.
#[derive(Debug, Clone)]
pub struct MfccFeatureExtractor {
    extractor: MfccExtractor,
}

impl MfccFeatureExtractor {
    pub fn new(config: MfccConfig) -> Result<Self, DomainError> {
        if config.n_mfcc != MFCC_COEFFICIENTS {
            return Err(DomainError::internal_error(format!(
                "audio classifier expects {MFCC_COEFFICIENTS} coefficients, configured {}",
                config.n_mfcc
            )));
        }
        let extractor = MfccExtractor::new(config).map_err(map_feature_error)?;
        Ok(Self { extractor })
    }

    /// Reduces already decoded mono samples to the classifier's feature vector.
    pub fn features_from_samples(
        &self,
        samples: &[f32],
        sample_rate_hz: u32,
    ) -> Result<AudioFeatureVector, DomainError> {
        let coefficients = self
            .extractor
            .mean_mfcc(samples, sample_rate_hz)
            .map_err(map_feature_error)?;
        AudioFeatureVector::new(coefficients)
    }
}

impl AudioFeatureExtractorPort for MfccFeatureExtractor {
    fn extract(&self, source: &MediaSource) -> Result<AudioFeatureVector, DomainError> {
        if let Some(extension) = source.extension() {
            if extension != "wav" && extension != "wave" {
                tracing::debug!(%extension, "non-wav file name, decoding by content");
            }
        }

        let audio = decode_wav(source.bytes()).map_err(map_feature_error)?;
        tracing::debug!(
            sample_count = audio.samples.len(),
            sample_rate_hz = audio.sample_rate_hz,
            source_channels = audio.source_channels,
            "audio decoded"
        );

        self.features_from_samples(&audio.samples, audio.sample_rate_hz)
    }
}

fn map_feature_error(error: FeatureError) -> DomainError {
    match error {
        FeatureError::InvalidConfig(_) => DomainError::internal_error(error.to_string()),
        FeatureError::Wav(_) | FeatureError::EmptySignal | FeatureError::InvalidSampleRate(_) => {
            DomainError::decode_error(error.to_string())
        }
    }
}
