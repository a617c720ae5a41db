use serde::{Deserialize, Serialize};

use detection_domain::{AudioAssessment, MediaSource, Verdict, VideoAssessment};

#[derive(Debug, Clone)]
pub struct DetectDeepfakeRequest {
    pub payload: Vec<u8>,
    pub file_name: Option<String>,
}

impl DetectDeepfakeRequest {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub(crate) fn into_source(self) -> MediaSource {
        let source = MediaSource::new(self.payload);
        match self.file_name {
            Some(name) => source.with_file_name(name),
            None => source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoDetectionResponse {
    pub deepfake_probability: f32,
}

impl From<VideoAssessment> for VideoDetectionResponse {
    fn from(assessment: VideoAssessment) -> Self {
        Self {
            deepfake_probability: assessment.deepfake_probability,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioDetectionResponse {
    pub result: Verdict,
    pub probability: f32,
}

impl From<AudioAssessment> for AudioDetectionResponse {
    fn from(assessment: AudioAssessment) -> Self {
        Self {
            result: assessment.verdict,
            probability: assessment.probability,
        }
    }
}
