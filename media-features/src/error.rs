use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("invalid wav payload: {0}")]
    Wav(#[from] hound::Error),

    #[error("audio contains no decodable samples")]
    EmptySignal,

    #[error("unsupported sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    #[error("invalid mfcc configuration: {0}")]
    InvalidConfig(String),
}
