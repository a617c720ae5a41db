//! Audio decoding and spectral feature extraction shared by the detection service.
//!
//! The MFCC pipeline mirrors the librosa defaults the audio classifier was
//! trained against: centered zero-padded frames, periodic Hann window, Slaney
//! mel filterbank, power-to-dB with an 80 dB floor and an orthonormal DCT-II.

pub mod error;
pub mod mel;
pub mod mfcc;
pub mod wav;

pub use error::FeatureError;
pub use mfcc::{MfccConfig, MfccExtractor};
pub use wav::{decode_wav, DecodedAudio};
