mod audio_scorer;
mod frame_sampler;
mod video_scorer;

pub use audio_scorer::{AudioDecisionPolicy, AudioScorer, DECISION_THRESHOLD};
pub use frame_sampler::{normalize_frame, sampling_plan, FrameSampler};
pub use video_scorer::{mean_score, VideoScorer};
