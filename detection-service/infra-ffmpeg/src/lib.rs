use std::io::Write;
use std::sync::OnceLock;

use ffmpeg_next as ffmpeg;
use tempfile::NamedTempFile;

use detection_domain::{DomainError, MediaSource};

mod audio;
mod video;

pub use audio::{FfmpegAudioExtractor, DEFAULT_AUDIO_SUFFIX};
pub use video::{FfmpegVideoDecoder, FfmpegVideoStream, DEFAULT_VIDEO_SUFFIX};

static FFMPEG_INIT: OnceLock<Result<(), String>> = OnceLock::new();

fn init_ffmpeg() -> Result<(), DomainError> {
    FFMPEG_INIT
        .get_or_init(|| {
            ffmpeg::init().map_err(|err| format!("failed to initialize FFmpeg: {err}"))?;
            ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Error);
            Ok(())
        })
        .clone()
        .map_err(DomainError::internal_error)
}

/// Writes the upload to a uniquely named temp file so FFmpeg can open it by
/// path. The file is removed when the returned handle drops.
pub fn materialize(source: &MediaSource, default_suffix: &str) -> Result<NamedTempFile, DomainError> {
    let suffix = format!(
        ".{}",
        source
            .extension()
            .unwrap_or_else(|| default_suffix.to_string())
    );
    let mut file = tempfile::Builder::new()
        .prefix("deepfake-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|err| DomainError::internal_error(format!("temp file: {err}")))?;
    file.write_all(source.bytes())
        .and_then(|_| file.flush())
        .map_err(|err| DomainError::internal_error(format!("temp file write: {err}")))?;
    tracing::debug!(path = %file.path().display(), bytes = source.len(), "upload materialized");
    Ok(file)
}

fn open_input(file: &NamedTempFile) -> Result<ffmpeg::format::context::Input, DomainError> {
    ffmpeg::format::input(&file.path())
        .map_err(|err| DomainError::decode_error(format!("unreadable container: {err}")))
}
