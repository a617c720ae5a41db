mod app;
mod fallback;

pub use app::{build_and_run, detection_settings, Application};
pub use fallback::{UnavailableClassifierLoader, UnavailableVideoDecoder};
