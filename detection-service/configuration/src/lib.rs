use serde::{Deserialize, Serialize};

use config::{Config, Environment, File};
use tracing_subscriber::EnvFilter;

pub use config::ConfigError;

pub type AppConfig = DetectionConfig;

pub const CONFIG_PREFIX: &str = "DEEPFAKE_SERVICE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub video: VideoModelConfig,
    #[serde(default)]
    pub audio: AudioModelConfig,
    #[serde(default)]
    pub mfcc: MfccSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameChannelOrder {
    #[default]
    Bgr,
    Rgb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoModelConfig {
    #[serde(default = "default_video_model_path")]
    pub model_path: String,
    #[serde(default = "default_frame_count")]
    pub frame_count: usize,
    #[serde(default = "default_frame_side")]
    pub frame_width: u32,
    #[serde(default = "default_frame_side")]
    pub frame_height: u32,
    #[serde(default)]
    pub channel_order: FrameChannelOrder,
    #[serde(default = "default_frame_count")]
    pub max_batch_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPolicyConfig {
    #[default]
    WinningClass,
    MaxClass,
    FakeClass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioModelConfig {
    #[serde(default = "default_audio_model_path")]
    pub model_path: String,
    /// Output tensor holding class probabilities.
    #[serde(default = "default_probability_output")]
    pub probability_output: usize,
    #[serde(default)]
    pub decision_policy: DecisionPolicyConfig,
    #[serde(default = "default_fake_class_index")]
    pub fake_class_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfccSettings {
    #[serde(default = "default_n_mfcc")]
    pub n_mfcc: usize,
    #[serde(default = "default_n_fft")]
    pub n_fft: usize,
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,
    #[serde(default = "default_n_mels")]
    pub n_mels: usize,
    #[serde(default = "default_top_db")]
    pub top_db: Option<f32>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for VideoModelConfig {
    fn default() -> Self {
        Self {
            model_path: default_video_model_path(),
            frame_count: default_frame_count(),
            frame_width: default_frame_side(),
            frame_height: default_frame_side(),
            channel_order: FrameChannelOrder::default(),
            max_batch_size: default_frame_count(),
        }
    }
}

impl Default for AudioModelConfig {
    fn default() -> Self {
        Self {
            model_path: default_audio_model_path(),
            probability_output: default_probability_output(),
            decision_policy: DecisionPolicyConfig::default(),
            fake_class_index: default_fake_class_index(),
        }
    }
}

impl Default for MfccSettings {
    fn default() -> Self {
        Self {
            n_mfcc: default_n_mfcc(),
            n_fft: default_n_fft(),
            hop_length: default_hop_length(),
            n_mels: default_n_mels(),
            top_db: default_top_db(),
        }
    }
}

/// Defaults, then `config/default.toml`, then `config/{RUN_ENV}.toml`, then
/// `DEEPFAKE_SERVICE__SECTION__KEY` environment variables.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());
    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_env}")).required(false))
        .add_source(
            Environment::with_prefix(CONFIG_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

/// Installs the global subscriber. `RUST_LOG`, when set, wins over `logging.level`.
pub fn setup_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    let result = if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    };

    if let Err(err) = result {
        eprintln!("logging already initialized: {err}");
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    256 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_video_model_path() -> String {
    "models/deepfake_detector.onnx".to_string()
}

fn default_audio_model_path() -> String {
    "models/audio_model.onnx".to_string()
}

fn default_frame_count() -> usize {
    50
}

fn default_frame_side() -> u32 {
    224
}

fn default_probability_output() -> usize {
    1
}

fn default_fake_class_index() -> usize {
    1
}

fn default_n_mfcc() -> usize {
    13
}

fn default_n_fft() -> usize {
    2048
}

fn default_hop_length() -> usize {
    512
}

fn default_n_mels() -> usize {
    128
}

fn default_top_db() -> Option<f32> {
    Some(80.0)
}
