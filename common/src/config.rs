use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_DESTINATION: &str = "http://godarklight.info.tm/webcam/index.php";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_destination")]
    pub destination: String,
    /// Per-request timeout. Unset leaves the transport default in place.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub index: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Frames read and thrown away after opening, while exposure settles.
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: u32,
    #[serde(default = "default_buffer_count")]
    pub buffer_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// A decode is attempted once the frame counter exceeds this value.
    #[serde(default = "default_scan_interval")]
    pub interval: u32,
    #[serde(default)]
    pub strategy: ScanStrategy,
}

/// Which payloads of a single scanned frame are passed to the dedup gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStrategy {
    /// Only the first payload the decoder returns.
    #[default]
    First,
    /// Every payload, in decoder order.
    All,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecoderConfig {
    #[serde(default = "default_symbologies")]
    pub symbologies: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayConfig {
    /// `None` enables the window when a graphical session is detected.
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            destination: default_destination(),
            timeout_secs: None,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_width(),
            height: default_height(),
            warmup_frames: default_warmup_frames(),
            buffer_count: default_buffer_count(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval: default_scan_interval(),
            strategy: ScanStrategy::default(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            symbologies: default_symbologies(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// Default value functions
fn default_destination() -> String {
    DEFAULT_DESTINATION.into()
}
fn default_width() -> u32 {
    1920
}
fn default_height() -> u32 {
    1080
}
fn default_warmup_frames() -> u32 {
    30
}
fn default_buffer_count() -> usize {
    2
}
fn default_scan_interval() -> u32 {
    15
}
fn default_symbologies() -> Vec<String> {
    vec!["qr".into()]
}
fn default_log_level() -> String {
    "info".into()
}
