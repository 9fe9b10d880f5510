use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub camera: CameraConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    /// `multipart/x-mixed-replace` MJPEG stream over HTTP.
    Mjpeg,
    /// One HTTP request per frame against a single-JPEG endpoint.
    Polling,
    /// Cycle through the image files of a local directory.
    Replay,
}

impl std::fmt::Display for CameraMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CameraMode::Mjpeg => "mjpeg",
            CameraMode::Polling => "polling",
            CameraMode::Replay => "replay",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_mode")]
    pub mode: CameraMode,
    pub url: Option<String>,
    pub replay_dir: Option<PathBuf>,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Upper bound on a single frame read, including a stalled stream.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl CameraConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_downsample")]
    pub downsample: bool,
    #[serde(default = "default_target_width")]
    pub target_width: u32,
    #[serde(default = "default_target_height")]
    pub target_height: u32,
    #[serde(default = "default_frame_delay_ms")]
    pub frame_delay_ms: u64,
}

impl ScanConfig {
    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            downsample: default_downsample(),
            target_width: default_target_width(),
            target_height: default_target_height(),
            frame_delay_ms: default_frame_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_quit_key")]
    pub quit_key: String,
    /// Where to write the annotated frame each time a new payload is shown.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            quit_key: default_quit_key(),
            snapshot_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
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
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.camera.mode {
            CameraMode::Mjpeg | CameraMode::Polling => {
                if self.camera.url.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::Invalid(format!(
                        "camera.url is required for mode '{}'",
                        self.camera.mode
                    )));
                }
            }
            CameraMode::Replay => {
                if self.camera.replay_dir.is_none() {
                    return Err(ConfigError::Invalid(
                        "camera.replay_dir is required for mode 'replay'".into(),
                    ));
                }
            }
        }
        if self.camera.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "camera.read_timeout_ms must be non-zero".into(),
            ));
        }
        if self.scan.target_width == 0 || self.scan.target_height == 0 {
            return Err(ConfigError::Invalid(
                "scan.target_width and scan.target_height must be non-zero".into(),
            ));
        }
        if self.display.quit_key.trim().is_empty() {
            return Err(ConfigError::Invalid("display.quit_key must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_mode() -> CameraMode {
    CameraMode::Mjpeg
}
fn default_retry_backoff_ms() -> u64 {
    3000
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_read_timeout_ms() -> u64 {
    5000
}
fn default_downsample() -> bool {
    true
}
fn default_target_width() -> u32 {
    640
}
fn default_target_height() -> u32 {
    480
}
fn default_frame_delay_ms() -> u64 {
    30
}
fn default_quit_key() -> String {
    "q".into()
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::parse(
            r#"
            [camera]
            url = "http://robot.local:8080/stream"
            "#,
        )
        .unwrap();

        assert_eq!(config.camera.mode, CameraMode::Mjpeg);
        assert_eq!(config.camera.retry_backoff(), Duration::from_secs(3));
        assert_eq!(config.camera.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.camera.read_timeout(), Duration::from_secs(5));
        assert!(config.scan.downsample);
        assert_eq!((config.scan.target_width, config.scan.target_height), (640, 480));
        assert_eq!(config.scan.frame_delay(), Duration::from_millis(30));
        assert_eq!(config.display.quit_key, "q");
        assert!(config.display.snapshot_path.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn full_config_overrides_defaults() {
        let config = Config::parse(
            r#"
            [camera]
            mode = "replay"
            replay_dir = "fixtures/frames"
            retry_backoff_ms = 500
            read_timeout_ms = 750

            [scan]
            downsample = false
            target_width = 320
            target_height = 240
            frame_delay_ms = 10

            [display]
            quit_key = "x"
            snapshot_path = "last.jpg"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.camera.mode, CameraMode::Replay);
        assert_eq!(config.camera.replay_dir, Some(PathBuf::from("fixtures/frames")));
        assert_eq!(config.camera.retry_backoff(), Duration::from_millis(500));
        assert_eq!(config.camera.read_timeout(), Duration::from_millis(750));
        assert!(!config.scan.downsample);
        assert_eq!(config.scan.target_width, 320);
        assert_eq!(config.display.quit_key, "x");
        assert_eq!(config.display.snapshot_path, Some(PathBuf::from("last.jpg")));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn network_mode_requires_url() {
        let err = Config::parse(
            r#"
            [camera]
            mode = "polling"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn replay_mode_requires_directory() {
        let err = Config::parse(
            r#"
            [camera]
            mode = "replay"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_target_rejected() {
        let err = Config::parse(
            r#"
            [camera]
            url = "http://cam/stream"

            [scan]
            target_width = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_read_timeout_rejected() {
        let err = Config::parse(
            r#"
            [camera]
            url = "http://cam/stream"
            read_timeout_ms = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_mode_is_parse_error() {
        let err = Config::parse(
            r#"
            [camera]
            mode = "usb"
            url = "http://cam/stream"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Config::load(Path::new("/nonexistent/qr-scanner.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile(..)));
    }
}
