pub mod mjpeg;
pub mod polling;
pub mod replay;
pub mod traits;

use qr_scanner_common::config::{CameraConfig, CameraMode};
use qr_scanner_common::frame::{Frame, FrameError};
use std::time::Duration;
use tracing::info;

pub use traits::Camera;

use mjpeg::MjpegCamera;
use polling::PollingCamera;
use replay::ReplayCamera;

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("camera.url is not set")]
    MissingUrl,
    #[error("camera.replay_dir is not set")]
    MissingReplayDir,
    #[error("HTTP client setup failed: {0}")]
    HttpClient(reqwest::Error),
    #[error("HTTP connection failed: {0}")]
    HttpConnect(reqwest::Error),
    #[error("HTTP stream error: {0}")]
    HttpStream(reqwest::Error),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("camera stream ended")]
    StreamEnded,
    #[error("no frame within {0:?}")]
    Timeout(Duration),
    #[error("failed to read {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("no images found in {0}")]
    NoImages(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("camera has been released")]
    Released,
}

/// The camera selected by configuration.
pub enum AnyCamera {
    Mjpeg(MjpegCamera),
    Polling(PollingCamera),
    Replay(ReplayCamera),
}

/// Open the configured camera. Failure here is fatal to the caller; there is
/// no retry at startup.
pub async fn open_camera(config: &CameraConfig) -> Result<AnyCamera, CameraError> {
    info!(mode = %config.mode, "opening camera");
    let camera = match config.mode {
        CameraMode::Mjpeg => {
            let url = config.url.as_deref().ok_or(CameraError::MissingUrl)?;
            AnyCamera::Mjpeg(
                MjpegCamera::open(url, config.connect_timeout(), config.read_timeout()).await?,
            )
        }
        CameraMode::Polling => {
            let url = config.url.as_deref().ok_or(CameraError::MissingUrl)?;
            AnyCamera::Polling(
                PollingCamera::open(url, config.connect_timeout(), config.read_timeout()).await?,
            )
        }
        CameraMode::Replay => {
            let dir = config
                .replay_dir
                .as_deref()
                .ok_or(CameraError::MissingReplayDir)?;
            AnyCamera::Replay(ReplayCamera::open(dir)?)
        }
    };
    Ok(camera)
}

impl Camera for AnyCamera {
    async fn read(&mut self) -> Result<Frame, CameraError> {
        match self {
            AnyCamera::Mjpeg(c) => c.read().await,
            AnyCamera::Polling(c) => c.read().await,
            AnyCamera::Replay(c) => c.read().await,
        }
    }

    fn release(&mut self) {
        match self {
            AnyCamera::Mjpeg(c) => c.release(),
            AnyCamera::Polling(c) => c.release(),
            AnyCamera::Replay(c) => c.release(),
        }
    }

    fn name(&self) -> &str {
        match self {
            AnyCamera::Mjpeg(c) => c.name(),
            AnyCamera::Polling(c) => c.name(),
            AnyCamera::Replay(c) => c.name(),
        }
    }
}

/// Wall-clock capture timestamp in Unix millis.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
