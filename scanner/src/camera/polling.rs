use qr_scanner_common::frame::Frame;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::traits::Camera;
use super::{now_ms, CameraError};

/// Polling camera: fetches a single JPEG per read from a snapshot endpoint.
pub struct PollingCamera {
    client: reqwest::Client,
    url: String,
    read_timeout: Duration,
    seq: u64,
    released: bool,
}

impl PollingCamera {
    pub fn new(
        url: &str,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, CameraError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(CameraError::HttpClient)?;
        Ok(Self {
            client,
            url: url.to_string(),
            read_timeout,
            seq: 0,
            released: false,
        })
    }

    /// Builds the client and fetches one frame up front so an unreachable
    /// camera is reported at startup.
    pub async fn open(
        url: &str,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, CameraError> {
        let camera = Self::new(url, connect_timeout, read_timeout)?;
        camera.fetch().await?;
        info!(url = camera.url, "polling camera reachable");
        Ok(camera)
    }

    /// One request and its full body, bounded by `read_timeout`.
    async fn fetch(&self) -> Result<Vec<u8>, CameraError> {
        let limit = self.read_timeout;
        match tokio::time::timeout(limit, self.request()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(url = self.url, timeout = ?limit, "snapshot request timed out");
                Err(CameraError::Timeout(limit))
            }
        }
    }

    async fn request(&self) -> Result<Vec<u8>, CameraError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(CameraError::HttpConnect)?;
        if !resp.status().is_success() {
            return Err(CameraError::HttpStatus(resp.status().as_u16()));
        }
        let body = resp.bytes().await.map_err(CameraError::HttpStream)?;
        Ok(body.to_vec())
    }
}

impl Camera for PollingCamera {
    async fn read(&mut self) -> Result<Frame, CameraError> {
        if self.released {
            return Err(CameraError::Released);
        }
        let jpeg = self.fetch().await?;
        let seq = self.seq;
        self.seq += 1;
        debug!(seq, bytes = jpeg.len(), "polled camera frame");
        Ok(Frame::from_encoded(&jpeg, now_ms(), seq)?)
    }

    fn release(&mut self) {
        self.released = true;
        info!(url = self.url, "polling camera released");
    }

    fn name(&self) -> &str {
        "polling"
    }
}
