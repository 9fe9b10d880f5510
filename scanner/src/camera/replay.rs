use qr_scanner_common::frame::Frame;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::traits::Camera;
use super::{now_ms, CameraError};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Replays the images of a directory as if they were camera frames, looping
/// back to the first file after the last.
pub struct ReplayCamera {
    files: Vec<PathBuf>,
    next: usize,
    seq: u64,
    released: bool,
}

impl ReplayCamera {
    pub fn open(dir: &Path) -> Result<Self, CameraError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::ReadFile(dir.display().to_string(), e))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CameraError::NoImages(dir.display().to_string()));
        }

        info!(dir = %dir.display(), count = files.len(), "replay camera opened");
        Ok(Self {
            files,
            next: 0,
            seq: 0,
            released: false,
        })
    }
}

impl Camera for ReplayCamera {
    async fn read(&mut self) -> Result<Frame, CameraError> {
        if self.released {
            return Err(CameraError::Released);
        }
        let path = &self.files[self.next];
        self.next = (self.next + 1) % self.files.len();

        let data = std::fs::read(path)
            .map_err(|e| CameraError::ReadFile(path.display().to_string(), e))?;
        let seq = self.seq;
        self.seq += 1;
        debug!(seq, file = %path.display(), "replaying frame");
        Ok(Frame::from_encoded(&data, now_ms(), seq)?)
    }

    fn release(&mut self) {
        self.released = true;
        info!(files = self.files.len(), "replay camera released");
    }

    fn name(&self) -> &str {
        "replay"
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
