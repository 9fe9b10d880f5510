use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use qr_scanner_common::frame::{Frame, Point};
use std::path::{Path, PathBuf};
use tracing::debug;

const OUTLINE: Rgb<u8> = Rgb([0, 255, 0]);
const OUTLINE_THICKNESS: i32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to write snapshot {0}: {1}")]
    Write(String, image::ImageError),
}

/// Writes the frame that produced the displayed payload, with the code's
/// outline drawn on it, to a fixed path. Each write replaces the last one.
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `polygon` must already be in the frame's coordinate space.
    pub fn write(&self, frame: &Frame, polygon: &[Point]) -> Result<(), SnapshotError> {
        let annotated = annotate(frame, polygon);
        annotated
            .save(&self.path)
            .map_err(|e| SnapshotError::Write(self.path.display().to_string(), e))?;
        debug!(path = %self.path.display(), seq = frame.seq, "snapshot written");
        Ok(())
    }
}

/// Copy of the frame with the closed polygon outlined in green.
pub fn annotate(frame: &Frame, polygon: &[Point]) -> RgbImage {
    let mut canvas = frame.image.to_rgb8();
    if polygon.len() < 2 {
        return canvas;
    }
    for (i, start) in polygon.iter().enumerate() {
        let end = polygon[(i + 1) % polygon.len()];
        for offset in 0..OUTLINE_THICKNESS {
            let d = offset as f32;
            draw_line_segment_mut(
                &mut canvas,
                (start.x as f32 + d, start.y as f32 + d),
                (end.x as f32 + d, end.y as f32 + d),
                OUTLINE,
            );
        }
    }
    canvas
}
