use image::DynamicImage;
use qr_scanner_common::frame::{DecodedPayload, Point};
use tracing::debug;

use super::traits::Detector;
use super::DetectError;

/// QR detector backed by `rqrr`.
///
/// Every grid found in a frame is tried in detection order and the first one
/// that decodes wins; the scanner tracks a single payload at a time. A frame
/// only fails when every grid in it fails to decode.
#[derive(Debug, Default)]
pub struct QrDetector;

impl QrDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for QrDetector {
    fn detect(&mut self, image: &DynamicImage) -> Result<Option<DecodedPayload>, DetectError> {
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                luma.get_pixel(x as u32, y as u32).0[0]
            });

        let grids = prepared.detect_grids();
        if grids.len() > 1 {
            debug!(count = grids.len(), "multiple QR grids found");
        }
        first_decoded(grids.iter().map(|grid| -> Result<DecodedPayload, DetectError> {
            let (_meta, text) = grid
                .decode()
                .map_err(|e| DetectError::Decode(e.to_string()))?;
            let polygon = grid.bounds.iter().map(|p| Point::new(p.x, p.y)).collect();
            Ok(DecodedPayload::new(text, polygon))
        }))
    }

    fn name(&self) -> &str {
        "rqrr"
    }
}

/// Returns the first successful decode. Attempts after it are never run.
/// With no attempts at all there is no code; when every attempt failed the
/// last failure is reported.
fn first_decoded<I>(attempts: I) -> Result<Option<DecodedPayload>, DetectError>
where
    I: IntoIterator<Item = Result<DecodedPayload, DetectError>>,
{
    let mut last_err = None;
    for attempt in attempts {
        match attempt {
            Ok(payload) => return Ok(Some(payload)),
            Err(e) => {
                debug!(error = %e, "QR grid did not decode, trying the next one");
                last_err = Some(e);
            }
        }
    }
    match last_err {
        Some(e) => Err(e),
        None => Ok(None),
    }
}
