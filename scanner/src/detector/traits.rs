use image::DynamicImage;
use qr_scanner_common::frame::DecodedPayload;

use super::DetectError;

/// QR detection capability.
///
/// Implementations receive the (possibly downsampled) frame and return the
/// decoded payload, or `None` when no code is visible.
pub trait Detector {
    fn detect(&mut self, image: &DynamicImage) -> Result<Option<DecodedPayload>, DetectError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
