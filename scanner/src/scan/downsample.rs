use image::DynamicImage;
use std::borrow::Cow;

/// Detector input derived from a captured frame.
pub struct DetectorInput<'a> {
    pub image: Cow<'a, DynamicImage>,
    /// Factors mapping detector coordinates back to the captured frame.
    pub scale_x: f64,
    pub scale_y: f64,
}

impl<'a> DetectorInput<'a> {
    pub fn passthrough(image: &'a DynamicImage) -> Self {
        Self {
            image: Cow::Borrowed(image),
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    pub fn is_downsampled(&self) -> bool {
        matches!(self.image, Cow::Owned(_))
    }
}

/// Shrink `image` to the target resolution for detection.
///
/// Uses area averaging (`thumbnail_exact`), which keeps QR module edges
/// readable when shrinking. Each axis is clamped to its current size so a
/// frame is never upscaled; a frame already within the target is borrowed
/// untouched.
pub fn downsample(image: &DynamicImage, target_width: u32, target_height: u32) -> DetectorInput<'_> {
    let (width, height) = (image.width(), image.height());
    if width <= target_width && height <= target_height {
        return DetectorInput::passthrough(image);
    }

    let new_width = target_width.min(width).max(1);
    let new_height = target_height.min(height).max(1);
    DetectorInput {
        image: Cow::Owned(image.thumbnail_exact(new_width, new_height)),
        scale_x: width as f64 / new_width as f64,
        scale_y: height as f64 / new_height as f64,
    }
}
