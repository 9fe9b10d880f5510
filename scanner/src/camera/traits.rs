use qr_scanner_common::frame::Frame;

use super::CameraError;

/// A source of camera frames.
///
/// Opening is done by each implementation's constructor. `read` is called once
/// per scan iteration; a failed read is transient and the caller is expected
/// to retry. `release` gives up the underlying device or connection and is
/// called exactly once, when the scan session ends.
#[allow(async_fn_in_trait)]
pub trait Camera {
    async fn read(&mut self) -> Result<Frame, CameraError>;

    fn release(&mut self);

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
